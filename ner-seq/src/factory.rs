//! # Fábrica do Rotulador
//!
//! Junta um [`FeatureDescriptor`], um [`Resources`] e um [`Registry`] e produz
//! pares `(codec, gerador de contexto)` prontos para uso.
//!
//! A fábrica valida o descritor na construção, montando o pipeline uma vez:
//! nomes desconhecidos, parâmetros ilegíveis e recursos ausentes aparecem ali
//! como erros de configuração. Depois disso cada chamada a
//! [`SequenceLabelerFactory::create_context_generator`] devolve uma instância
//! nova, com estado adaptativo próprio. Se a reconstrução falhar mesmo assim, o
//! erro é [`SeqError::GeneratorRecreation`].

use std::sync::Arc;

use tracing::debug;

use crate::codec::{BioCodec, SequenceCodec, SequenceValidator};
use crate::context::ContextGenerator;
use crate::descriptor::{FeatureDescriptor, GeneratorSpec};
use crate::error::{Result, SeqError};
use crate::registry::{BuildContext, Registry};
use crate::resources::Resources;

#[derive(Debug, Clone)]
pub struct SequenceLabelerFactory {
    descriptor: FeatureDescriptor,
    resources: Resources,
    registry: Arc<Registry>,
}

impl SequenceLabelerFactory {
    /// Fábrica sobre o registro padrão.
    pub fn new(descriptor: FeatureDescriptor, resources: Resources) -> Result<Self> {
        Self::with_registry(descriptor, resources, Arc::new(Registry::with_defaults()))
    }

    pub fn with_registry(
        descriptor: FeatureDescriptor,
        resources: Resources,
        registry: Arc<Registry>,
    ) -> Result<Self> {
        let factory = Self {
            descriptor,
            resources,
            registry,
        };
        let codec = factory.create_codec()?;
        let generator = factory.build_context_generator()?;
        debug!(
            codec = codec.name(),
            generators = generator.len(),
            "descritor de features validado"
        );
        Ok(factory)
    }

    pub fn descriptor(&self) -> &FeatureDescriptor {
        &self.descriptor
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Codec nomeado no descritor, BIO quando nenhum é nomeado.
    pub fn create_codec(&self) -> Result<Arc<dyn SequenceCodec>> {
        let name = self.descriptor.codec.as_deref().unwrap_or(BioCodec::NAME);
        self.registry.codec(name)
    }

    pub fn create_sequence_validator(&self) -> Result<Box<dyn SequenceValidator>> {
        Ok(self.create_codec()?.validator())
    }

    /// Gerador de contexto novo, com estado adaptativo vazio.
    pub fn create_context_generator(&self) -> Result<ContextGenerator> {
        self.build_context_generator()
            .map_err(|err| SeqError::GeneratorRecreation(Box::new(err)))
    }

    fn build_context_generator(&self) -> Result<ContextGenerator> {
        let ctx = BuildContext {
            registry: &self.registry,
            resources: &self.resources,
        };
        let defaults;
        let specs: &[GeneratorSpec] = match &self.descriptor.generators {
            Some(specs) => specs,
            None => {
                defaults = FeatureDescriptor::default_generators();
                &defaults
            }
        };
        let generators = specs
            .iter()
            .map(|spec| self.registry.generator(spec, &ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(ContextGenerator::new(generators))
    }
}
