//! # Registro de Codecs e Geradores
//!
//! Mapa de identificadores textuais para construtores. O descritor nomeia
//! codecs e geradores por string; o registro resolve esses nomes e rejeita os
//! desconhecidos com erro de configuração. Novas variantes entram com
//! [`Registry::register_codec`] / [`Registry::register_generator`] sem mexer na
//! fábrica.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::codec::{BilouCodec, BioCodec, SequenceCodec};
use crate::descriptor::GeneratorSpec;
use crate::error::{Result, SeqError};
use crate::features::{
    BigramClassFeatureGenerator, ClusterFeatureGenerator, FeatureGenerator,
    OutcomePriorFeatureGenerator, PosTagFeatureGenerator, PrefixFeatureGenerator,
    PreviousMapFeatureGenerator, SentenceFeatureGenerator, SuffixFeatureGenerator,
    TokenClassFeatureGenerator, TokenFeatureGenerator, WindowFeatureGenerator,
};
use crate::resources::Resources;

type CodecBuilder = Arc<dyn Fn() -> Arc<dyn SequenceCodec> + Send + Sync>;
type GeneratorBuilder =
    Arc<dyn Fn(&GeneratorSpec, &BuildContext<'_>) -> Result<Box<dyn FeatureGenerator>> + Send + Sync>;

/// O que um construtor de gerador enxerga: o próprio registro (para construir
/// filhos) e os recursos externos.
pub struct BuildContext<'a> {
    pub registry: &'a Registry,
    pub resources: &'a Resources,
}

impl BuildContext<'_> {
    /// Constrói os filhos de `spec`, na ordem.
    pub fn children(&self, spec: &GeneratorSpec) -> Result<Vec<Box<dyn FeatureGenerator>>> {
        spec.generators
            .iter()
            .map(|child| self.registry.generator(child, self))
            .collect()
    }

    /// Exatamente um filho, como exige a janela.
    pub fn single_child(&self, spec: &GeneratorSpec) -> Result<Box<dyn FeatureGenerator>> {
        match spec.generators.as_slice() {
            [child] => self.registry.generator(child, self),
            other => Err(SeqError::InvalidParameter {
                generator: spec.kind.clone(),
                key: "generators".into(),
                reason: format!("esperava 1 gerador interno, veio {}", other.len()),
            }),
        }
    }
}

#[derive(Clone, Default)]
pub struct Registry {
    codecs: HashMap<String, CodecBuilder>,
    generators: HashMap<String, GeneratorBuilder>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codecs: Vec<_> = self.codecs.keys().collect();
        let mut generators: Vec<_> = self.generators.keys().collect();
        codecs.sort();
        generators.sort();
        f.debug_struct("Registry")
            .field("codecs", &codecs)
            .field("generators", &generators)
            .finish()
    }
}

impl Registry {
    /// Registro vazio, sem nenhuma variante.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registro com os codecs BIO/BILOU e todos os geradores embutidos.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register_codec(BioCodec::NAME, || Arc::new(BioCodec))
            .register_codec(BilouCodec::NAME, || Arc::new(BilouCodec));

        registry
            .register_generator("token", |spec, _| {
                Ok(Box::new(TokenFeatureGenerator::new(spec.get_or("lowercase", true)?)))
            })
            .register_generator("token_class", |spec, _| {
                Ok(Box::new(TokenClassFeatureGenerator::new(
                    spec.get_or("word_and_class", false)?,
                )))
            })
            .register_generator("prefix", |spec, _| {
                Ok(Box::new(PrefixFeatureGenerator::new(
                    spec.get_or("length", PrefixFeatureGenerator::DEFAULT_LENGTH)?,
                )))
            })
            .register_generator("suffix", |spec, _| {
                Ok(Box::new(SuffixFeatureGenerator::new(
                    spec.get_or("length", SuffixFeatureGenerator::DEFAULT_LENGTH)?,
                )))
            })
            .register_generator("sentence", |spec, _| {
                Ok(Box::new(SentenceFeatureGenerator::new(
                    spec.get_or("begin", true)?,
                    spec.get_or("end", true)?,
                )))
            })
            .register_generator("outcome_prior", |_, _| Ok(Box::new(OutcomePriorFeatureGenerator)))
            .register_generator("bigram_class", |_, _| Ok(Box::new(BigramClassFeatureGenerator)))
            .register_generator("previous_map", |_, _| {
                Ok(Box::new(PreviousMapFeatureGenerator::new()))
            })
            .register_generator("window", |spec, ctx| {
                let inner = ctx.single_child(spec)?;
                Ok(Box::new(WindowFeatureGenerator::new(
                    inner,
                    spec.get_or("prev", 2)?,
                    spec.get_or("next", 2)?,
                )))
            })
            .register_generator("pos_tag", |spec, ctx| {
                let name = spec.require("model")?;
                Ok(Box::new(PosTagFeatureGenerator::new(name, ctx.resources.tagger(name)?)))
            })
            .register_generator("cluster", |spec, ctx| {
                let name = spec.require("lexicon")?;
                let prefix = spec.params.get("prefix").map_or(name, String::as_str);
                Ok(Box::new(ClusterFeatureGenerator::new(
                    prefix,
                    ctx.resources.lexicon(name)?,
                    spec.get_or("lowercase", true)?,
                )))
            });
        registry
    }

    pub fn register_codec<F>(&mut self, name: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn SequenceCodec> + Send + Sync + 'static,
    {
        self.codecs.insert(name.into(), Arc::new(builder));
        self
    }

    pub fn register_generator<F>(&mut self, kind: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn(&GeneratorSpec, &BuildContext<'_>) -> Result<Box<dyn FeatureGenerator>>
            + Send
            + Sync
            + 'static,
    {
        self.generators.insert(kind.into(), Arc::new(builder));
        self
    }

    pub fn codec(&self, name: &str) -> Result<Arc<dyn SequenceCodec>> {
        self.codecs
            .get(name)
            .map(|build| build())
            .ok_or_else(|| SeqError::UnknownCodec(name.to_string()))
    }

    pub fn generator(
        &self,
        spec: &GeneratorSpec,
        ctx: &BuildContext<'_>,
    ) -> Result<Box<dyn FeatureGenerator>> {
        let build = self
            .generators
            .get(&spec.kind)
            .ok_or_else(|| SeqError::UnknownGenerator(spec.kind.clone()))?;
        trace!(kind = %spec.kind, "construindo gerador");
        build(spec, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Sentence;
    use crate::sample::tokens;

    fn build(spec: &GeneratorSpec) -> Result<Box<dyn FeatureGenerator>> {
        let registry = Registry::with_defaults();
        let resources = Resources::new();
        let ctx = BuildContext {
            registry: &registry,
            resources: &resources,
        };
        registry.generator(spec, &ctx)
    }

    #[test]
    fn test_resolves_builtin_codecs() {
        let registry = Registry::with_defaults();
        assert_eq!(registry.codec("BIO").unwrap().name(), "BIO");
        assert_eq!(registry.codec("BILOU").unwrap().name(), "BILOU");
        assert!(matches!(registry.codec("IOB2"), Err(SeqError::UnknownCodec(n)) if n == "IOB2"));
    }

    #[test]
    fn test_builds_nested_window() {
        let generator = build(&GeneratorSpec::window(1, 0, GeneratorSpec::new("token"))).unwrap();
        let toks = tokens("in Paris");
        let mut features = Vec::new();
        generator.create_features(&mut features, &Sentence::new(&toks), 1, &[]);
        assert_eq!(features, vec!["w=paris", "p1w=in"]);
    }

    #[test]
    fn test_window_needs_one_child() {
        let err = build(&GeneratorSpec::new("window")).err().unwrap();
        assert!(matches!(err, SeqError::InvalidParameter { key, .. } if key == "generators"));
    }

    #[test]
    fn test_unknown_kind_and_missing_resource() {
        assert!(matches!(
            build(&GeneratorSpec::new("gazetteer")),
            Err(SeqError::UnknownGenerator(k)) if k == "gazetteer"
        ));
        assert!(matches!(
            build(&GeneratorSpec::new("pos_tag").param("model", "pos")),
            Err(SeqError::MissingResource(n)) if n == "pos"
        ));
    }

    #[test]
    fn test_custom_generator_registration() {
        let mut registry = Registry::empty();
        registry.register_generator("constant", |_, _| Ok(Box::new(OutcomePriorFeatureGenerator)));
        let resources = Resources::new();
        let ctx = BuildContext {
            registry: &registry,
            resources: &resources,
        };
        assert!(registry.generator(&GeneratorSpec::new("constant"), &ctx).is_ok());
        assert!(registry.generator(&GeneratorSpec::new("token"), &ctx).is_err());
    }
}
