//! # Recursos Externos
//!
//! Geradores de features podem depender de recursos nomeados fornecidos pelo
//! chamador: um etiquetador secundário (ex: modelo POS) ou um léxico de classes
//! de palavras (ex: clusters de Brown). O descritor referencia o recurso pelo
//! nome; a fábrica resolve o nome aqui e confere se a capacidade bate.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SeqError};

/// Etiquetador de sentença inteira (ex: POS tagger), uma etiqueta por token.
pub trait SequenceTagger: Send + Sync {
    fn tag(&self, tokens: &[String]) -> Vec<String>;
}

/// Um recurso disponível para os geradores.
#[derive(Clone)]
pub enum Resource {
    /// Etiquetador sequencial.
    Tagger(Arc<dyn SequenceTagger>),
    /// Mapa palavra → classe.
    Lexicon(Arc<HashMap<String, String>>),
}

impl Resource {
    const TAGGER: &'static str = "etiquetador";
    const LEXICON: &'static str = "léxico";
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Tagger(_) => f.write_str("Tagger(..)"),
            Resource::Lexicon(map) => write!(f, "Lexicon({} entradas)", map.len()),
        }
    }
}

/// Mapa nome → recurso.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    entries: HashMap<String, Resource>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, resource: Resource) -> &mut Self {
        self.entries.insert(name.into(), resource);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.entries.get(name)
    }

    pub fn tagger(&self, name: &str) -> Result<Arc<dyn SequenceTagger>> {
        match self.get(name) {
            Some(Resource::Tagger(tagger)) => Ok(Arc::clone(tagger)),
            Some(_) => Err(mismatch(name, Resource::TAGGER)),
            None => Err(SeqError::MissingResource(name.to_string())),
        }
    }

    pub fn lexicon(&self, name: &str) -> Result<Arc<HashMap<String, String>>> {
        match self.get(name) {
            Some(Resource::Lexicon(map)) => Ok(Arc::clone(map)),
            Some(_) => Err(mismatch(name, Resource::LEXICON)),
            None => Err(SeqError::MissingResource(name.to_string())),
        }
    }
}

fn mismatch(name: &str, expected: &'static str) -> SeqError {
    SeqError::ResourceMismatch {
        name: name.to_string(),
        expected,
    }
}
