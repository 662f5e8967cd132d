//! # Descritor do Pipeline de Features
//!
//! Configuração serializável que a fábrica consome para reconstruir o codec e o
//! gerador de contexto. Exemplo em JSON:
//!
//! ```json
//! {
//!   "codec": "BILOU",
//!   "generators": [
//!     { "kind": "window", "params": { "prev": "2", "next": "2" },
//!       "generators": [ { "kind": "token" } ] },
//!     { "kind": "pos_tag", "params": { "model": "pos" } }
//!   ]
//! }
//! ```
//!
//! Sem `codec` vale BIO; sem `generators` vale [`FeatureDescriptor::default_generators`].

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeqError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generators: Option<Vec<GeneratorSpec>>,
}

impl FeatureDescriptor {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SeqError::InvalidConfiguration(format!("descritor ilegível: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SeqError::InvalidConfiguration(format!("descritor não serializável: {e}")))
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn with_generators(mut self, generators: Vec<GeneratorSpec>) -> Self {
        self.generators = Some(generators);
        self
    }

    /// Geradores usados quando o descritor não traz uma lista.
    pub fn default_generators() -> Vec<GeneratorSpec> {
        vec![
            GeneratorSpec::window(2, 2, GeneratorSpec::new("token")),
            GeneratorSpec::window(2, 2, GeneratorSpec::new("token_class")),
            GeneratorSpec::new("outcome_prior"),
            GeneratorSpec::new("previous_map"),
            GeneratorSpec::new("bigram_class"),
            GeneratorSpec::new("sentence")
                .param("begin", "true")
                .param("end", "false"),
        ]
    }
}

/// Um gerador a instanciar: tipo registrado, parâmetros e filhos (para
/// geradores que envolvem outros, como a janela).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generators: Vec<GeneratorSpec>,
}

impl GeneratorSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
            generators: Vec::new(),
        }
    }

    pub fn window(prev: usize, next: usize, inner: GeneratorSpec) -> Self {
        Self::new("window")
            .param("prev", prev.to_string())
            .param("next", next.to_string())
            .child(inner)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn child(mut self, generator: GeneratorSpec) -> Self {
        self.generators.push(generator);
        self
    }

    /// Valor do parâmetro `key` convertido para `T`, ou `default` se ausente.
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        match self.params.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| self.invalid(key, e.to_string())),
        }
    }

    /// Valor obrigatório do parâmetro `key`.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| self.invalid(key, "ausente".into()))
    }

    fn invalid(&self, key: &str, reason: String) -> SeqError {
        SeqError::InvalidParameter {
            generator: self.kind.clone(),
            key: key.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_nested_descriptor() {
        let descriptor = FeatureDescriptor::from_json(
            r#"{
                "codec": "BILOU",
                "generators": [
                    {"kind": "window", "params": {"prev": "2", "next": "2"},
                     "generators": [{"kind": "token"}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(descriptor.codec.as_deref(), Some("BILOU"));
        let generators = descriptor.generators.unwrap();
        assert_eq!(generators[0], GeneratorSpec::window(2, 2, GeneratorSpec::new("token")));
    }

    #[test]
    fn test_empty_descriptor_uses_defaults() {
        let descriptor = FeatureDescriptor::from_json("{}").unwrap();
        assert_eq!(descriptor, FeatureDescriptor::default());
        assert_eq!(descriptor.to_json().unwrap(), "{}");
    }

    #[test]
    fn test_malformed_json_is_configuration_error() {
        let err = FeatureDescriptor::from_json(r#"{"generators": 3}"#).unwrap_err();
        assert!(matches!(err, SeqError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_parameter_errors_name_the_key() {
        let spec = GeneratorSpec::new("prefix").param("length", "quatro");
        let err = spec.get_or("length", 4usize).unwrap_err();
        assert!(err.to_string().contains("\"length\""));
        assert_eq!(GeneratorSpec::new("prefix").get_or("length", 4usize).unwrap(), 4);
        assert!(matches!(
            spec.require("lexicon"),
            Err(SeqError::InvalidParameter { key, .. }) if key == "lexicon"
        ));
    }
}
