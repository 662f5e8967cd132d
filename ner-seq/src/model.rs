//! # Treinadores e Modelos de Eventos
//!
//! O rotulador sequencial não conhece o algoritmo de aprendizado: ele entrega
//! uma lista de [`Event`]s a um [`EventTrainer`] e recebe de volta um
//! [`EventModel`] capaz de dar uma distribuição de probabilidade sobre os
//! rótulos conhecidos para um contexto qualquer.
//!
//! [`crate::perceptron::PerceptronTrainer`] é a implementação de referência.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event_stream::Event;

/// Parâmetros de treino, repassados intactos ao [`EventTrainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParameters {
    /// Nome do algoritmo (informativo para treinadores que aceitam vários).
    pub algorithm: String,
    /// Número de passadas sobre os eventos.
    pub iterations: usize,
    /// Features vistas menos que `cutoff` vezes são descartadas.
    pub cutoff: usize,
    /// Largura do feixe usado na decodificação.
    pub beam_size: usize,
    /// Parâmetros específicos do treinador.
    pub extra: HashMap<String, String>,
}

impl TrainingParameters {
    pub const DEFAULT_ALGORITHM: &'static str = "PERCEPTRON";
    pub const DEFAULT_BEAM_SIZE: usize = 3;
}

impl Default for TrainingParameters {
    fn default() -> Self {
        Self {
            algorithm: Self::DEFAULT_ALGORITHM.to_string(),
            iterations: 100,
            cutoff: 0,
            beam_size: Self::DEFAULT_BEAM_SIZE,
            extra: HashMap::new(),
        }
    }
}

/// Classificador treinado sobre eventos.
pub trait EventModel: Send + Sync {
    /// Rótulos conhecidos, na ordem usada por [`EventModel::eval`].
    fn outcomes(&self) -> &[String];

    /// Probabilidade de cada rótulo dado o contexto (soma 1).
    fn eval(&self, context: &[String]) -> Vec<f64>;
}

/// Algoritmo de aprendizado plugável.
pub trait EventTrainer: Send + Sync {
    fn train(&self, events: &[Event], params: &TrainingParameters) -> Result<Box<dyn EventModel>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_fill_defaults() {
        let params: TrainingParameters = serde_json::from_str(r#"{"iterations": 5}"#).unwrap();
        assert_eq!(params.iterations, 5);
        assert_eq!(params.algorithm, "PERCEPTRON");
        assert_eq!(params.beam_size, 3);
        assert!(params.extra.is_empty());
    }
}
