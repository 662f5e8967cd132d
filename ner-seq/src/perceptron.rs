//! # Averaged Perceptron sobre Eventos
//!
//! Algoritmo online e guiado por erros: para cada evento prevê o rótulo com os
//! pesos atuais e, se errar, promove o rótulo correto e penaliza o previsto
//! nas features ativas. O modelo final usa a **média** dos pesos ao longo de
//! todos os passos, o que estabiliza o aprendizado.
//!
//! A média é mantida com "Lazy Averaging": o acumulado de um peso só é
//! atualizado quando a feature está ativa, mantendo custo constante por passo.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SeqError};
use crate::event_stream::Event;
use crate::model::{EventModel, EventTrainer, TrainingParameters};

/// Treinador de referência: Averaged Perceptron com Lazy Averaging.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptronTrainer;

impl EventTrainer for PerceptronTrainer {
    fn train(&self, events: &[Event], params: &TrainingParameters) -> Result<Box<dyn EventModel>> {
        if events.is_empty() {
            return Err(SeqError::Training("nenhum evento para treinar".into()));
        }

        let outcomes: Vec<String> = events
            .iter()
            .map(|e| e.outcome.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let outcome_index: HashMap<&str, usize> = outcomes
            .iter()
            .enumerate()
            .map(|(i, o)| (o.as_str(), i))
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for event in events {
            for feature in &event.context {
                *counts.entry(feature.as_str()).or_default() += 1;
            }
        }
        let mut features: HashMap<String, usize> = HashMap::new();
        for (feature, count) in counts {
            if count >= params.cutoff {
                let next = features.len();
                features.insert(feature.to_string(), next);
            }
        }

        // eventos já traduzidos para índices
        let encoded: Vec<(usize, Vec<usize>)> = events
            .iter()
            .map(|e| {
                let active = e.context.iter().filter_map(|f| features.get(f).copied()).collect();
                (outcome_index[e.outcome.as_str()], active)
            })
            .collect();

        let mut weights = Averaged::new(features.len(), outcomes.len());
        for iteration in 0..params.iterations {
            let mut mistakes = 0usize;
            for (gold, active) in &encoded {
                let predicted = argmax(&weights.scores(active));
                if predicted != *gold {
                    mistakes += 1;
                    for &feature in active {
                        weights.update(feature, *gold, 1.0);
                        weights.update(feature, predicted, -1.0);
                    }
                }
                weights.steps += 1;
            }
            debug!(iteration, mistakes, events = encoded.len(), "passada do perceptron");
        }

        Ok(Box::new(PerceptronModel {
            weights: weights.finalize(),
            features,
            outcomes,
        }))
    }
}

/// Pesos médios finais, prontos para predição.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptronModel {
    /// `weights[feature * n_outcomes + outcome]`.
    weights: Vec<f64>,
    features: HashMap<String, usize>,
    outcomes: Vec<String>,
}

impl PerceptronModel {
    fn scores(&self, context: &[String]) -> Vec<f64> {
        let n = self.outcomes.len();
        let mut scores = vec![0.0; n];
        for feature in context {
            if let Some(&f) = self.features.get(feature) {
                for (o, score) in scores.iter_mut().enumerate() {
                    *score += self.weights[f * n + o];
                }
            }
        }
        scores
    }
}

impl EventModel for PerceptronModel {
    fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    fn eval(&self, context: &[String]) -> Vec<f64> {
        softmax(&self.scores(context))
    }
}

/// Pesos correntes mais acumulados para a média preguiçosa.
struct Averaged {
    n_outcomes: usize,
    weights: Vec<f64>,
    totals: Vec<f64>,
    last_update: Vec<usize>,
    steps: usize,
}

impl Averaged {
    fn new(n_features: usize, n_outcomes: usize) -> Self {
        let size = n_features * n_outcomes;
        Self {
            n_outcomes,
            weights: vec![0.0; size],
            totals: vec![0.0; size],
            last_update: vec![0; size],
            steps: 0,
        }
    }

    fn scores(&self, active: &[usize]) -> Vec<f64> {
        let mut scores = vec![0.0; self.n_outcomes];
        for &f in active {
            for (o, score) in scores.iter_mut().enumerate() {
                *score += self.weights[f * self.n_outcomes + o];
            }
        }
        scores
    }

    fn update(&mut self, feature: usize, outcome: usize, delta: f64) {
        let key = feature * self.n_outcomes + outcome;
        // o peso antigo valeu de `last_update` até agora
        self.totals[key] += (self.steps - self.last_update[key]) as f64 * self.weights[key];
        self.last_update[key] = self.steps;
        self.weights[key] += delta;
    }

    fn finalize(mut self) -> Vec<f64> {
        if self.steps == 0 {
            return self.weights;
        }
        let steps = self.steps as f64;
        for key in 0..self.weights.len() {
            self.totals[key] += (self.steps - self.last_update[key]) as f64 * self.weights[key];
            self.totals[key] /= steps;
        }
        self.totals
    }
}

fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(outcome: &str, context: &[&str]) -> Event {
        Event {
            outcome: outcome.to_string(),
            context: context.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_perceptron_learning_lazy() {
        let events = vec![
            event("PER-START", &["w=lula", "wc=ic"]),
            event("OTHER", &["w=é", "wc=lc"]),
            event("OTHER", &["w=presidente", "wc=lc"]),
        ];
        let params = TrainingParameters {
            iterations: 5,
            ..Default::default()
        };
        let model = PerceptronTrainer.train(&events, &params).unwrap();
        assert_eq!(model.outcomes(), ["OTHER", "PER-START"]);

        let probs = model.eval(&["w=lula".to_string()]);
        assert!(probs[1] > probs[0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cutoff_drops_rare_features() {
        let events = vec![
            event("A", &["shared", "rare"]),
            event("B", &["shared"]),
        ];
        let params = TrainingParameters {
            cutoff: 2,
            iterations: 3,
            ..Default::default()
        };
        let model = PerceptronTrainer.train(&events, &params).unwrap();
        let probs = model.eval(&["rare".to_string()]);
        assert!((probs[0] - probs[1]).abs() < 1e-9);
    }

    #[test]
    fn test_empty_events_fail() {
        let result = PerceptronTrainer.train(&[], &TrainingParameters::default());
        assert!(matches!(result, Err(SeqError::Training(_))));
    }
}
