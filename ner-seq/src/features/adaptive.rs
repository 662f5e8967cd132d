use std::collections::HashMap;

use super::{FeatureGenerator, Sentence};

/// Lembra o último rótulo atribuído a cada palavra em sentenças anteriores.
///
/// Se "Paris" foi rotulada `LOCATION-START` antes no mesmo documento, toda nova
/// ocorrência ganha a feature `pd=LOCATION-START`. O mapa é preenchido em
/// [`FeatureGenerator::update_adaptive_data`] e esvaziado a cada novo
/// documento.
#[derive(Debug, Clone, Default)]
pub struct PreviousMapFeatureGenerator {
    previous: HashMap<String, String>,
}

impl PreviousMapFeatureGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureGenerator for PreviousMapFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        if let Some(decision) = self.previous.get(&sentence.tokens()[index]) {
            features.push(format!("pd={decision}"));
        }
    }

    fn update_adaptive_data(&mut self, tokens: &[String], outcomes: &[String]) {
        for (token, outcome) in tokens.iter().zip(outcomes) {
            self.previous.insert(token.clone(), outcome.clone());
        }
    }

    fn clear_adaptive_data(&mut self) {
        self.previous.clear();
    }
}

/// Repassa o contexto adicional por token que vem da própria amostra
/// (`ne=<valor>`), por exemplo decisões de um documento anterior.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditionalContextFeatureGenerator;

impl FeatureGenerator for AdditionalContextFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        features.extend(
            sentence
                .additional_context(index)
                .iter()
                .map(|value| format!("ne={value}")),
        );
    }
}
