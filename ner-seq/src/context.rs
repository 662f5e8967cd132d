//! # Gerador de Contexto
//!
//! Agrega uma lista ordenada de [`FeatureGenerator`]s e produz o conjunto
//! completo de features de um token: as features de cada gerador mais as
//! features das decisões anteriores:
//!
//! - `po=<rótulo anterior>`
//! - `pow=<rótulo anterior>,<token>`
//! - `powf=<rótulo anterior>,<forma do token>`
//!
//! O resultado é um conjunto: duplicatas são descartadas mantendo a ordem da
//! primeira ocorrência.

use std::collections::HashSet;

use crate::codec::OTHER;
use crate::features::{
    token_shape, AdditionalContextFeatureGenerator, FeatureGenerator, Sentence,
    WindowFeatureGenerator,
};

/// Janela usada para o contexto adicional vindo das amostras.
pub const ADDITIONAL_CONTEXT_WINDOW: usize = 8;

/// Gerador de contexto dono do estado adaptativo de todos os seus geradores.
///
/// Uma instância nunca é compartilhada entre folds de validação cruzada: cada
/// fold constrói a sua pela fábrica.
#[derive(Default)]
pub struct ContextGenerator {
    generators: Vec<Box<dyn FeatureGenerator>>,
    additional_context: bool,
}

impl ContextGenerator {
    pub fn new(generators: Vec<Box<dyn FeatureGenerator>>) -> Self {
        Self {
            generators,
            additional_context: false,
        }
    }

    /// Registra mais um gerador ao fim da lista.
    pub fn add_feature_generator(&mut self, generator: Box<dyn FeatureGenerator>) {
        self.generators.push(generator);
    }

    /// Registra (uma única vez) o gerador que lê o contexto adicional das
    /// amostras, envolto em uma janela de ±8 tokens.
    pub fn register_additional_context(&mut self) {
        if self.additional_context {
            return;
        }
        self.additional_context = true;
        self.add_feature_generator(Box::new(WindowFeatureGenerator::new(
            Box::new(AdditionalContextFeatureGenerator),
            ADDITIONAL_CONTEXT_WINDOW,
            ADDITIONAL_CONTEXT_WINDOW,
        )));
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Contexto do token `index` para uma sentença avulsa.
    pub fn context(
        &self,
        index: usize,
        tokens: &[String],
        previous_outcomes: &[String],
        additional_context: Option<&[Vec<String>]>,
    ) -> Vec<String> {
        let sentence = Sentence::new(tokens).with_additional_context(additional_context);
        self.context_for(&sentence, index, previous_outcomes)
    }

    /// Contexto do token `index`, reaproveitando o cache da sentença.
    pub fn context_for(
        &self,
        sentence: &Sentence<'_>,
        index: usize,
        previous_outcomes: &[String],
    ) -> Vec<String> {
        let mut features = Vec::new();
        self.create_features(&mut features, sentence, index, previous_outcomes);

        let token = &sentence.tokens()[index];
        let previous = index
            .checked_sub(1)
            .and_then(|i| previous_outcomes.get(i))
            .map(String::as_str)
            .unwrap_or(OTHER);
        features.push(format!("po={previous}"));
        features.push(format!("pow={previous},{token}"));
        features.push(format!("powf={previous},{}", token_shape(token)));

        let mut seen = HashSet::with_capacity(features.len());
        features.retain(|f| seen.insert(f.clone()));
        features
    }
}

impl FeatureGenerator for ContextGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        previous_outcomes: &[String],
    ) {
        for generator in &self.generators {
            generator.create_features(features, sentence, index, previous_outcomes);
        }
    }

    fn update_adaptive_data(&mut self, tokens: &[String], outcomes: &[String]) {
        for generator in &mut self.generators {
            generator.update_adaptive_data(tokens, outcomes);
        }
    }

    fn clear_adaptive_data(&mut self) {
        for generator in &mut self.generators {
            generator.clear_adaptive_data();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{PreviousMapFeatureGenerator, TokenFeatureGenerator};
    use crate::sample::tokens;

    fn generator() -> ContextGenerator {
        ContextGenerator::new(vec![
            Box::new(TokenFeatureGenerator::default()),
            Box::new(TokenFeatureGenerator::default()),
            Box::new(PreviousMapFeatureGenerator::new()),
        ])
    }

    #[test]
    fn test_context_is_deduplicated_and_has_previous_outcome() {
        let toks = tokens("John Smith");
        let previous = vec!["PER-START".to_string()];
        let context = generator().context(1, &toks, &previous, None);
        assert_eq!(
            context,
            vec!["w=smith", "po=PER-START", "pow=PER-START,Smith", "powf=PER-START,ic"]
        );

        let first = generator().context(0, &toks, &[], None);
        assert!(first.contains(&"po=OTHER".to_string()));
    }

    #[test]
    fn test_adaptive_fan_out() {
        let mut cg = generator();
        let toks = tokens("Paris");
        cg.update_adaptive_data(&toks, &["LOC-UNIT".to_string()]);
        assert!(cg.context(0, &toks, &[], None).contains(&"pd=LOC-UNIT".to_string()));

        cg.clear_adaptive_data();
        assert!(!cg
            .context(0, &toks, &[], None)
            .iter()
            .any(|f| f.starts_with("pd=")));
    }

    #[test]
    fn test_additional_context_registered_once() {
        let mut cg = generator();
        cg.register_additional_context();
        cg.register_additional_context();
        assert_eq!(cg.len(), 4);

        let toks = tokens("John Smith");
        let extra = vec![vec!["pd=PER".to_string()], vec![]];
        let context = cg.context(1, &toks, &[], Some(&extra));
        assert!(context.contains(&"p1ne=pd=PER".to_string()));
    }
}
