//! # Rotulador Sequencial
//!
//! Junta um [`EventModel`] treinado, um gerador de contexto e um codec. A
//! predição é uma busca em feixe sobre os rótulos do modelo:
//!
//! 1. Para cada hipótese do feixe, gera o contexto do token atual usando os
//!    rótulos que a própria hipótese já escolheu.
//! 2. Expande a hipótese com cada rótulo que o validador do codec aceita.
//! 3. Mantém as `beam_size` melhores por soma de log-probabilidades.
//!
//! Ao fim da sentença o estado adaptativo é atualizado com a melhor sequência,
//! como no treino.

use std::sync::Arc;

use tracing::debug;

use crate::codec::{SequenceCodec, SequenceValidator};
use crate::context::ContextGenerator;
use crate::error::{Result, SeqError};
use crate::event_stream::EventStream;
use crate::factory::SequenceLabelerFactory;
use crate::features::{FeatureGenerator, Sentence};
use crate::model::{EventModel, EventTrainer, TrainingParameters};
use crate::sample::{SampleStream, Span};

pub struct SequenceLabeler {
    model: Box<dyn EventModel>,
    context_generator: ContextGenerator,
    codec: Arc<dyn SequenceCodec>,
    validator: Box<dyn SequenceValidator>,
    beam_size: usize,
}

#[derive(Debug, Clone)]
struct Hypothesis {
    outcomes: Vec<String>,
    score: f64,
}

impl SequenceLabeler {
    pub fn new(
        model: Box<dyn EventModel>,
        mut context_generator: ContextGenerator,
        codec: Arc<dyn SequenceCodec>,
        beam_size: usize,
    ) -> Self {
        context_generator.register_additional_context();
        let validator = codec.validator();
        Self {
            model,
            context_generator,
            codec,
            validator,
            beam_size: beam_size.max(1),
        }
    }

    /// Treina um rotulador: gera os eventos com um gerador de contexto novo da
    /// fábrica, entrega ao treinador e monta o rotulador com outro gerador
    /// novo (estado adaptativo vazio).
    pub fn train<S: SampleStream>(
        samples: S,
        factory: &SequenceLabelerFactory,
        trainer: &dyn EventTrainer,
        params: &TrainingParameters,
    ) -> Result<Self> {
        let codec = factory.create_codec()?;
        let events = EventStream::new(samples, factory.create_context_generator()?, Arc::clone(&codec))
            .collect_events()?;
        debug!(events = events.len(), codec = codec.name(), "treinando modelo");

        let model = trainer.train(&events, params)?;
        if !codec.are_outcomes_compatible(model.outcomes()) {
            return Err(SeqError::Training(format!(
                "os rótulos do modelo {:?} não formam entidades completas no codec {}",
                model.outcomes(),
                codec.name()
            )));
        }
        Ok(Self::new(
            model,
            factory.create_context_generator()?,
            codec,
            params.beam_size,
        ))
    }

    pub fn codec(&self) -> &dyn SequenceCodec {
        self.codec.as_ref()
    }

    pub fn predict(&mut self, tokens: &[String]) -> Result<Vec<String>> {
        self.predict_with_context(tokens, None)
    }

    /// Melhor sequência de rótulos para a sentença.
    pub fn predict_with_context(
        &mut self,
        tokens: &[String],
        additional_context: Option<&[Vec<String>]>,
    ) -> Result<Vec<String>> {
        let sentence = Sentence::new(tokens).with_additional_context(additional_context);
        let outcomes = self.model.outcomes();

        let mut beam = vec![Hypothesis {
            outcomes: Vec::with_capacity(tokens.len()),
            score: 0.0,
        }];
        for index in 0..tokens.len() {
            let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
            for (h, hypothesis) in beam.iter().enumerate() {
                let context = self
                    .context_generator
                    .context_for(&sentence, index, &hypothesis.outcomes);
                let probs = self.model.eval(&context);
                for (o, (outcome, p)) in outcomes.iter().zip(probs).enumerate() {
                    if self
                        .validator
                        .valid_sequence(index, tokens, &hypothesis.outcomes, outcome)
                    {
                        candidates.push((h, o, hypothesis.score + p.ln()));
                    }
                }
            }
            if candidates.is_empty() {
                return Err(SeqError::NoValidSequence { index });
            }

            candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
            candidates.truncate(self.beam_size);
            beam = candidates
                .into_iter()
                .map(|(h, o, score)| {
                    let mut next = beam[h].outcomes.clone();
                    next.push(outcomes[o].clone());
                    Hypothesis {
                        outcomes: next,
                        score,
                    }
                })
                .collect();
        }

        let best = beam.swap_remove(0).outcomes;
        self.context_generator.update_adaptive_data(tokens, &best);
        Ok(best)
    }

    /// Prediz e decodifica em spans.
    pub fn find(
        &mut self,
        tokens: &[String],
        additional_context: Option<&[Vec<String>]>,
    ) -> Result<Vec<Span>> {
        let outcomes = self.predict_with_context(tokens, additional_context)?;
        Ok(self.codec.decode(&outcomes)?)
    }

    /// Esquece o estado adaptativo (início de novo documento).
    pub fn clear_adaptive_data(&mut self) {
        self.context_generator.clear_adaptive_data();
    }
}
