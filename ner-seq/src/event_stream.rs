//! # Stream de Eventos de Treino
//!
//! Converte amostras anotadas em eventos `(rótulo, contexto)`, um por token, na
//! ordem dos tokens. Para cada amostra:
//!
//! 1. Limpa o estado adaptativo se a amostra pedir.
//! 2. Codifica os spans em rótulos (um por token).
//! 3. Expõe o contexto adicional da amostra ao gerador de contexto adicional.
//! 4. Gera o contexto de cada token, na ordem.
//! 5. Atualiza o estado adaptativo com a sentença inteira e seus rótulos.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::SequenceCodec;
use crate::context::ContextGenerator;
use crate::error::{Result, SeqError};
use crate::features::{FeatureGenerator, Sentence};
use crate::sample::{Sample, SampleStream, DEFAULT_TYPE};

/// Um exemplo de treino para o classificador: o rótulo ouro e as features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub outcome: String,
    pub context: Vec<String>,
}

/// Stream preguiçoso de eventos sobre um [`SampleStream`].
pub struct EventStream<S> {
    samples: S,
    context_generator: ContextGenerator,
    codec: Arc<dyn SequenceCodec>,
    default_type: String,
    pending: VecDeque<Event>,
    finished: bool,
}

impl<S: SampleStream> EventStream<S> {
    pub fn new(samples: S, mut context_generator: ContextGenerator, codec: Arc<dyn SequenceCodec>) -> Self {
        context_generator.register_additional_context();
        Self {
            samples,
            context_generator,
            codec,
            default_type: DEFAULT_TYPE.to_string(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Tipo usado para spans sem rótulo.
    pub fn with_default_type(mut self, default_type: impl Into<String>) -> Self {
        self.default_type = default_type.into();
        self
    }

    /// Gera os eventos de uma amostra, na ordem dos tokens.
    pub fn events_for(&mut self, sample: &Sample) -> Result<Vec<Event>> {
        if sample.clear_adaptive_data() {
            self.context_generator.clear_adaptive_data();
        }

        let tokens = sample.tokens();
        let outcomes = self
            .codec
            .encode(sample.spans(), tokens.len(), &self.default_type)?;
        if outcomes.len() != tokens.len() {
            return Err(SeqError::MalformedSample(format!(
                "codec {} gerou {} rótulos para {} tokens",
                self.codec.name(),
                outcomes.len(),
                tokens.len()
            )));
        }

        let sentence = Sentence::new(tokens).with_additional_context(sample.additional_context());
        let events = outcomes
            .iter()
            .enumerate()
            .map(|(index, outcome)| Event {
                outcome: outcome.clone(),
                context: self.context_generator.context_for(&sentence, index, &outcomes),
            })
            .collect();
        trace!(tokens = tokens.len(), "eventos gerados para a amostra");

        self.context_generator.update_adaptive_data(tokens, &outcomes);
        Ok(events)
    }

    /// Fecha o stream de amostras subjacente.
    pub fn close(&mut self) -> Result<()> {
        self.finished = true;
        self.samples.close()
    }

    /// Consome o stream inteiro e o fecha, com sucesso ou não.
    pub fn collect_events(mut self) -> Result<Vec<Event>> {
        let collected: Result<Vec<Event>> = self.by_ref().collect();
        let closed = self.samples.close();
        let events = collected?;
        closed?;
        Ok(events)
    }
}

impl<S: SampleStream> Iterator for EventStream<S> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }
            let sample = match self.samples.read() {
                Ok(Some(sample)) => sample,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };
            match self.events_for(&sample) {
                Ok(events) => self.pending.extend(events),
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Contexto adicional com as decisões anteriores de cada token
/// (`pd=<decisão>`), a partir de um mapa token → decisão.
pub fn additional_context(tokens: &[String], previous: &HashMap<String, String>) -> Vec<Vec<String>> {
    tokens
        .iter()
        .map(|token| match previous.get(token) {
            Some(decision) => vec![format!("pd={decision}")],
            None => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::codec::{BilouCodec, BioCodec, CodecError};
    use crate::features::{PreviousMapFeatureGenerator, TokenFeatureGenerator};
    use crate::sample::{tokens, Span, VecSampleStream};

    fn sample(text: &str, spans: Vec<Span>, clear: bool) -> Sample {
        Sample::new(tokens(text), spans, clear).unwrap()
    }

    fn stream(samples: Vec<Sample>) -> EventStream<VecSampleStream> {
        let cg = ContextGenerator::new(vec![
            Box::new(TokenFeatureGenerator::default()),
            Box::new(PreviousMapFeatureGenerator::new()),
        ]);
        EventStream::new(VecSampleStream::new(samples), cg, Arc::new(BioCodec))
    }

    #[test]
    fn test_one_event_per_token_in_order() {
        let samples = vec![sample(
            "John Smith works in Paris",
            vec![Span::new(0, 2, "PERSON"), Span::new(4, 5, "LOCATION")],
            false,
        )];
        let events = stream(samples).collect_events().unwrap();
        let outcomes: Vec<&str> = events.iter().map(|e| e.outcome.as_str()).collect();
        assert_eq!(
            outcomes,
            vec!["PERSON-START", "PERSON-CONTINUE", "OTHER", "OTHER", "LOCATION-START"]
        );
        assert!(events[4].context.contains(&"w=paris".to_string()));
        assert!(events[1].context.contains(&"po=PERSON-START".to_string()));
    }

    #[test]
    fn test_adaptive_data_flows_between_samples_until_cleared() {
        let samples = vec![
            sample("Paris", vec![Span::new(0, 1, "LOC")], false),
            sample("Paris again", vec![], false),
            sample("Paris", vec![], true),
        ];
        let events = stream(samples).collect_events().unwrap();
        assert_eq!(events.len(), 4);
        assert!(!events[0].context.iter().any(|f| f.starts_with("pd=")));
        assert!(events[1].context.contains(&"pd=LOC-START".to_string()));
        assert!(!events[3].context.iter().any(|f| f.starts_with("pd=")));
    }

    struct ClearProbe {
        clears: Arc<AtomicUsize>,
        seen_clears: Arc<AtomicUsize>,
    }

    impl FeatureGenerator for ClearProbe {
        fn create_features(&self, features: &mut Vec<String>, _: &Sentence<'_>, _: usize, _: &[String]) {
            self.seen_clears
                .store(self.clears.load(Ordering::SeqCst), Ordering::SeqCst);
            features.push("probe".into());
        }

        fn clear_adaptive_data(&mut self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_clear_happens_before_features() {
        let clears = Arc::new(AtomicUsize::new(0));
        let seen_clears = Arc::new(AtomicUsize::new(0));
        let cg = ContextGenerator::new(vec![Box::new(ClearProbe {
            clears: clears.clone(),
            seen_clears: seen_clears.clone(),
        })]);
        let mut events = EventStream::new(VecSampleStream::new(vec![]), cg, Arc::new(BioCodec));

        events.events_for(&sample("a b", vec![], false)).unwrap();
        assert_eq!(seen_clears.load(Ordering::SeqCst), 0);
        events.events_for(&sample("c d", vec![], true)).unwrap();
        assert_eq!(seen_clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_additional_context_reaches_features() {
        let toks = tokens("John Smith");
        let previous = HashMap::from([("John".to_string(), "PER-START".to_string())]);
        let extra = additional_context(&toks, &previous);
        assert_eq!(extra, vec![vec!["pd=PER-START".to_string()], vec![]]);

        let sample = Sample::new(toks, vec![], false)
            .unwrap()
            .with_additional_context(extra)
            .unwrap();
        let events = stream(vec![sample]).collect_events().unwrap();
        assert!(events[0].context.contains(&"ne=pd=PER-START".to_string()));
        assert!(events[1].context.contains(&"p1ne=pd=PER-START".to_string()));
    }

    #[test]
    fn test_untyped_spans_use_default_type() {
        let samples = vec![sample("Paris", vec![Span::untyped(0, 1)], false)];
        let events = stream(samples.clone()).collect_events().unwrap();
        assert_eq!(events[0].outcome, "default-START");

        let events = stream(samples)
            .with_default_type("MISC")
            .collect_events()
            .unwrap();
        assert_eq!(events[0].outcome, "MISC-START");
    }

    #[test]
    fn test_empty_default_type_is_rejected() {
        let samples = vec![sample("Paris", vec![Span::untyped(0, 1)], false)];
        let result = stream(samples).with_default_type("").collect_events();
        assert!(matches!(
            result,
            Err(SeqError::Codec(CodecError::EmptyLabel { start: 0, end: 1 }))
        ));
    }

    /// Codec defeituoso: perde o rótulo do último token.
    struct ShortCodec;

    impl SequenceCodec for ShortCodec {
        fn name(&self) -> &str {
            "SHORT"
        }

        fn encode(
            &self,
            spans: &[Span],
            length: usize,
            default_type: &str,
        ) -> std::result::Result<Vec<String>, CodecError> {
            let mut outcomes = BioCodec.encode(spans, length, default_type)?;
            outcomes.pop();
            Ok(outcomes)
        }

        fn decode(&self, outcomes: &[String]) -> std::result::Result<Vec<Span>, CodecError> {
            BioCodec.decode(outcomes)
        }

        fn validator(&self) -> Box<dyn crate::codec::SequenceValidator> {
            BioCodec.validator()
        }

        fn are_outcomes_compatible(&self, outcomes: &[String]) -> bool {
            BioCodec.are_outcomes_compatible(outcomes)
        }
    }

    #[test]
    fn test_label_count_mismatch_fails_fast() {
        let mut events = EventStream::new(
            VecSampleStream::new(vec![]),
            ContextGenerator::default(),
            Arc::new(ShortCodec),
        );
        let err = events
            .events_for(&sample("John Smith", vec![Span::new(0, 2, "PER")], false))
            .unwrap_err();
        assert!(matches!(err, SeqError::MalformedSample(_)));
        assert!(err.to_string().contains("1 rótulos para 2 tokens"));
    }

    /// Stream que falha na segunda leitura e registra o fechamento.
    struct FlakyStream {
        samples: Vec<Sample>,
        fail_after: usize,
        reads: usize,
        closed: Arc<AtomicBool>,
    }

    impl SampleStream for FlakyStream {
        fn read(&mut self) -> Result<Option<Sample>> {
            self.reads += 1;
            if self.reads > self.fail_after {
                return Err(SeqError::Io(std::io::Error::other("conexão perdida")));
            }
            Ok(self.samples.pop())
        }

        fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_collect_events_closes_stream_on_read_error() {
        let closed = Arc::new(AtomicBool::new(false));
        let samples = FlakyStream {
            samples: vec![sample("a b", vec![], false)],
            fail_after: 1,
            reads: 0,
            closed: closed.clone(),
        };
        let result = EventStream::new(samples, ContextGenerator::default(), Arc::new(BioCodec))
            .collect_events();
        assert!(matches!(result, Err(SeqError::Io(_))));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_collect_events_closes_stream_on_event_error() {
        let closed = Arc::new(AtomicBool::new(false));
        let samples = FlakyStream {
            samples: vec![sample("a b", vec![Span::untyped(0, 1)], false)],
            fail_after: usize::MAX,
            reads: 0,
            closed: closed.clone(),
        };
        let result = EventStream::new(samples, ContextGenerator::default(), Arc::new(BioCodec))
            .with_default_type("")
            .collect_events();
        assert!(matches!(result, Err(SeqError::Codec(_))));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_overlapping_spans_fail_fast() {
        let bad = sample("a b c", vec![Span::new(0, 2, "A"), Span::new(1, 3, "A")], false);
        let cg = ContextGenerator::default();
        let result = EventStream::new(VecSampleStream::new(vec![bad]), cg, Arc::new(BilouCodec))
            .collect_events();
        assert!(matches!(result, Err(SeqError::Codec(_))));
    }
}
