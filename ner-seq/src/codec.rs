//! # Codecs de Sequência: BIO e BILOU
//!
//! Um codec converte spans de entidades em uma tag por token (e de volta).
//! Os rótulos seguem a gramática `OTHER` ∪ `TIPO-PAPEL`:
//!
//! | Esquema | Papéis                             | "John Smith works in Paris"                               |
//! |---------|------------------------------------|-----------------------------------------------------------|
//! | BIO     | START, CONTINUE                    | PERSON-START PERSON-CONTINUE OTHER OTHER LOCATION-START   |
//! | BILOU   | UNIT, START, CONTINUE, LAST        | PERSON-START PERSON-LAST OTHER OTHER LOCATION-UNIT        |
//!
//! ## Transições
//!
//! Cada codec expõe um [`SequenceValidator`] consultado passo a passo pela busca
//! em feixe. A decodificação usa as mesmas regras de transição: um `CONTINUE`
//! sem um `START` aberto do mesmo tipo é erro, nunca é "consertado".
//!
//! A exceção é o fim da sequência. O validador BILOU proíbe `START`/`CONTINUE`
//! no último token, mas a decodificação aceita uma entidade ainda aberta ali e
//! a fecha no fim da sequência.
//!
//! Dois spans adjacentes do mesmo tipo continuam separados: o segundo começa com
//! um novo `START` (ou `UNIT`), que quebra a continuidade mesmo sem um `OTHER`
//! entre eles.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sample::Span;

/// Rótulo dos tokens fora de qualquer entidade.
pub const OTHER: &str = "OTHER";

/// Falhas de codificação e decodificação.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("span [{start}, {end}) fora de uma sequência de {length} tokens")]
    SpanOutOfBounds {
        start: usize,
        end: usize,
        length: usize,
    },

    #[error("spans sobrepostos no token {index}")]
    OverlappingSpans { index: usize },

    #[error("span [{start}, {end}) com tipo vazio")]
    EmptyLabel { start: usize, end: usize },

    #[error("rótulo {outcome:?} inválido na posição {index}")]
    InvalidOutcome { index: usize, outcome: String },

    #[error("transição ilegal na posição {index}: {previous:?} -> {outcome:?}")]
    IllegalTransition {
        index: usize,
        previous: Option<String>,
        outcome: String,
    },
}

/// Papel de um token dentro de uma entidade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagRole {
    /// Primeiro token de uma entidade com mais de um token (ou de qualquer entidade no BIO).
    Start,
    /// Token intermediário (no BIO, qualquer token após o primeiro).
    Continue,
    /// Último token de uma entidade multi-token (apenas BILOU).
    Last,
    /// Entidade de um único token (apenas BILOU).
    Unit,
}

impl TagRole {
    pub fn name(&self) -> &'static str {
        match self {
            TagRole::Start => "START",
            TagRole::Continue => "CONTINUE",
            TagRole::Last => "LAST",
            TagRole::Unit => "UNIT",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "START" => Some(TagRole::Start),
            "CONTINUE" => Some(TagRole::Continue),
            "LAST" => Some(TagRole::Last),
            "UNIT" => Some(TagRole::Unit),
            _ => None,
        }
    }

    /// Papéis que deixam uma entidade aberta para o próximo token.
    fn is_open(&self) -> bool {
        matches!(self, TagRole::Start | TagRole::Continue)
    }

    /// Papéis que só fazem sentido continuando uma entidade aberta.
    fn continues(&self) -> bool {
        matches!(self, TagRole::Continue | TagRole::Last)
    }
}

/// Rótulo de um token já interpretado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<'a> {
    Other,
    Entity { label: &'a str, role: TagRole },
}

impl<'a> Outcome<'a> {
    /// Interpreta um rótulo textual (ex: "PERSON-START" → Entity(PERSON, Start)).
    ///
    /// O tipo é separado pelo último `-`, então tipos com hífen funcionam.
    pub fn parse(s: &'a str) -> Option<Self> {
        if s == OTHER {
            return Some(Outcome::Other);
        }
        let (label, role) = s.rsplit_once('-')?;
        if label.is_empty() {
            return None;
        }
        Some(Outcome::Entity {
            label,
            role: TagRole::from_name(role)?,
        })
    }

    pub fn role(&self) -> Option<TagRole> {
        match self {
            Outcome::Other => None,
            Outcome::Entity { role, .. } => Some(*role),
        }
    }
}

impl fmt::Display for Outcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Other => f.write_str(OTHER),
            Outcome::Entity { label, role } => write!(f, "{label}-{}", role.name()),
        }
    }
}

/// Consulta de legalidade de um rótulo candidato, dada a sequência parcial.
///
/// Usado pela busca em feixe para podar transições impossíveis no esquema.
pub trait SequenceValidator: Send + Sync {
    fn valid_sequence(
        &self,
        index: usize,
        tokens: &[String],
        previous_outcomes: &[String],
        candidate: &str,
    ) -> bool;
}

/// Esquema de codificação de spans em tags por token.
pub trait SequenceCodec: Send + Sync {
    /// Nome sob o qual o codec é registrado (ex: "BIO").
    fn name(&self) -> &str;

    /// Gera exatamente `length` rótulos. Spans sem tipo usam `default_type`.
    fn encode(
        &self,
        spans: &[Span],
        length: usize,
        default_type: &str,
    ) -> Result<Vec<String>, CodecError>;

    /// Reconstrói os spans varrendo os rótulos da esquerda para a direita.
    fn decode(&self, outcomes: &[String]) -> Result<Vec<Span>, CodecError>;

    fn validator(&self) -> Box<dyn SequenceValidator>;

    /// Verifica se um conjunto de rótulos (ex: os de um modelo treinado) pode
    /// formar entidades completas neste esquema.
    fn are_outcomes_compatible(&self, outcomes: &[String]) -> bool;
}

/// As duas variantes de esquema embutidas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Bio,
    Bilou,
}

impl Scheme {
    fn role_at(&self, span_len: usize, offset: usize) -> TagRole {
        match self {
            Scheme::Bio if offset == 0 => TagRole::Start,
            Scheme::Bio => TagRole::Continue,
            Scheme::Bilou if span_len == 1 => TagRole::Unit,
            Scheme::Bilou if offset == 0 => TagRole::Start,
            Scheme::Bilou if offset + 1 == span_len => TagRole::Last,
            Scheme::Bilou => TagRole::Continue,
        }
    }

    /// Regras de transição entre dois rótulos consecutivos.
    ///
    /// - `X-CONTINUE` (e `X-LAST`) só seguem `X-START` ou `X-CONTINUE`.
    /// - No BILOU, depois de `X-START`/`X-CONTINUE` só vem `X-CONTINUE`/`X-LAST`.
    /// - O BIO não conhece `LAST` nem `UNIT`.
    fn allows(&self, previous: Option<Outcome<'_>>, next: Outcome<'_>) -> bool {
        if let Outcome::Entity { role, .. } = next {
            if *self == Scheme::Bio && matches!(role, TagRole::Last | TagRole::Unit) {
                return false;
            }
        }

        let open = match previous {
            Some(Outcome::Entity { label, role }) if role.is_open() => Some(label),
            _ => None,
        };

        match next {
            Outcome::Entity { label, role } if role.continues() => open == Some(label),
            _ => *self == Scheme::Bio || open.is_none(),
        }
    }

    fn encode(
        &self,
        spans: &[Span],
        length: usize,
        default_type: &str,
    ) -> Result<Vec<String>, CodecError> {
        let mut outcomes = vec![OTHER.to_string(); length];
        let mut taken = vec![false; length];

        for span in spans {
            if span.start >= span.end || span.end > length {
                return Err(CodecError::SpanOutOfBounds {
                    start: span.start,
                    end: span.end,
                    length,
                });
            }
            let label = span.label_or(default_type);
            if label.is_empty() {
                return Err(CodecError::EmptyLabel {
                    start: span.start,
                    end: span.end,
                });
            }
            for index in span.start..span.end {
                if taken[index] {
                    return Err(CodecError::OverlappingSpans { index });
                }
                taken[index] = true;
                let role = self.role_at(span.len(), index - span.start);
                outcomes[index] = Outcome::Entity { label, role }.to_string();
            }
        }

        Ok(outcomes)
    }

    fn decode(&self, outcomes: &[String]) -> Result<Vec<Span>, CodecError> {
        let mut spans = Vec::new();
        let mut open: Option<(usize, &str)> = None;
        let mut previous: Option<Outcome<'_>> = None;

        for (index, raw) in outcomes.iter().enumerate() {
            let outcome = Outcome::parse(raw).ok_or_else(|| CodecError::InvalidOutcome {
                index,
                outcome: raw.clone(),
            })?;
            if !self.allows(previous, outcome) {
                return Err(CodecError::IllegalTransition {
                    index,
                    previous: index.checked_sub(1).map(|i| outcomes[i].clone()),
                    outcome: raw.clone(),
                });
            }

            match outcome {
                Outcome::Other => close(&mut spans, &mut open, index),
                Outcome::Entity { label, role } => match role {
                    TagRole::Start => {
                        close(&mut spans, &mut open, index);
                        open = Some((index, label));
                    }
                    TagRole::Unit => {
                        close(&mut spans, &mut open, index);
                        spans.push(Span::new(index, index + 1, label));
                    }
                    TagRole::Continue => {}
                    TagRole::Last => close(&mut spans, &mut open, index + 1),
                },
            }
            previous = Some(outcome);
        }

        close(&mut spans, &mut open, outcomes.len());
        Ok(spans)
    }

    fn are_outcomes_compatible(&self, outcomes: &[String]) -> bool {
        let mut seen: HashSet<(&str, TagRole)> = HashSet::new();
        for raw in outcomes {
            match Outcome::parse(raw) {
                Some(Outcome::Entity { label, role }) => {
                    seen.insert((label, role));
                }
                Some(Outcome::Other) => {}
                None => return false,
            }
        }

        seen.iter().all(|&(label, role)| match (self, role) {
            (Scheme::Bio, TagRole::Start) => true,
            (Scheme::Bio, TagRole::Continue) => seen.contains(&(label, TagRole::Start)),
            (Scheme::Bio, _) => false,
            (Scheme::Bilou, TagRole::Unit) => true,
            (Scheme::Bilou, TagRole::Start) => seen.contains(&(label, TagRole::Last)),
            (Scheme::Bilou, TagRole::Continue | TagRole::Last) => {
                seen.contains(&(label, TagRole::Start))
            }
        })
    }
}

fn close(spans: &mut Vec<Span>, open: &mut Option<(usize, &str)>, end: usize) {
    if let Some((start, label)) = open.take() {
        spans.push(Span::new(start, end, label));
    }
}

fn valid_step(
    scheme: Scheme,
    index: usize,
    tokens: &[String],
    previous_outcomes: &[String],
    candidate: &str,
) -> bool {
    let Some(next) = Outcome::parse(candidate) else {
        return false;
    };
    let previous = match index.checked_sub(1) {
        Some(prev) => match previous_outcomes.get(prev).map(|o| Outcome::parse(o)) {
            Some(Some(outcome)) => Some(outcome),
            _ => return false,
        },
        None => None,
    };
    if !scheme.allows(previous, next) {
        return false;
    }
    // Uma entidade BILOU não pode terminar aberta no último token.
    let last = index + 1 == tokens.len();
    !(scheme == Scheme::Bilou && last && next.role().is_some_and(|r| r.is_open()))
}

/// Validador do esquema BIO.
#[derive(Debug, Clone, Copy, Default)]
pub struct BioValidator;

impl SequenceValidator for BioValidator {
    fn valid_sequence(
        &self,
        index: usize,
        tokens: &[String],
        previous_outcomes: &[String],
        candidate: &str,
    ) -> bool {
        valid_step(Scheme::Bio, index, tokens, previous_outcomes, candidate)
    }
}

/// Validador do esquema BILOU.
#[derive(Debug, Clone, Copy, Default)]
pub struct BilouValidator;

impl SequenceValidator for BilouValidator {
    fn valid_sequence(
        &self,
        index: usize,
        tokens: &[String],
        previous_outcomes: &[String],
        candidate: &str,
    ) -> bool {
        valid_step(Scheme::Bilou, index, tokens, previous_outcomes, candidate)
    }
}

/// Codec BIO: `X-START` no primeiro token, `X-CONTINUE` nos demais.
#[derive(Debug, Clone, Copy, Default)]
pub struct BioCodec;

impl BioCodec {
    pub const NAME: &'static str = "BIO";
}

impl SequenceCodec for BioCodec {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn encode(
        &self,
        spans: &[Span],
        length: usize,
        default_type: &str,
    ) -> Result<Vec<String>, CodecError> {
        Scheme::Bio.encode(spans, length, default_type)
    }

    fn decode(&self, outcomes: &[String]) -> Result<Vec<Span>, CodecError> {
        Scheme::Bio.decode(outcomes)
    }

    fn validator(&self) -> Box<dyn SequenceValidator> {
        Box::new(BioValidator)
    }

    fn are_outcomes_compatible(&self, outcomes: &[String]) -> bool {
        Scheme::Bio.are_outcomes_compatible(outcomes)
    }
}

/// Codec BILOU: `X-UNIT` para entidades de um token; `X-START`,
/// `X-CONTINUE`..., `X-LAST` para as demais.
#[derive(Debug, Clone, Copy, Default)]
pub struct BilouCodec;

impl BilouCodec {
    pub const NAME: &'static str = "BILOU";
}

impl SequenceCodec for BilouCodec {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn encode(
        &self,
        spans: &[Span],
        length: usize,
        default_type: &str,
    ) -> Result<Vec<String>, CodecError> {
        Scheme::Bilou.encode(spans, length, default_type)
    }

    fn decode(&self, outcomes: &[String]) -> Result<Vec<Span>, CodecError> {
        Scheme::Bilou.decode(outcomes)
    }

    fn validator(&self) -> Box<dyn SequenceValidator> {
        Box::new(BilouValidator)
    }

    fn are_outcomes_compatible(&self, outcomes: &[String]) -> bool {
        Scheme::Bilou.are_outcomes_compatible(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{tokens, DEFAULT_TYPE};

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn john_smith_spans() -> Vec<Span> {
        vec![Span::new(0, 2, "PERSON"), Span::new(4, 5, "LOCATION")]
    }

    #[test]
    fn test_bio_encode_example() {
        let outcomes = BioCodec.encode(&john_smith_spans(), 5, DEFAULT_TYPE).unwrap();
        assert_eq!(
            outcomes,
            labels(&["PERSON-START", "PERSON-CONTINUE", "OTHER", "OTHER", "LOCATION-START"])
        );
        assert_eq!(BioCodec.decode(&outcomes).unwrap(), john_smith_spans());
    }

    #[test]
    fn test_bilou_encode_example() {
        let outcomes = BilouCodec.encode(&john_smith_spans(), 5, DEFAULT_TYPE).unwrap();
        assert_eq!(
            outcomes,
            labels(&["PERSON-START", "PERSON-LAST", "OTHER", "OTHER", "LOCATION-UNIT"])
        );
        assert_eq!(BilouCodec.decode(&outcomes).unwrap(), john_smith_spans());
    }

    #[test]
    fn test_empty_spans_are_all_other() {
        for codec in [&BioCodec as &dyn SequenceCodec, &BilouCodec] {
            let outcomes = codec.encode(&[], 3, DEFAULT_TYPE).unwrap();
            assert_eq!(outcomes, labels(&["OTHER", "OTHER", "OTHER"]));
            assert!(codec.decode(&outcomes).unwrap().is_empty());
        }
    }

    #[test]
    fn test_adjacent_same_type_spans_stay_separate() {
        let spans = vec![Span::new(0, 2, "A"), Span::new(2, 4, "A")];
        for codec in [&BioCodec as &dyn SequenceCodec, &BilouCodec] {
            let outcomes = codec.encode(&spans, 4, DEFAULT_TYPE).unwrap();
            assert_eq!(codec.decode(&outcomes).unwrap(), spans, "{}", codec.name());
        }
    }

    #[test]
    fn test_round_trip_multi_token_and_unit() {
        let spans = vec![
            Span::new(0, 1, "ORG"),
            Span::new(1, 4, "PER"),
            Span::new(5, 6, "LOC"),
            Span::new(6, 8, "LOC"),
        ];
        for codec in [&BioCodec as &dyn SequenceCodec, &BilouCodec] {
            let outcomes = codec.encode(&spans, 9, DEFAULT_TYPE).unwrap();
            assert_eq!(outcomes.len(), 9);
            assert_eq!(codec.decode(&outcomes).unwrap(), spans, "{}", codec.name());
        }
    }

    #[test]
    fn test_untyped_span_uses_default_type() {
        let outcomes = BioCodec.encode(&[Span::untyped(1, 2)], 2, "MISC").unwrap();
        assert_eq!(outcomes, labels(&["OTHER", "MISC-START"]));
    }

    #[test]
    fn test_encode_rejects_empty_type() {
        for codec in [&BioCodec as &dyn SequenceCodec, &BilouCodec] {
            assert_eq!(
                codec.encode(&[Span::new(0, 1, "")], 1, DEFAULT_TYPE),
                Err(CodecError::EmptyLabel { start: 0, end: 1 })
            );
            assert_eq!(
                codec.encode(&[Span::untyped(1, 3)], 3, ""),
                Err(CodecError::EmptyLabel { start: 1, end: 3 })
            );
        }
    }

    #[test]
    fn test_encode_rejects_bad_spans() {
        assert_eq!(
            BioCodec.encode(&[Span::new(2, 5, "A")], 4, DEFAULT_TYPE),
            Err(CodecError::SpanOutOfBounds {
                start: 2,
                end: 5,
                length: 4
            })
        );
        assert_eq!(
            BilouCodec.encode(&[Span::new(0, 2, "A"), Span::new(1, 3, "B")], 4, DEFAULT_TYPE),
            Err(CodecError::OverlappingSpans { index: 1 })
        );
    }

    #[test]
    fn test_decode_rejects_orphan_continue() {
        let err = BioCodec
            .decode(&labels(&["OTHER", "PER-CONTINUE"]))
            .unwrap_err();
        assert!(matches!(err, CodecError::IllegalTransition { index: 1, .. }));

        let err = BioCodec
            .decode(&labels(&["ORG-START", "PER-CONTINUE"]))
            .unwrap_err();
        assert!(matches!(err, CodecError::IllegalTransition { index: 1, .. }));

        let err = BilouCodec
            .decode(&labels(&["PER-START", "OTHER"]))
            .unwrap_err();
        assert!(matches!(err, CodecError::IllegalTransition { index: 1, .. }));
    }

    #[test]
    fn test_decode_rejects_unknown_label() {
        let err = BioCodec.decode(&labels(&["B-PER"])).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidOutcome {
                index: 0,
                outcome: "B-PER".into()
            }
        );
        assert!(BioCodec.decode(&labels(&["PER-UNIT"])).is_err());
    }

    #[test]
    fn test_open_span_closes_at_end() {
        assert_eq!(
            BioCodec.decode(&labels(&["OTHER", "X-START", "X-CONTINUE"])).unwrap(),
            vec![Span::new(1, 3, "X")]
        );

        // O validador BILOU recusa um START no último token; a decodificação o fecha ali.
        let outcomes = labels(&["OTHER", "X-START"]);
        assert_eq!(BilouCodec.decode(&outcomes).unwrap(), vec![Span::new(1, 2, "X")]);
        let toks = tokens("a b");
        assert!(!BilouCodec
            .validator()
            .valid_sequence(1, &toks, &outcomes[..1], "X-START"));
    }

    #[test]
    fn test_type_with_dash() {
        let outcomes = BioCodec.encode(&[Span::new(0, 1, "B-ORG")], 1, DEFAULT_TYPE).unwrap();
        assert_eq!(outcomes, labels(&["B-ORG-START"]));
        assert_eq!(BioCodec.decode(&outcomes).unwrap(), vec![Span::new(0, 1, "B-ORG")]);
    }

    #[test]
    fn test_validators() {
        let toks = tokens("a b c");
        let bio = BioCodec.validator();
        assert!(bio.valid_sequence(0, &toks, &[], "PER-START"));
        assert!(!bio.valid_sequence(0, &toks, &[], "PER-CONTINUE"));
        assert!(!bio.valid_sequence(1, &toks, &labels(&["OTHER"]), "PER-CONTINUE"));
        assert!(!bio.valid_sequence(1, &toks, &labels(&["ORG-CONTINUE"]), "PER-CONTINUE"));
        assert!(bio.valid_sequence(1, &toks, &labels(&["PER-START"]), "PER-CONTINUE"));

        let bilou = BilouCodec.validator();
        assert!(bilou.valid_sequence(0, &toks, &[], "PER-START"));
        assert!(!bilou.valid_sequence(1, &toks, &labels(&["PER-START"]), "OTHER"));
        assert!(bilou.valid_sequence(1, &toks, &labels(&["PER-START"]), "PER-LAST"));
        assert!(!bilou.valid_sequence(2, &toks, &labels(&["OTHER", "OTHER"]), "PER-START"));
        assert!(bilou.valid_sequence(2, &toks, &labels(&["OTHER", "OTHER"]), "PER-UNIT"));
    }

    #[test]
    fn test_outcome_compatibility() {
        assert!(BioCodec.are_outcomes_compatible(&labels(&["OTHER", "A-START", "A-CONTINUE"])));
        assert!(!BioCodec.are_outcomes_compatible(&labels(&["OTHER", "A-CONTINUE"])));
        assert!(!BioCodec.are_outcomes_compatible(&labels(&["A-UNIT"])));

        assert!(BilouCodec.are_outcomes_compatible(&labels(&["OTHER", "A-UNIT", "B-START", "B-LAST"])));
        assert!(!BilouCodec.are_outcomes_compatible(&labels(&["B-START", "B-CONTINUE"])));
    }
}
