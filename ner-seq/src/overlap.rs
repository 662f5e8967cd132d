//! # Resolução de Conflitos entre Spans
//!
//! Quando spans de fontes diferentes (ex: o rotulador estatístico e um
//! dicionário) são combinados, alguns podem se sobrepor. A política de
//! precedência é plugável via [`SpanConflictResolver`]. O resultado sempre
//! respeita a invariante dos codecs: nenhum par de spans se sobrepõe.

use std::cmp::Reverse;

use crate::sample::Span;

/// Combina spans primários (ex: estatísticos) com secundários (ex: dicionário).
pub trait SpanConflictResolver: Send + Sync {
    fn resolve(&self, primary: &[Span], secondary: &[Span]) -> Vec<Span>;
}

/// Mantém todos os spans primários e acrescenta apenas os secundários que não
/// tocam nenhum deles.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferPrimary;

impl SpanConflictResolver for PreferPrimary {
    fn resolve(&self, primary: &[Span], secondary: &[Span]) -> Vec<Span> {
        let mut merged = drop_overlapping_spans(primary.to_vec());
        merged.extend(
            secondary
                .iter()
                .filter(|s| !primary.iter().any(|p| p.intersects(s)))
                .cloned(),
        );
        drop_overlapping_spans(merged)
    }
}

/// Em cada conflito vence o span mais longo; em empate, o que começa antes
/// e depois o primário.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferLongest;

impl SpanConflictResolver for PreferLongest {
    fn resolve(&self, primary: &[Span], secondary: &[Span]) -> Vec<Span> {
        let mut candidates: Vec<&Span> = primary.iter().chain(secondary).collect();
        // sort estável: empates preservam primários antes de secundários
        candidates.sort_by_key(|s| (Reverse(s.len()), s.start));

        let mut kept: Vec<Span> = Vec::new();
        for span in candidates {
            if !kept.iter().any(|k| k.intersects(span)) {
                kept.push(span.clone());
            }
        }
        kept.sort_by_key(|s| s.start);
        kept
    }
}

/// Ordena por início (e, no mesmo início, o mais longo primeiro) e descarta
/// todo span que intersecta o último mantido.
pub fn drop_overlapping_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by_key(|s| (s.start, Reverse(s.end)));
    let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().is_some_and(|last| last.intersects(&span)) {
            continue;
        }
        kept.push(span);
    }
    kept
}
