//! # Avaliação
//!
//! Métricas de extração de entidades por span exato: um span previsto só conta
//! como acerto se início, fim e tipo batem com um span de referência.
//!
//! - [`FMeasure`]: contadores de selecionados/alvo/acertos e as métricas
//!   derivadas. Divisões por zero valem 0.0.
//! - [`SequenceLabelerEvaluator`]: roda um [`SequenceLabeler`] sobre amostras
//!   de referência e acumula um [`FMeasure`].
//! - [`EvaluationMonitor`]: observadores chamados uma vez por amostra avaliada
//!   ([`DetailedFMeasureListener`], [`ErrorListener`]).

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::labeler::SequenceLabeler;
use crate::sample::{Sample, Span, DEFAULT_TYPE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FMeasure {
    /// Spans previstos.
    pub selected: usize,
    /// Spans de referência.
    pub target: usize,
    /// Spans previstos que existem na referência.
    pub true_positives: usize,
}

impl FMeasure {
    pub fn update_scores(&mut self, references: &[Span], predictions: &[Span]) {
        let gold: HashSet<(usize, usize, &str)> = references.iter().map(span_key).collect();
        self.true_positives += predictions
            .iter()
            .filter(|span| gold.contains(&span_key(span)))
            .count();
        self.selected += predictions.len();
        self.target += references.len();
    }

    pub fn merge(&mut self, other: &FMeasure) {
        self.selected += other.selected;
        self.target += other.target;
        self.true_positives += other.true_positives;
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.selected)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.target)
    }

    /// Média harmônica de precisão e cobertura.
    pub fn f_measure(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }
}

impl fmt::Display for FMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Precisão: {:.4}", self.precision())?;
        writeln!(f, "Cobertura: {:.4}", self.recall())?;
        write!(f, "F-Measure: {:.4}", self.f_measure())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn span_key(span: &Span) -> (usize, usize, &str) {
    (span.start, span.end, span.label_or(DEFAULT_TYPE))
}

/// Observador de avaliação, chamado uma vez por amostra avaliada.
pub trait EvaluationMonitor {
    fn evaluated(&mut self, reference: &Sample, predicted: &[Span]);
}

/// Avalia um rotulador contra amostras de referência.
///
/// Respeita a marca de "limpar estado adaptativo" de cada amostra e usa o
/// contexto adicional dela na predição, exatamente como no treino.
pub struct SequenceLabelerEvaluator<'m> {
    labeler: SequenceLabeler,
    monitors: Vec<&'m mut dyn EvaluationMonitor>,
    fmeasure: FMeasure,
}

impl<'m> SequenceLabelerEvaluator<'m> {
    pub fn new(labeler: SequenceLabeler) -> Self {
        Self {
            labeler,
            monitors: Vec::new(),
            fmeasure: FMeasure::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: &'m mut dyn EvaluationMonitor) -> Self {
        self.monitors.push(monitor);
        self
    }

    /// Avalia uma amostra e devolve os spans previstos.
    pub fn evaluate_sample(&mut self, reference: &Sample) -> Result<Vec<Span>> {
        if reference.clear_adaptive_data() {
            self.labeler.clear_adaptive_data();
        }
        let predicted = self
            .labeler
            .find(reference.tokens(), reference.additional_context())?;
        self.fmeasure.update_scores(reference.spans(), &predicted);
        for monitor in self.monitors.iter_mut() {
            monitor.evaluated(reference, &predicted);
        }
        Ok(predicted)
    }

    pub fn evaluate<'s>(&mut self, samples: impl IntoIterator<Item = &'s Sample>) -> Result<()> {
        for sample in samples {
            self.evaluate_sample(sample)?;
        }
        Ok(())
    }

    pub fn fmeasure(&self) -> &FMeasure {
        &self.fmeasure
    }
}

/// Quebra o F-measure por tipo de entidade.
#[derive(Debug, Clone, Default)]
pub struct DetailedFMeasureListener {
    per_type: BTreeMap<String, FMeasure>,
    total: FMeasure,
}

impl DetailedFMeasureListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn per_type(&self) -> &BTreeMap<String, FMeasure> {
        &self.per_type
    }

    pub fn total(&self) -> &FMeasure {
        &self.total
    }
}

impl EvaluationMonitor for DetailedFMeasureListener {
    fn evaluated(&mut self, reference: &Sample, predicted: &[Span]) {
        let types: BTreeSet<&str> = reference
            .spans()
            .iter()
            .chain(predicted)
            .map(|span| span.label_or(DEFAULT_TYPE))
            .collect();
        for label in types {
            let of_type = |spans: &[Span]| -> Vec<Span> {
                spans
                    .iter()
                    .filter(|span| span.label_or(DEFAULT_TYPE) == label)
                    .cloned()
                    .collect()
            };
            self.per_type
                .entry(label.to_string())
                .or_default()
                .update_scores(&of_type(reference.spans()), &of_type(predicted));
        }
        self.total.update_scores(reference.spans(), predicted);
    }
}

impl fmt::Display for DetailedFMeasureListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .per_type
            .keys()
            .map(|label| label.chars().count())
            .max()
            .unwrap_or(0)
            .max("TOTAL".len());
        writeln!(
            f,
            "{:<width$} | {:>9} | {:>9} | {:>9} | {:>6} | {:>6}",
            "Tipo", "Precisão", "Cobertura", "F1", "Prev.", "Ref."
        )?;
        let rows = self
            .per_type
            .iter()
            .map(|(label, fm)| (label.as_str(), fm))
            .chain(std::iter::once(("TOTAL", &self.total)));
        for (label, fm) in rows {
            writeln!(
                f,
                "{label:<width$} | {:>9.4} | {:>9.4} | {:>9.4} | {:>6} | {:>6}",
                fm.precision(),
                fm.recall(),
                fm.f_measure(),
                fm.selected,
                fm.target
            )?;
        }
        Ok(())
    }
}

/// Registra (via `tracing`) cada amostra com erro de predição.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorListener {
    errors: usize,
}

impl ErrorListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amostras em que a predição diferiu da referência.
    pub fn errors(&self) -> usize {
        self.errors
    }
}

impl EvaluationMonitor for ErrorListener {
    fn evaluated(&mut self, reference: &Sample, predicted: &[Span]) {
        let gold: HashSet<_> = reference.spans().iter().map(span_key).collect();
        let found: HashSet<_> = predicted.iter().map(span_key).collect();
        if gold == found {
            return;
        }
        self.errors += 1;
        let render = |keys: Vec<&(usize, usize, &str)>| -> String {
            keys.iter()
                .map(|(start, end, label)| {
                    format!("{label}[{}]", reference.tokens()[*start..*end].join(" "))
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        warn!(
            sentence = %reference.tokens().join(" "),
            missed = %render(gold.difference(&found).collect()),
            spurious = %render(found.difference(&gold).collect()),
            "predição divergente"
        );
    }
}
