//! # Validação Cruzada k-fold
//!
//! Estados de uma execução:
//!
//! ```text
//! Idle -> Partitioning -> (Training(i) -> Evaluating(i)) x k -> Aggregated -> Done
//! ```
//!
//! - **Partitioning**: lê o stream inteiro (fechando-o sempre) e atribui a
//!   amostra `i` ao fold `i mod k`, preservando a ordem relativa dentro de cada
//!   fold.
//! - **Training(i)**: treina um rotulador novo, com gerador de contexto próprio
//!   vindo da fábrica, sobre todos os folds exceto `i`.
//! - **Evaluating(i)**: roda o rotulador sobre o fold `i`, na ordem, e notifica
//!   os observadores uma vez por amostra.
//! - **Aggregated**: soma os contadores de todos os folds (micro-média).
//!
//! Com `parallel(true)` os folds rodam em paralelo via `rayon`. Os resultados
//! voltam na ordem dos folds e os observadores são notificados depois, fold a
//! fold, então o agregado e a sequência de notificações não dependem da ordem
//! de término.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SeqError};
use crate::eval::{EvaluationMonitor, FMeasure, SequenceLabelerEvaluator};
use crate::factory::SequenceLabelerFactory;
use crate::labeler::SequenceLabeler;
use crate::model::{EventTrainer, TrainingParameters};
use crate::sample::{read_all, Sample, SampleStream, Span, VecSampleStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    Idle,
    Partitioning,
    Training { fold: usize },
    Evaluating { fold: usize },
    Aggregated,
    Done,
}

/// Atribuição estável de amostras a folds: amostra `i` → fold `i mod k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldPartition {
    samples: usize,
    folds: usize,
}

impl FoldPartition {
    pub fn new(samples: usize, folds: usize) -> Result<Self> {
        if folds < 2 {
            return Err(SeqError::InvalidFolds(folds));
        }
        if samples < folds {
            return Err(SeqError::NotEnoughSamples { samples, folds });
        }
        Ok(Self { samples, folds })
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    pub fn fold_of(&self, sample: usize) -> usize {
        sample % self.folds
    }

    /// Índices do fold `fold`, em ordem crescente.
    pub fn held_out(&self, fold: usize) -> Vec<usize> {
        (fold..self.samples).step_by(self.folds).collect()
    }

    /// Índices de todos os outros folds, em ordem crescente.
    pub fn training(&self, fold: usize) -> Vec<usize> {
        (0..self.samples).filter(|&i| self.fold_of(i) != fold).collect()
    }
}

/// Resultado de um fold: o F-measure e as predições na ordem do fold.
struct FoldResult {
    fmeasure: FMeasure,
    predictions: Vec<(usize, Vec<Span>)>,
}

/// F-measure de cada fold e o agregado micro-médio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossValidationReport {
    pub folds: Vec<FMeasure>,
    pub total: FMeasure,
}

impl fmt::Display for CrossValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (fold, fm) in self.folds.iter().enumerate() {
            writeln!(
                f,
                "fold {fold}: P={:.4} R={:.4} F={:.4}",
                fm.precision(),
                fm.recall(),
                fm.f_measure()
            )?;
        }
        write!(f, "{}", self.total)
    }
}

pub struct CrossValidator {
    factory: SequenceLabelerFactory,
    trainer: Arc<dyn EventTrainer>,
    params: TrainingParameters,
    folds: usize,
    parallel: bool,
    state: ValidationState,
}

impl CrossValidator {
    pub fn new(
        factory: SequenceLabelerFactory,
        trainer: Arc<dyn EventTrainer>,
        params: TrainingParameters,
        folds: usize,
    ) -> Result<Self> {
        if folds < 2 {
            return Err(SeqError::InvalidFolds(folds));
        }
        Ok(Self {
            factory,
            trainer,
            params,
            folds,
            parallel: false,
            state: ValidationState::Idle,
        })
    }

    /// Roda os folds em paralelo.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    /// Executa a validação cruzada completa sobre o stream.
    ///
    /// O stream é fechado antes de qualquer erro de leitura subir. Um fold que
    /// falha aborta a execução inteira.
    pub fn evaluate<S: SampleStream + ?Sized>(
        &mut self,
        samples: &mut S,
        monitors: &mut [&mut dyn EvaluationMonitor],
    ) -> Result<CrossValidationReport> {
        self.state = ValidationState::Partitioning;
        let samples = read_all(samples)?;
        let partition = FoldPartition::new(samples.len(), self.folds)?;
        debug!(samples = samples.len(), folds = self.folds, "amostras particionadas");

        let results = if self.parallel {
            let results = (0..self.folds)
                .into_par_iter()
                .map(|fold| {
                    let labeler = self.train_fold(fold, &samples, &partition)?;
                    evaluate_fold(labeler, fold, &samples, &partition)
                })
                .collect::<Result<Vec<_>>>()?;
            for result in &results {
                notify(monitors, &samples, result);
            }
            results
        } else {
            let mut results = Vec::with_capacity(self.folds);
            for fold in 0..self.folds {
                self.state = ValidationState::Training { fold };
                let labeler = self.train_fold(fold, &samples, &partition)?;
                self.state = ValidationState::Evaluating { fold };
                let result = evaluate_fold(labeler, fold, &samples, &partition)?;
                notify(monitors, &samples, &result);
                results.push(result);
            }
            results
        };

        let mut total = FMeasure::default();
        for result in &results {
            total.merge(&result.fmeasure);
        }
        self.state = ValidationState::Aggregated;
        let report = CrossValidationReport {
            folds: results.into_iter().map(|r| r.fmeasure).collect(),
            total,
        };
        debug!(f_measure = report.total.f_measure(), "validação cruzada concluída");
        self.state = ValidationState::Done;
        Ok(report)
    }

    fn train_fold(
        &self,
        fold: usize,
        samples: &[Sample],
        partition: &FoldPartition,
    ) -> Result<SequenceLabeler> {
        let training: Vec<Sample> = partition
            .training(fold)
            .into_iter()
            .map(|i| samples[i].clone())
            .collect();
        debug!(fold, samples = training.len(), "treinando fold");
        SequenceLabeler::train(
            VecSampleStream::new(training),
            &self.factory,
            self.trainer.as_ref(),
            &self.params,
        )
    }
}

fn evaluate_fold(
    labeler: SequenceLabeler,
    fold: usize,
    samples: &[Sample],
    partition: &FoldPartition,
) -> Result<FoldResult> {
    let mut evaluator = SequenceLabelerEvaluator::new(labeler);
    let predictions = partition
        .held_out(fold)
        .into_iter()
        .map(|i| evaluator.evaluate_sample(&samples[i]).map(|predicted| (i, predicted)))
        .collect::<Result<Vec<_>>>()?;
    let fmeasure = *evaluator.fmeasure();
    debug!(fold, f_measure = fmeasure.f_measure(), "fold avaliado");
    Ok(FoldResult {
        fmeasure,
        predictions,
    })
}

fn notify(monitors: &mut [&mut dyn EvaluationMonitor], samples: &[Sample], result: &FoldResult) {
    for (index, predicted) in &result.predictions {
        for monitor in monitors.iter_mut() {
            monitor.evaluated(&samples[*index], predicted);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::descriptor::{FeatureDescriptor, GeneratorSpec};
    use crate::eval::DetailedFMeasureListener;
    use crate::labeler::tests::corpus;
    use crate::perceptron::PerceptronTrainer;
    use crate::resources::Resources;

    fn validator(folds: usize) -> CrossValidator {
        let descriptor = FeatureDescriptor::default().with_generators(vec![
            GeneratorSpec::window(1, 1, GeneratorSpec::new("token")),
            GeneratorSpec::new("token_class"),
            GeneratorSpec::new("previous_map"),
        ]);
        let factory = SequenceLabelerFactory::new(descriptor, Resources::new()).unwrap();
        let params = TrainingParameters {
            iterations: 10,
            ..Default::default()
        };
        CrossValidator::new(factory, Arc::new(PerceptronTrainer), params, folds).unwrap()
    }

    #[derive(Default)]
    struct SeenSamples {
        seen: HashMap<String, usize>,
    }

    impl EvaluationMonitor for SeenSamples {
        fn evaluated(&mut self, reference: &Sample, _predicted: &[Span]) {
            *self.seen.entry(reference.tokens().join(" ")).or_default() += 1;
        }
    }

    #[test]
    fn test_partition_covers_every_sample_once() {
        let partition = FoldPartition::new(10, 3).unwrap();
        let mut seen = vec![0; 10];
        for fold in 0..3 {
            let held_out = partition.held_out(fold);
            let training = partition.training(fold);
            assert_eq!(held_out.len() + training.len(), 10);
            assert!(held_out.iter().all(|i| !training.contains(i)));
            for i in held_out {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
        assert_eq!(partition.held_out(1), vec![1, 4, 7]);
    }

    #[test]
    fn test_fold_count_rules() {
        assert!(matches!(FoldPartition::new(10, 1), Err(SeqError::InvalidFolds(1))));
        assert!(matches!(
            FoldPartition::new(2, 3),
            Err(SeqError::NotEnoughSamples { samples: 2, folds: 3 })
        ));
        let factory = SequenceLabelerFactory::new(FeatureDescriptor::default(), Resources::new()).unwrap();
        assert!(CrossValidator::new(factory, Arc::new(PerceptronTrainer), TrainingParameters::default(), 0).is_err());
    }

    #[test]
    fn test_held_out_evaluations_cover_all_samples() {
        let samples = corpus();
        let mut seen = SeenSamples::default();
        let mut detailed = DetailedFMeasureListener::new();
        let mut cv = validator(3);

        let mut monitors: [&mut dyn EvaluationMonitor; 2] = [&mut seen, &mut detailed];
        let report = cv
            .evaluate(&mut VecSampleStream::new(samples.clone()), &mut monitors)
            .unwrap();

        assert_eq!(cv.state(), ValidationState::Done);
        assert_eq!(seen.seen.len(), samples.len());
        assert!(seen.seen.values().all(|&n| n == 1));
        assert_eq!(report.folds.len(), 3);
        assert_eq!(report.total.target, 2 * samples.len());
        assert_eq!(detailed.total(), &report.total);
        assert!(detailed.per_type().contains_key("LOC"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = validator(4)
            .evaluate(&mut VecSampleStream::new(corpus()), &mut [])
            .unwrap();
        let mut seen = SeenSamples::default();
        let mut monitors: [&mut dyn EvaluationMonitor; 1] = [&mut seen];
        let parallel = validator(4)
            .parallel(true)
            .evaluate(&mut VecSampleStream::new(corpus()), &mut monitors)
            .unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(seen.seen.values().sum::<usize>(), corpus().len());
    }

    struct BrokenStream {
        closed: bool,
    }

    impl SampleStream for BrokenStream {
        fn read(&mut self) -> Result<Option<Sample>> {
            Err(SeqError::Io(std::io::Error::other("arquivo truncado")))
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn test_stream_failure_closes_and_aborts() {
        let mut stream = BrokenStream { closed: false };
        let result = validator(2).evaluate(&mut stream, &mut []);
        assert!(matches!(result, Err(SeqError::Io(_))));
        assert!(stream.closed);
    }

    #[test]
    fn test_report_display() {
        let report = CrossValidationReport {
            folds: vec![FMeasure {
                selected: 2,
                target: 2,
                true_positives: 2,
            }],
            total: FMeasure {
                selected: 2,
                target: 2,
                true_positives: 2,
            },
        };
        let text = report.to_string();
        assert!(text.starts_with("fold 0: P=1.0000 R=1.0000 F=1.0000"));
        assert!(text.ends_with("F-Measure: 1.0000"));
    }
}
