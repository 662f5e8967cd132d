//! Validação cruzada k-fold de um rotulador de sequências.
//!
//! ```text
//! ner-cv --train corpus.jsonl --config cv.json --folds 5 --parallel
//! ```
//!
//! O nível de log segue `RUST_LOG` (padrão `info`).

mod config;
mod stream;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ner_seq::{
    CrossValidationReport, CrossValidator, DetailedFMeasureListener, ErrorListener,
    EvaluationMonitor, PerceptronTrainer, SampleStream, SampleTypeFilter, SequenceLabelerFactory,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{CrossValidationConfig, EvaluationType};
use crate::stream::JsonLinesSampleStream;

#[derive(Parser)]
#[command(name = "ner-cv")]
#[command(about = "Validação cruzada k-fold de rotuladores de sequências")]
#[command(version)]
struct Cli {
    /// Arquivo JSON lines com as amostras anotadas
    #[arg(short, long)]
    train: PathBuf,

    /// Configuração JSON (folds, tipos, parâmetros de treino, features)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sobrescreve o número de folds da configuração
    #[arg(short, long)]
    folds: Option<usize>,

    /// Roda os folds em paralelo
    #[arg(long)]
    parallel: bool,

    /// Imprime o relatório em JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => CrossValidationConfig::load(path)?,
        None => CrossValidationConfig::default(),
    };
    if let Some(folds) = cli.folds {
        config.folds = folds;
    }
    config.parallel |= cli.parallel;

    let factory = SequenceLabelerFactory::new(config.features.clone(), config.resources()?)
        .context("descritor de features inválido")?;
    let mut validator = CrossValidator::new(
        factory,
        Arc::new(PerceptronTrainer),
        config.training.clone(),
        config.folds,
    )?
    .parallel(config.parallel);

    let file = File::open(&cli.train)
        .with_context(|| format!("não foi possível abrir {}", cli.train.display()))?;
    let lines = JsonLinesSampleStream::new(BufReader::new(file));
    let mut samples: Box<dyn SampleStream> = if config.types.is_empty() {
        Box::new(lines)
    } else {
        Box::new(SampleTypeFilter::new(config.types.clone(), lines))
    };

    info!(
        train = %cli.train.display(),
        folds = config.folds,
        parallel = config.parallel,
        "iniciando validação cruzada"
    );

    let report = match config.evaluation {
        EvaluationType::Default => validator.evaluate(&mut samples, &mut [])?,
        EvaluationType::Error => {
            let mut errors = ErrorListener::new();
            let mut monitors: [&mut dyn EvaluationMonitor; 1] = [&mut errors];
            let report = validator.evaluate(&mut samples, &mut monitors)?;
            info!(errors = errors.errors(), "amostras com predição divergente");
            report
        }
        EvaluationType::Detailed => {
            let mut detailed = DetailedFMeasureListener::new();
            let mut monitors: [&mut dyn EvaluationMonitor; 1] = [&mut detailed];
            let report = validator.evaluate(&mut samples, &mut monitors)?;
            if !cli.json {
                println!("{detailed}");
            }
            report
        }
    };

    print_report(&report, cli.json)
}

fn print_report(report: &CrossValidationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
