//! Configuração da validação cruzada, lida de um arquivo JSON.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use ner_seq::{FeatureDescriptor, Resource, Resources, TrainingParameters};
use serde::{Deserialize, Serialize};

/// Que observadores acompanham a avaliação.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationType {
    /// Apenas o F-measure agregado.
    #[default]
    Default,
    /// Registra cada amostra com predição divergente.
    Error,
    /// Tabela de F-measure por tipo de entidade.
    Detailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationConfig {
    #[serde(default = "default_folds")]
    pub folds: usize,
    /// Tipos de entidade mantidos; vazio mantém todos.
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub evaluation: EvaluationType,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub training: TrainingParameters,
    #[serde(default)]
    pub features: FeatureDescriptor,
    /// Léxicos nome → arquivo `palavra<TAB>classe`, expostos aos geradores.
    #[serde(default)]
    pub lexicons: BTreeMap<String, PathBuf>,
}

fn default_folds() -> usize {
    10
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            folds: default_folds(),
            types: Vec::new(),
            evaluation: EvaluationType::default(),
            parallel: false,
            training: TrainingParameters::default(),
            features: FeatureDescriptor::default(),
            lexicons: BTreeMap::new(),
        }
    }
}

impl CrossValidationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("não foi possível abrir {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("configuração inválida em {}", path.display()))
    }

    /// Carrega os léxicos declarados como recursos nomeados.
    pub fn resources(&self) -> Result<Resources> {
        let mut resources = Resources::new();
        for (name, path) in &self.lexicons {
            let file = File::open(path)
                .with_context(|| format!("léxico {name:?}: não foi possível abrir {}", path.display()))?;
            let lexicon = parse_lexicon(BufReader::new(file))
                .with_context(|| format!("léxico {name:?} em {}", path.display()))?;
            resources.insert(name.clone(), Resource::Lexicon(Arc::new(lexicon)));
        }
        Ok(resources)
    }
}

/// Lê linhas `palavra<TAB>classe`; linhas vazias são ignoradas.
pub fn parse_lexicon(reader: impl BufRead) -> Result<HashMap<String, String>> {
    let mut lexicon = HashMap::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some((word, class)) = line.split_once('\t') else {
            bail!("linha {}: esperado `palavra<TAB>classe`", number + 1);
        };
        lexicon.insert(word.to_string(), class.trim_end().to_string());
    }
    Ok(lexicon)
}
