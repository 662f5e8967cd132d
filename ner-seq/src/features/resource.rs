use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::{FeatureGenerator, Sentence};
use crate::resources::SequenceTagger;

/// Etiqueta POS do token (`posTag=NNP`) vinda de um etiquetador externo.
///
/// O etiquetador roda uma única vez por sentença; o resultado fica no cache da
/// [`Sentence`] sob a chave `pos:<recurso>` e é reaproveitado por todas as
/// posições (e por todas as hipóteses da busca em feixe).
pub struct PosTagFeatureGenerator {
    cache_key: String,
    tagger: Arc<dyn SequenceTagger>,
}

impl PosTagFeatureGenerator {
    pub fn new(resource_name: &str, tagger: Arc<dyn SequenceTagger>) -> Self {
        Self {
            cache_key: format!("pos:{resource_name}"),
            tagger,
        }
    }
}

impl FeatureGenerator for PosTagFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        let tags = sentence.annotation(&self.cache_key, |tokens| self.tagger.tag(tokens));
        match tags.get(index) {
            Some(tag) => features.push(format!("posTag={tag}")),
            None => warn!(
                key = %self.cache_key,
                expected = sentence.len(),
                got = tags.len(),
                "etiquetador devolveu menos etiquetas que tokens"
            ),
        }
    }
}

/// Classe da palavra em um léxico externo (ex: clusters de Brown):
/// `<prefixo>=<classe>`. Palavras fora do léxico não geram feature.
pub struct ClusterFeatureGenerator {
    prefix: String,
    lexicon: Arc<HashMap<String, String>>,
    lowercase: bool,
}

impl ClusterFeatureGenerator {
    pub fn new(prefix: impl Into<String>, lexicon: Arc<HashMap<String, String>>, lowercase: bool) -> Self {
        Self {
            prefix: prefix.into(),
            lexicon,
            lowercase,
        }
    }
}

impl FeatureGenerator for ClusterFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        let token = &sentence.tokens()[index];
        let class = if self.lowercase {
            self.lexicon.get(&token.to_lowercase())
        } else {
            self.lexicon.get(token)
        };
        if let Some(class) = class {
            features.push(format!("{}={class}", self.prefix));
        }
    }
}
