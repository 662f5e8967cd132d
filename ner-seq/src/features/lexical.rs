//! Geradores léxicos: olham apenas para o token da posição atual (ou para a
//! posição na sentença). Nenhum deles guarda estado adaptativo.

use super::{token_shape, FeatureGenerator, Sentence};

/// Forma da palavra: `w=<token>`, opcionalmente em minúsculas.
#[derive(Debug, Clone)]
pub struct TokenFeatureGenerator {
    lowercase: bool,
}

impl TokenFeatureGenerator {
    pub fn new(lowercase: bool) -> Self {
        Self { lowercase }
    }
}

impl Default for TokenFeatureGenerator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FeatureGenerator for TokenFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        let token = &sentence.tokens()[index];
        if self.lowercase {
            features.push(format!("w={}", token.to_lowercase()));
        } else {
            features.push(format!("w={token}"));
        }
    }
}

/// Classe de forma do token (`wc=ic`) e, se pedido, a combinação palavra+classe.
#[derive(Debug, Clone, Default)]
pub struct TokenClassFeatureGenerator {
    word_and_class: bool,
}

impl TokenClassFeatureGenerator {
    pub fn new(word_and_class: bool) -> Self {
        Self { word_and_class }
    }
}

impl FeatureGenerator for TokenClassFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        let token = &sentence.tokens()[index];
        let shape = token_shape(token);
        features.push(format!("wc={shape}"));
        if self.word_and_class {
            features.push(format!("w&c={},{shape}", token.to_lowercase()));
        }
    }
}

/// Prefixos de 1 até `length` caracteres (`pre=p`, `pre=pa`, ...).
#[derive(Debug, Clone)]
pub struct PrefixFeatureGenerator {
    length: usize,
}

impl PrefixFeatureGenerator {
    pub const DEFAULT_LENGTH: usize = 4;

    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl FeatureGenerator for PrefixFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        let chars: Vec<char> = sentence.tokens()[index].chars().collect();
        for n in 1..=self.length.min(chars.len()) {
            let prefix: String = chars[..n].iter().collect();
            features.push(format!("pre={prefix}"));
        }
    }
}

/// Sufixos de 1 até `length` caracteres (`suf=s`, `suf=is`, ...).
#[derive(Debug, Clone)]
pub struct SuffixFeatureGenerator {
    length: usize,
}

impl SuffixFeatureGenerator {
    pub const DEFAULT_LENGTH: usize = 4;

    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl FeatureGenerator for SuffixFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        let chars: Vec<char> = sentence.tokens()[index].chars().collect();
        for n in 1..=self.length.min(chars.len()) {
            let suffix: String = chars[chars.len() - n..].iter().collect();
            features.push(format!("suf={suffix}"));
        }
    }
}

/// Marca o início (`S=begin`) e/ou o fim (`S=end`) da sentença.
#[derive(Debug, Clone)]
pub struct SentenceFeatureGenerator {
    begin: bool,
    end: bool,
}

impl SentenceFeatureGenerator {
    pub fn new(begin: bool, end: bool) -> Self {
        Self { begin, end }
    }
}

impl FeatureGenerator for SentenceFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        if self.begin && index == 0 {
            features.push("S=begin".to_string());
        }
        if self.end && index + 1 == sentence.len() {
            features.push("S=end".to_string());
        }
    }
}

/// Feature constante `def`, que permite ao modelo aprender a distribuição
/// a priori dos rótulos.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomePriorFeatureGenerator;

impl FeatureGenerator for OutcomePriorFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        _sentence: &Sentence<'_>,
        _index: usize,
        _previous_outcomes: &[String],
    ) {
        features.push("def".to_string());
    }
}
