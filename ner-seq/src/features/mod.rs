//! # Geradores de Features
//!
//! Cada gerador é uma unidade independente que, para uma posição da sentença,
//! acrescenta strings de features (ex: `w=paris`, `wc=ic`, `p1w=in`) a uma lista.
//! O [`crate::context::ContextGenerator`] compõe vários geradores em um
//! contexto completo por token.
//!
//! ## Geradores Disponíveis
//!
//! | Gerador                          | Exemplo de feature     |
//! |----------------------------------|------------------------|
//! | [`TokenFeatureGenerator`]        | `w=paris`              |
//! | [`TokenClassFeatureGenerator`]   | `wc=ic`, `w&c=paris,ic`|
//! | [`PrefixFeatureGenerator`]       | `pre=par`              |
//! | [`SuffixFeatureGenerator`]       | `suf=ris`              |
//! | [`SentenceFeatureGenerator`]     | `S=begin`              |
//! | [`OutcomePriorFeatureGenerator`] | `def`                  |
//! | [`BigramClassFeatureGenerator`]  | `pw,w=in,Paris`        |
//! | [`WindowFeatureGenerator`]       | `p1w=in`, `n2wc=lc`    |
//! | [`PreviousMapFeatureGenerator`]  | `pd=LOCATION-UNIT`     |
//! | [`AdditionalContextFeatureGenerator`] | `ne=pd=PER-START` |
//! | [`PosTagFeatureGenerator`]       | `posTag=NNP`           |
//! | [`ClusterFeatureGenerator`]      | `brown=0110`           |
//!
//! ## Estado Adaptativo
//!
//! Alguns geradores lembram decisões de sentenças anteriores (ex: o último
//! rótulo atribuído a "Paris"). Esse estado é atualizado por
//! [`FeatureGenerator::update_adaptive_data`] ao fim de cada sentença e
//! zerado por [`FeatureGenerator::clear_adaptive_data`].
//!
//! ## Cache por Sentença
//!
//! Anotações caras (ex: etiquetas POS de um modelo externo) são guardadas na
//! [`Sentence`], que vive apenas durante o processamento de uma sentença. Não
//! há campo mutável de "sentença corrente" dentro dos geradores.

mod adaptive;
mod bigram;
mod lexical;
mod resource;
mod window;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

pub use adaptive::{AdditionalContextFeatureGenerator, PreviousMapFeatureGenerator};
pub use bigram::BigramClassFeatureGenerator;
pub use lexical::{
    OutcomePriorFeatureGenerator, PrefixFeatureGenerator, SentenceFeatureGenerator,
    SuffixFeatureGenerator, TokenClassFeatureGenerator, TokenFeatureGenerator,
};
pub use resource::{ClusterFeatureGenerator, PosTagFeatureGenerator};
pub use window::WindowFeatureGenerator;

/// Unidade composável de extração de features.
///
/// `create_features` recebe a sentença inteira e a posição atual; os rótulos
/// já atribuídos às posições anteriores ficam em `previous_outcomes` (durante o
/// treino é a sequência ouro completa, durante a predição a sequência parcial
/// do feixe).
pub trait FeatureGenerator: Send {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        previous_outcomes: &[String],
    );

    /// Registra as decisões de uma sentença completa (geradores adaptativos).
    fn update_adaptive_data(&mut self, _tokens: &[String], _outcomes: &[String]) {}

    /// Esquece todo o estado acumulado entre sentenças.
    fn clear_adaptive_data(&mut self) {}
}

/// Visão de uma sentença durante a extração de features.
///
/// Carrega os tokens, o contexto adicional vindo da amostra e um cache de
/// anotações cujo tempo de vida é exatamente o da sentença.
pub struct Sentence<'a> {
    tokens: &'a [String],
    additional_context: Option<&'a [Vec<String>]>,
    annotations: RefCell<HashMap<String, Rc<[String]>>>,
}

impl<'a> Sentence<'a> {
    pub fn new(tokens: &'a [String]) -> Self {
        Self {
            tokens,
            additional_context: None,
            annotations: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_additional_context(mut self, context: Option<&'a [Vec<String>]>) -> Self {
        self.additional_context = context;
        self
    }

    pub fn tokens(&self) -> &'a [String] {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Contexto adicional do token `index` (vazio quando a amostra não tem).
    pub fn additional_context(&self, index: usize) -> &'a [String] {
        self.additional_context
            .and_then(|context| context.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Anotação da sentença inteira sob `key`, computada na primeira consulta
    /// e reaproveitada para todas as posições seguintes.
    pub fn annotation(
        &self,
        key: &str,
        compute: impl FnOnce(&[String]) -> Vec<String>,
    ) -> Rc<[String]> {
        if let Some(cached) = self.annotations.borrow().get(key) {
            return Rc::clone(cached);
        }
        let computed: Rc<[String]> = compute(self.tokens).into();
        self.annotations
            .borrow_mut()
            .insert(key.to_string(), Rc::clone(&computed));
        computed
    }
}

static TWO_DIGITS: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d\d$"));
static FOUR_DIGITS: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d\d\d\d$"));
static HAS_DIGIT: LazyLock<Regex> = LazyLock::new(|| compile(r"\d"));
static HAS_LETTER: LazyLock<Regex> = LazyLock::new(|| compile(r"\p{L}"));
static LOWERCASE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\p{Ll}+$"));
static ALL_CAPS: LazyLock<Regex> = LazyLock::new(|| compile(r"^\p{Lu}+$"));
static CAP_PERIOD: LazyLock<Regex> = LazyLock::new(|| compile(r"^\p{Lu}\.$"));
static INITIAL_CAP: LazyLock<Regex> = LazyLock::new(|| compile(r"^\p{Lu}"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("padrão estático de forma de token")
}

/// Classe de forma do token, função pura do texto.
///
/// | Classe  | Significado                    | Exemplo   |
/// |---------|--------------------------------|-----------|
/// | `lc`    | só minúsculas                  | `works`   |
/// | `2d`    | dois dígitos                   | `23`      |
/// | `4d`    | quatro dígitos                 | `2014`    |
/// | `an`    | letras e dígitos               | `A4`      |
/// | `dd`    | dígitos e hífen                | `12-10`   |
/// | `ds`    | dígitos e barra                | `1/2`     |
/// | `dc`    | dígitos e vírgula              | `1,000`   |
/// | `dp`    | dígitos e ponto                | `3.14`    |
/// | `num`   | outros números                 | `123`     |
/// | `sc`    | maiúscula única                | `A`       |
/// | `ac`    | só maiúsculas                  | `NATO`    |
/// | `cp`    | maiúscula seguida de ponto     | `J.`      |
/// | `ic`    | inicial maiúscula              | `Paris`   |
/// | `other` | demais (pontuação etc.)        | `,`       |
pub fn token_shape(token: &str) -> &'static str {
    if LOWERCASE.is_match(token) {
        "lc"
    } else if TWO_DIGITS.is_match(token) {
        "2d"
    } else if FOUR_DIGITS.is_match(token) {
        "4d"
    } else if HAS_DIGIT.is_match(token) {
        if HAS_LETTER.is_match(token) {
            "an"
        } else if token.contains('-') {
            "dd"
        } else if token.contains('/') {
            "ds"
        } else if token.contains(',') {
            "dc"
        } else if token.contains('.') {
            "dp"
        } else {
            "num"
        }
    } else if ALL_CAPS.is_match(token) {
        if token.chars().count() == 1 {
            "sc"
        } else {
            "ac"
        }
    } else if CAP_PERIOD.is_match(token) {
        "cp"
    } else if INITIAL_CAP.is_match(token) {
        "ic"
    } else {
        "other"
    }
}
