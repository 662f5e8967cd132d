use tracing::trace;

use super::{token_shape, FeatureGenerator, Sentence};

/// Bigramas de palavras e de classes de forma com os vizinhos imediatos.
///
/// Para "works in Paris" na posição 1 ("in"):
/// - `pw,w=works,in` e `pwc,wc=lc,lc`
/// - `w,nw=in,Paris` e `wc,nc=lc,ic`
///
/// Nas bordas da sentença o lado inexistente simplesmente não gera nada.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigramClassFeatureGenerator;

impl FeatureGenerator for BigramClassFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        _previous_outcomes: &[String],
    ) {
        let tokens = sentence.tokens();
        let token = &tokens[index];
        let shape = token_shape(token);

        if let Some(prev) = index.checked_sub(1).map(|i| &tokens[i]) {
            features.push(format!("pw,w={prev},{token}"));
            features.push(format!("pwc,wc={},{shape}", token_shape(prev)));
            trace!(token = %token, prev = %prev, "bigramas com o token anterior");
        }
        if let Some(next) = tokens.get(index + 1) {
            features.push(format!("w,nw={token},{next}"));
            features.push(format!("wc,nc={shape},{}", token_shape(next)));
            trace!(token = %token, next = %next, "bigramas com o próximo token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::tokens;

    #[test]
    fn test_bigrams_in_the_middle() {
        let toks = tokens("works in Paris");
        let mut features = Vec::new();
        BigramClassFeatureGenerator.create_features(&mut features, &Sentence::new(&toks), 1, &[]);
        assert_eq!(
            features,
            vec!["pw,w=works,in", "pwc,wc=lc,lc", "w,nw=in,Paris", "wc,nc=lc,ic"]
        );
    }

    #[test]
    fn test_bigrams_noop_at_boundaries() {
        let toks = tokens("Paris");
        let mut features = Vec::new();
        BigramClassFeatureGenerator.create_features(&mut features, &Sentence::new(&toks), 0, &[]);
        assert!(features.is_empty());
    }
}
