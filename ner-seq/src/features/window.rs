use super::{FeatureGenerator, Sentence};

/// Aplica um gerador interno às posições vizinhas dentro de uma janela fixa.
///
/// As features do token atual saem sem prefixo; as dos vizinhos recebem
/// `p<distância>` (anteriores) ou `n<distância>` (seguintes). Com uma janela
/// de 2 sobre "works in Paris" na posição 2: `w=paris`, `p1w=in`, `p2w=works`.
///
/// Perto das bordas a janela é truncada: posições fora da sentença nunca são
/// consultadas.
pub struct WindowFeatureGenerator {
    generator: Box<dyn FeatureGenerator>,
    prev_window: usize,
    next_window: usize,
}

impl WindowFeatureGenerator {
    pub const PREV_PREFIX: &'static str = "p";
    pub const NEXT_PREFIX: &'static str = "n";

    pub fn new(generator: Box<dyn FeatureGenerator>, prev_window: usize, next_window: usize) -> Self {
        Self {
            generator,
            prev_window,
            next_window,
        }
    }
}

impl FeatureGenerator for WindowFeatureGenerator {
    fn create_features(
        &self,
        features: &mut Vec<String>,
        sentence: &Sentence<'_>,
        index: usize,
        previous_outcomes: &[String],
    ) {
        self.generator
            .create_features(features, sentence, index, previous_outcomes);

        let mut neighbour = Vec::new();
        for offset in 1..=self.prev_window {
            let Some(position) = index.checked_sub(offset) else {
                break;
            };
            neighbour.clear();
            self.generator
                .create_features(&mut neighbour, sentence, position, previous_outcomes);
            features.extend(
                neighbour
                    .iter()
                    .map(|f| format!("{}{offset}{f}", Self::PREV_PREFIX)),
            );
        }

        for offset in 1..=self.next_window {
            let position = index + offset;
            if position >= sentence.len() {
                break;
            }
            neighbour.clear();
            self.generator
                .create_features(&mut neighbour, sentence, position, previous_outcomes);
            features.extend(
                neighbour
                    .iter()
                    .map(|f| format!("{}{offset}{f}", Self::NEXT_PREFIX)),
            );
        }
    }

    fn update_adaptive_data(&mut self, tokens: &[String], outcomes: &[String]) {
        self.generator.update_adaptive_data(tokens, outcomes);
    }

    fn clear_adaptive_data(&mut self) {
        self.generator.clear_adaptive_data();
    }
}
