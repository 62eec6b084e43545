use rust_stemmers::{Algorithm, Stemmer};
use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Snowball stemming repeated until the word stops changing
pub struct StemmerFilter {
    pub algorithm: Algorithm,
    stemmer: Stemmer,
}

// Snowball converges within a couple of passes on real words
const MAX_STEM_PASSES: usize = 8;

impl StemmerFilter {
    pub fn new(algorithm: Algorithm) -> Self {
        StemmerFilter {
            algorithm,
            stemmer: Stemmer::create(algorithm),
        }
    }

    pub fn english() -> Self {
        StemmerFilter::new(Algorithm::English)
    }

    /// Fixpoint of the stemmer, so stem(stem(x)) == stem(x)
    pub fn stem(&self, word: &str) -> String {
        let mut current = word.to_string();
        for _ in 0..MAX_STEM_PASSES {
            let next = self.stemmer.stem(&current).into_owned();
            if next == current || next.is_empty() {
                break;
            }
            current = next;
        }
        current
    }
}

// rust_stemmers::Stemmer is not Clone; rebuild it from the algorithm
impl Clone for StemmerFilter {
    fn clone(&self) -> Self {
        StemmerFilter::new(self.algorithm)
    }
}

impl TokenFilter for StemmerFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .map(|mut token| {
                token.text = self.stem(&token.text);
                token
            })
            .collect()
    }

    fn name(&self) -> &str {
        "stemmer"
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(StemmerFilter::new(self.algorithm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_common_suffixes() {
        let stemmer = StemmerFilter::english();
        assert_eq!(stemmer.stem("running"), "run");
        assert_eq!(stemmer.stem("cats"), "cat");
        assert_eq!(stemmer.stem("jumped"), "jump");
    }

    #[test]
    fn clones_stem_alike() {
        let stemmer = StemmerFilter::english();
        let copy = stemmer.clone();
        assert!(matches!(copy.algorithm, Algorithm::English));
        assert_eq!(copy.stem("running"), stemmer.stem("running"));
    }

    #[test]
    fn stemming_is_idempotent() {
        let stemmer = StemmerFilter::english();
        for word in ["generalizations", "organizational", "happiness", "relational", "fox", "quickly"] {
            let once = stemmer.stem(word);
            assert_eq!(stemmer.stem(&once), once, "{}", word);
        }
    }
}
