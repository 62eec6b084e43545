use crate::analysis::token::Token;
use unicode_segmentation::UnicodeSegmentation;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;

    fn clone_box(&self) -> Box<dyn Tokenizer>;
}

/// Splits on Unicode word boundaries and drops punctuation inside words
#[derive(Clone)]
pub struct StandardTokenizer {
    pub min_token_length: usize,
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            min_token_length: 1,
            max_token_length: 255,
        }
    }
}

impl StandardTokenizer {
    pub fn new(min_token_length: usize, max_token_length: usize) -> Self {
        StandardTokenizer { min_token_length, max_token_length }
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for (offset, word) in text.unicode_word_indices() {
            // "don't" -> "dont", "U.S" -> "US"
            let stripped: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            let char_count = stripped.chars().count();

            if char_count >= self.min_token_length && char_count <= self.max_token_length {
                tokens.push(Token::new(stripped, position, offset, word.len()));
                position += 1;
            }
        }

        tokens
    }

    fn name(&self) -> &str {
        "standard"
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}
