use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Unicode normalization, optional case folding and diacritic stripping
#[derive(Clone)]
pub struct NormalizeFilter {
    pub lowercase: bool,
    pub strip_diacritics: bool,
}

impl NormalizeFilter {
    pub fn new(lowercase: bool, strip_diacritics: bool) -> Self {
        NormalizeFilter { lowercase, strip_diacritics }
    }

    pub fn normalize(&self, text: &str) -> String {
        let composed: String = if self.strip_diacritics {
            // Decompose, drop combining marks, recompose what is left
            text.nfkd().filter(|c| !is_combining_mark(*c)).nfc().collect()
        } else {
            text.nfkc().collect()
        };

        if self.lowercase {
            composed.to_lowercase()
        } else {
            composed
        }
    }
}

impl TokenFilter for NormalizeFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .map(|mut token| {
                token.text = self.normalize(&token.text);
                token
            })
            .filter(|token| !token.text.is_empty())
            .collect()
    }

    fn name(&self) -> &str {
        "normalize"
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(self.clone())
    }
}
