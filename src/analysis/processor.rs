use crate::analysis::analyzer::Analyzer;
use crate::analysis::filters::normalize::NormalizeFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};
use crate::core::config::AnalysisConfig;

/// Turns raw text into the terms stored in and looked up from the index.
///
/// Indexing and querying share one pipeline so both sides agree on the
/// normalized vocabulary.
#[derive(Clone)]
pub struct QueryProcessor {
    pub config: AnalysisConfig,
    full: Analyzer,
    literal: Analyzer,
    tokenizer: StandardTokenizer,
    normalizer: NormalizeFilter,
    stop_words: StopWordFilter,
    stemmer: StemmerFilter,
}

impl QueryProcessor {
    pub fn new(config: AnalysisConfig) -> Self {
        QueryProcessor {
            full: Analyzer::from_config(&config),
            literal: Analyzer::literal(&config),
            tokenizer: StandardTokenizer::new(config.min_token_length, config.max_token_length),
            normalizer: NormalizeFilter::new(!config.case_sensitive, config.strip_diacritics),
            stop_words: StopWordFilter::english(),
            stemmer: StemmerFilter::english(),
            config,
        }
    }

    /// Raw word tokens; case is folded unless the pipeline is case-sensitive
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(text)
            .into_iter()
            .map(|token| {
                if self.config.case_sensitive {
                    token.text
                } else {
                    token.text.to_lowercase()
                }
            })
            .collect()
    }

    pub fn normalize_token(&self, token: &str) -> String {
        self.normalizer.normalize(token)
    }

    pub fn remove_stop_words(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter()
            .filter(|token| !self.stop_words.is_stop_word(token))
            .collect()
    }

    pub fn stem_word(&self, word: &str) -> String {
        self.stemmer.stem(word)
    }

    /// tokenize -> normalize -> stop words -> stem, as configured
    pub fn process(&self, query: &str) -> Vec<String> {
        self.process_with(query, self.config.remove_stop_words)
    }

    /// Same as `process` but lets exact-phrase callers keep stop words
    pub fn process_with(&self, query: &str, remove_stop_words: bool) -> Vec<String> {
        let normalized: Vec<String> = self.tokenize(query)
            .iter()
            .map(|token| self.normalize_token(token))
            .filter(|token| !token.is_empty())
            .collect();

        let kept = if remove_stop_words {
            self.remove_stop_words(normalized)
        } else {
            normalized
        };

        if self.config.stem {
            kept.iter().map(|token| self.stem_word(token)).collect()
        } else {
            kept
        }
    }

    /// Tokens normalized but neither stemmed nor stop-word filtered
    pub fn process_literal(&self, query: &str) -> Vec<String> {
        self.literal.analyze(query).into_iter().map(|t| t.text).collect()
    }

    /// Positioned tokens for indexing a field
    pub fn analyze_field(&self, text: &str) -> Vec<Token> {
        self.full.analyze(text)
    }

    /// Positioned literal tokens, used for snippets
    pub fn analyze_literal(&self, text: &str) -> Vec<Token> {
        self.literal.analyze(text)
    }

    /// Word tokens exactly as written, case and diacritics kept
    pub fn raw_words(&self, text: &str) -> Vec<Token> {
        self.tokenizer.tokenize(text)
    }

    /// Index form of an already normalized word
    pub fn index_term(&self, normalized: &str) -> String {
        if self.config.stem {
            self.stem_word(normalized)
        } else {
            normalized.to_string()
        }
    }
}

impl Default for QueryProcessor {
    fn default() -> Self {
        QueryProcessor::new(AnalysisConfig::default())
    }
}
