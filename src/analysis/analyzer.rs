use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::normalize::NormalizeFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};
use crate::core::config::AnalysisConfig;

/// Text analysis pipeline
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Full indexing pipeline: tokenize -> normalize -> stop words -> stem
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let mut analyzer = Self::literal(config);
        analyzer.name = "indexing".to_string();

        if config.remove_stop_words {
            analyzer = analyzer.add_filter(Box::new(StopWordFilter::english()));
        }
        if config.stem {
            analyzer = analyzer.add_filter(Box::new(StemmerFilter::english()));
        }
        analyzer
    }

    /// Tokenize and normalize only; partial words survive untouched
    pub fn literal(config: &AnalysisConfig) -> Self {
        Analyzer::new(
            "literal".to_string(),
            Box::new(StandardTokenizer::new(config.min_token_length, config.max_token_length)),
        )
        .add_filter(Box::new(NormalizeFilter::new(!config.case_sensitive, config.strip_diacritics)))
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

impl Clone for Analyzer {
    fn clone(&self) -> Self {
        Analyzer {
            tokenizer: self.tokenizer.clone_box(),
            filters: self.filters.iter().map(|f| f.clone_box()).collect(),
            name: self.name.clone(),
        }
    }
}
