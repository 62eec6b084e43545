use serde::{Serialize, Deserialize};
use crate::core::config::MAX_FUZZY_DISTANCE;
use crate::core::error::{Error, Result};
use crate::search::regex::TraversalMode;

/// How query terms are matched against the term trie
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Exact,
    Prefix,
    Fuzzy,
    Regex,
}

/// Per-query options. `None` fields fall back to the engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub max_distance: Option<u8>,
    pub case_sensitive: bool,
    pub score_threshold: f32,
    pub limit: Option<usize>,
    pub traversal: TraversalMode,
    pub keep_stop_words: bool,
    pub snippets: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            mode: SearchMode::Exact,
            max_distance: None,
            case_sensitive: false,
            score_threshold: 0.0,
            limit: None,
            traversal: TraversalMode::BreadthFirst,
            keep_stop_words: false,
            snippets: true,
        }
    }
}

impl SearchOptions {
    pub fn exact() -> Self {
        SearchOptions::default()
    }

    pub fn prefix() -> Self {
        SearchOptions { mode: SearchMode::Prefix, ..SearchOptions::default() }
    }

    pub fn fuzzy(max_distance: u8) -> Self {
        SearchOptions {
            mode: SearchMode::Fuzzy,
            max_distance: Some(max_distance),
            ..SearchOptions::default()
        }
    }

    pub fn regex() -> Self {
        SearchOptions { mode: SearchMode::Regex, ..SearchOptions::default() }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_traversal(mut self, traversal: TraversalMode) -> Self {
        self.traversal = traversal;
        self
    }

    /// Keep stop words in the query, for exact-phrase lookups
    pub fn with_stop_words(mut self) -> Self {
        self.keep_stop_words = true;
        self
    }

    pub fn without_snippets(mut self) -> Self {
        self.snippets = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(distance) = self.max_distance {
            if distance > MAX_FUZZY_DISTANCE {
                return Err(Error::query_syntax(format!(
                    "max_distance {} exceeds the supported maximum of {}",
                    distance, MAX_FUZZY_DISTANCE
                )));
            }
        }

        if !self.score_threshold.is_finite() {
            return Err(Error::query_syntax("score_threshold must be finite"));
        }

        if self.limit == Some(0) {
            return Err(Error::query_syntax("limit must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn builders_set_mode() {
        assert_eq!(SearchOptions::prefix().mode, SearchMode::Prefix);
        let fuzzy = SearchOptions::fuzzy(1).with_limit(5);
        assert_eq!(fuzzy.mode, SearchMode::Fuzzy);
        assert_eq!(fuzzy.max_distance, Some(1));
        assert_eq!(fuzzy.limit, Some(5));
    }

    #[test]
    fn rejects_out_of_range_options() {
        let err = SearchOptions::fuzzy(9).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuerySyntax);
        assert!(SearchOptions::exact().with_threshold(f32::NAN).validate().is_err());
        assert!(SearchOptions::exact().with_limit(0).validate().is_err());
        assert!(SearchOptions::regex().validate().is_ok());
    }

    #[test]
    fn serializes_mode_lowercase() {
        let json = serde_json::to_string(&SearchOptions::regex()).unwrap();
        assert!(json.contains("\"mode\":\"regex\""));
    }
}
