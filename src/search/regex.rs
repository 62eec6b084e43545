use regex::{Regex, RegexBuilder};
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};

// Keeps pathological patterns from compiling into huge automata
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Order in which the trie is walked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    /// Shortest words first
    #[default]
    BreadthFirst,
    /// Lexicographic order
    DepthFirst,
}

/// Compile a pattern that must match an entire indexed word
pub fn compile_word_pattern(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    if pattern.trim().is_empty() {
        return Err(Error::query_syntax("Empty regex pattern"));
    }

    let anchored = format!("^(?:{})$", pattern);
    let regex = RegexBuilder::new(&anchored)
        .case_insensitive(case_insensitive)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()?;
    Ok(regex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn anchors_to_whole_word() {
        let regex = compile_word_pattern("qu.*", false).unwrap();
        assert!(regex.is_match("quick"));
        assert!(!regex.is_match("aquick"));
    }

    #[test]
    fn malformed_patterns_are_syntax_errors() {
        for pattern in ["(qu", "[a-", "", "   "] {
            let err = compile_word_pattern(pattern, false).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::QuerySyntax, "{:?}", pattern);
        }
    }

    #[test]
    fn case_folding_is_optional() {
        assert!(compile_word_pattern("FOX", true).unwrap().is_match("fox"));
        assert!(!compile_word_pattern("FOX", false).unwrap().is_match("fox"));
    }
}
