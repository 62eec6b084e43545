use std::collections::BinaryHeap;
use std::cmp::Ordering;
use serde::{Serialize, Deserialize};
use crate::analysis::token::Token;
use crate::core::types::DocId;

/// Words of context kept around the first highlighted match
pub const SNIPPET_WINDOW: usize = 8;

/// One ranked hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: f32,
    pub matched_fields: Vec<String>,
    pub snippet: Option<String>,
}

impl SearchResult {
    pub fn new(doc_id: DocId, score: f32) -> Self {
        SearchResult {
            doc_id,
            score,
            matched_fields: Vec::new(),
            snippet: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.matched_fields = fields;
        self
    }

    pub fn with_snippet(mut self, snippet: Option<String>) -> Self {
        self.snippet = snippet;
        self
    }
}

/// Search results container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchResult>,
    pub total_hits: usize,
    pub max_score: f32,
    pub took_ms: u64,
    pub from_cache: bool,
}

impl SearchResults {
    pub fn doc_ids(&self) -> Vec<DocId> {
        self.hits.iter().map(|hit| hit.doc_id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

// Heap ordering: "greater" means worse, so the heap top is the next hit to drop
struct Ranked(SearchResult);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.score
            .partial_cmp(&self.0.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.0.doc_id.cmp(&other.0.doc_id))
    }
}

/// Keeps the best `k` hits; ties go to the smaller document id
pub struct TopKCollector {
    heap: BinaryHeap<Ranked>,
    pub k: usize,
    pub total_collected: usize,
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, result: SearchResult) {
        self.total_collected += 1;
        if self.k == 0 {
            return;
        }

        self.heap.push(Ranked(result));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    /// Best hit first
    pub fn get_results(self) -> Vec<SearchResult> {
        self.heap.into_sorted_vec().into_iter().map(|ranked| ranked.0).collect()
    }
}

/// A short excerpt around the first matching word, matches wrapped in `<mark>`
pub fn build_snippet<F>(text: &str, tokens: &[Token], is_match: F) -> Option<String>
where
    F: Fn(&Token) -> bool,
{
    let first = tokens.iter().position(&is_match)?;
    let start = first.saturating_sub(SNIPPET_WINDOW / 2);
    let end = (start + SNIPPET_WINDOW).min(tokens.len());

    let words: Vec<String> = tokens[start..end]
        .iter()
        .map(|token| {
            let word = token.source(text);
            if is_match(token) {
                format!("<mark>{}</mark>", word)
            } else {
                word.to_string()
            }
        })
        .collect();

    let mut snippet = words.join(" ");
    if start > 0 {
        snippet.insert_str(0, "… ");
    }
    if end < tokens.len() {
        snippet.push_str(" …");
    }
    Some(snippet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};

    fn hit(id: &str, score: f32) -> SearchResult {
        SearchResult::new(DocId::new(id), score)
    }

    #[test]
    fn collector_keeps_best_k_in_order() {
        let mut collector = TopKCollector::new(2);
        collector.collect(hit("a", 0.5));
        collector.collect(hit("b", 2.0));
        collector.collect(hit("c", 1.0));
        collector.collect(hit("d", 0.1));

        assert_eq!(collector.total_collected, 4);
        let ids: Vec<String> = collector.get_results().into_iter().map(|h| h.doc_id.0).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn ties_break_on_document_id() {
        let mut collector = TopKCollector::new(2);
        for id in ["z", "m", "a"] {
            collector.collect(hit(id, 1.0));
        }
        let ids: Vec<String> = collector.get_results().into_iter().map(|h| h.doc_id.0).collect();
        assert_eq!(ids, vec!["a", "m"]);
    }

    #[test]
    fn snippet_marks_matches_with_context() {
        let text = "one two three four five six seven eight nine ten eleven";
        let tokens = StandardTokenizer::default().tokenize(text);
        let snippet = build_snippet(text, &tokens, |t| t.text == "seven").unwrap();
        assert_eq!(snippet, "… three four five six <mark>seven</mark> eight nine ten …");

        assert!(build_snippet(text, &tokens, |t| t.text == "zero").is_none());
    }
}
