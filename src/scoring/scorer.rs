use std::collections::{BTreeSet, HashMap};
use serde::{Serialize, Deserialize};
use crate::core::config::ScoringConfig;

/// Collection-level counts needed for inverse document frequency
pub trait CollectionStatistics {
    fn total_documents(&self) -> usize;

    fn documents_containing(&self, term: &str) -> usize;
}

/// Per-document term counts, already multiplied by field boosts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermVector {
    pub frequencies: HashMap<String, f32>,
    pub fields: HashMap<String, BTreeSet<String>>, // term -> fields it occurs in
    pub length: usize,                             // Tokens indexed across all fields
}

impl TermVector {
    pub fn add(&mut self, term: &str, field: &str, boost: f32) {
        *self.frequencies.entry(term.to_string()).or_insert(0.0) += boost;
        self.fields
            .entry(term.to_string())
            .or_default()
            .insert(field.to_string());
        self.length += 1;
    }

    pub fn frequency(&self, term: &str) -> f32 {
        self.frequencies.get(term).copied().unwrap_or(0.0)
    }

    pub fn fields_for(&self, term: &str) -> impl Iterator<Item = &String> {
        self.fields.get(term).into_iter().flatten()
    }

    pub fn terms(&self) -> impl Iterator<Item = &String> {
        self.frequencies.keys()
    }
}

/// ln(N / df), with df of zero treated as one
pub fn inverse_document_frequency(total_documents: usize, documents_containing: usize) -> f32 {
    let total = total_documents.max(1) as f32;
    let containing = documents_containing.max(1) as f32;
    (total / containing).ln().max(0.0)
}

/// Term frequency in `document` times the term's inverse document frequency
pub fn calculate_tf_idf<C: CollectionStatistics + ?Sized>(
    term: &str,
    document: &TermVector,
    collection: &C,
) -> f32 {
    let tf = document.frequency(term);
    if tf == 0.0 {
        return 0.0;
    }
    tf * inverse_document_frequency(collection.total_documents(), collection.documents_containing(term))
}

/// Weighted linear blend of text relevance and link authority.
///
/// `combined = text_weight * text_score + rank_weight * document_rank
///           + tf_weight * ln(1 + term_frequency) + idf_weight * inverse_doc_freq`
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    pub config: ScoringConfig,
}

impl RelevanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        RelevanceScorer { config }
    }

    pub fn calculate_combined_score(
        &self,
        text_score: f32,
        document_rank: f32,
        term_frequency: f32,
        inverse_doc_freq: f32,
    ) -> f32 {
        self.config.text_weight * text_score
            + self.config.rank_weight * document_rank
            + self.config.tf_weight * term_frequency.max(0.0).ln_1p()
            + self.config.idf_weight * inverse_doc_freq
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        RelevanceScorer::new(ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        total: usize,
        containing: usize,
    }

    impl CollectionStatistics for Fixed {
        fn total_documents(&self) -> usize {
            self.total
        }

        fn documents_containing(&self, _term: &str) -> usize {
            self.containing
        }
    }

    fn vector(terms: &[(&str, &str)]) -> TermVector {
        let mut vector = TermVector::default();
        for (term, field) in terms {
            vector.add(term, field, 1.0);
        }
        vector
    }

    #[test]
    fn tf_idf_matches_formula() {
        let doc = vector(&[("fox", "content"), ("fox", "title"), ("quick", "content")]);
        let score = calculate_tf_idf("fox", &doc, &Fixed { total: 10, containing: 2 });
        assert!((score - 2.0 * 5.0f32.ln()).abs() < 1e-6);
        assert_eq!(doc.fields_for("fox").count(), 2);
        assert_eq!(doc.length, 3);
    }

    #[test]
    fn zero_document_frequency_is_guarded() {
        let doc = vector(&[("fox", "content")]);
        let score = calculate_tf_idf("fox", &doc, &Fixed { total: 4, containing: 0 });
        assert!((score - 4.0f32.ln()).abs() < 1e-6);
        assert!(score.is_finite());
        assert_eq!(calculate_tf_idf("absent", &doc, &Fixed { total: 4, containing: 0 }), 0.0);
    }

    #[test]
    fn combined_score_weights_text_over_rank() {
        let scorer = RelevanceScorer::default();
        let text_heavy = scorer.calculate_combined_score(1.0, 0.0, 0.0, 0.0);
        let rank_heavy = scorer.calculate_combined_score(0.0, 1.0, 0.0, 0.0);
        assert!(text_heavy > rank_heavy);
        assert!((text_heavy - 0.7).abs() < 1e-6);
    }
}
