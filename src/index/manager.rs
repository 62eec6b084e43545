use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;
use chrono::Utc;
use tracing::{debug, info};
use crate::analysis::processor::QueryProcessor;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::stats::IndexStats;
use crate::core::types::{DocId, Document, DocumentLink};
use crate::index::mapper::InvertedMapper;
use crate::index::snapshot::{IndexSnapshot, SNAPSHOT_FORMAT_VERSION};
use crate::index::trie::Trie;
use crate::scoring::rank::{calculate_document_ranks, DocumentRanks};
use crate::scoring::scorer::{
    calculate_tf_idf, inverse_document_frequency, CollectionStatistics, RelevanceScorer, TermVector,
};
use crate::search::options::{SearchMode, SearchOptions};
use crate::search::regex::{compile_word_pattern, TraversalMode};
use crate::search::results::{build_snippet, SearchResult, SearchResults, TopKCollector};

/// An indexed word matched by a query, with how well it matched (0..=1)
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatch {
    pub term: String,
    pub documents: BTreeSet<DocId>,
    pub quality: f32,
}

#[derive(Debug, Default)]
struct Accumulator {
    text: f32,
    tf: f32,
    idf: f32,
    terms: BTreeSet<String>,
    fields: BTreeSet<String>,
}

/// Owns the document collection and keeps trie, mapper and term vectors in step with it.
///
/// Not synchronized; the engine serializes writers around it.
pub struct IndexManager {
    config: Config,
    processor: QueryProcessor,
    scorer: RelevanceScorer,
    trie: Trie,
    mapper: InvertedMapper,
    documents: BTreeMap<DocId, Document>,
    vectors: HashMap<DocId, TermVector>,
    ranks: OnceLock<DocumentRanks>, // Emptied by writes, filled by the next reader
}

impl IndexManager {
    pub fn new(config: Config) -> Self {
        IndexManager {
            processor: QueryProcessor::new(config.analysis.clone()),
            scorer: RelevanceScorer::new(config.scoring.clone()),
            trie: Trie::new(),
            mapper: InvertedMapper::new(),
            documents: BTreeMap::new(),
            vectors: HashMap::new(),
            ranks: OnceLock::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn processor(&self) -> &QueryProcessor {
        &self.processor
    }

    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    pub fn mapper(&self) -> &InvertedMapper {
        &self.mapper
    }

    pub fn ranks(&self) -> &DocumentRanks {
        self.ranks.get_or_init(|| self.compute_ranks())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, doc_id: &DocId) -> bool {
        self.documents.contains_key(doc_id)
    }

    pub fn get_document(&self, doc_id: &DocId) -> Option<&Document> {
        self.documents.get(doc_id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn add_document(&mut self, document: Document) -> Result<()> {
        if self.documents.contains_key(&document.id) {
            return Err(Error::duplicate_document(&document.id));
        }
        check_document(&document)?;

        let id = document.id.clone();
        let vector = self.extract_terms(&document);
        self.index_terms(&id, &vector);
        debug!(doc_id = %id, terms = vector.frequencies.len(), "document indexed");

        self.vectors.insert(id.clone(), vector);
        self.documents.insert(id, document);
        self.ranks = OnceLock::new();
        Ok(())
    }

    /// Replace a document. Every old term association is retracted before the
    /// new content is indexed; the prior field set is appended to its history.
    pub fn update_document(&mut self, mut document: Document) -> Result<()> {
        if !self.documents.contains_key(&document.id) {
            return Err(Error::unknown_document(&document.id));
        }
        check_document(&document)?;
        let previous = self.documents
            .remove(&document.id)
            .ok_or_else(|| Error::unknown_document(&document.id))?;

        let id = document.id.clone();
        let retracted = self.retract(&id);

        let version = previous.to_version();
        let mut history = previous.versions;
        history.push(version);
        document.versions = history;
        document.created_at = previous.created_at;
        document.updated_at = Utc::now();

        let vector = self.extract_terms(&document);
        self.index_terms(&id, &vector);
        debug!(
            doc_id = %id,
            retracted,
            terms = vector.frequencies.len(),
            version = document.versions.len(),
            "document reindexed"
        );

        self.vectors.insert(id.clone(), vector);
        self.documents.insert(id, document);
        self.ranks = OnceLock::new();
        Ok(())
    }

    /// Returns false, without error, when the id is unknown
    pub fn remove_document(&mut self, doc_id: &DocId) -> bool {
        if self.documents.remove(doc_id).is_none() {
            debug!(doc_id = %doc_id, "remove of unknown document ignored");
            return false;
        }

        let retracted = self.retract(doc_id);
        debug!(doc_id = %doc_id, retracted, "document removed");
        self.ranks = OnceLock::new();
        true
    }

    /// Analyze every configured field, boosting term frequency per field
    fn extract_terms(&self, document: &Document) -> TermVector {
        let mut vector = TermVector::default();

        for field in &self.config.indexed_fields {
            if let Some(text) = document.indexable_text(field) {
                let boost = self.config.field_boost(field);
                for token in self.processor.analyze_field(text) {
                    vector.add(&token.text, field, boost);
                }
            }
        }

        vector
    }

    fn index_terms(&mut self, doc_id: &DocId, vector: &TermVector) {
        for term in vector.terms() {
            self.trie.insert(term, doc_id);
            self.mapper.map_data(term, doc_id);
        }
    }

    /// Mapper-guided removal from trie and mapper; returns the number of words detached
    fn retract(&mut self, doc_id: &DocId) -> usize {
        let terms = self.mapper.remove_document(doc_id);
        let removed = self.trie.remove_document(doc_id, terms.iter().map(String::as_str));
        self.vectors.remove(doc_id);
        removed
    }

    fn compute_ranks(&self) -> DocumentRanks {
        let ids: BTreeSet<DocId> = self.documents.keys().cloned().collect();
        // A document only speaks for its own outgoing edges
        let links: Vec<DocumentLink> = self.documents
            .values()
            .flat_map(|document| {
                document.relations.iter().filter(|link| link.source == document.id).cloned()
            })
            .collect();

        let ranks = calculate_document_ranks(&ids, &links, &self.config.scoring);
        if !ranks.converged {
            debug!(iterations = ranks.iterations, "document ranks stopped before converging");
        }
        ranks
    }

    /// Documents grouped by tag
    pub fn tag_clusters(&self) -> BTreeMap<String, BTreeSet<DocId>> {
        let mut clusters: BTreeMap<String, BTreeSet<DocId>> = BTreeMap::new();
        for document in self.documents.values() {
            for tag in &document.tags {
                clusters.entry(tag.clone()).or_default().insert(document.id.clone());
            }
        }
        clusters
    }

    /// The query as it is matched, used to key cached results
    pub fn normalize_query(&self, query: &str, options: &SearchOptions) -> String {
        match options.mode {
            SearchMode::Regex => query.trim().to_string(),
            _ if options.case_sensitive => {
                let words: Vec<String> = self.processor.raw_words(query).into_iter().map(|t| t.text).collect();
                words.join(" ")
            }
            _ => self.processor.process_literal(query).join(" "),
        }
    }

    /// Indexed words matched by `query` under the options' mode
    pub fn candidates(&self, query: &str, options: &SearchOptions, limit: usize) -> Result<Vec<TermMatch>> {
        let matches: Vec<TermMatch> = match options.mode {
            SearchMode::Exact => {
                let remove_stop_words = self.config.analysis.remove_stop_words && !options.keep_stop_words;
                let terms: BTreeSet<String> = self.processor.process_with(query, remove_stop_words).into_iter().collect();

                terms.into_iter()
                    .map(|term| TermMatch {
                        documents: self.trie.exact_search(&term),
                        term,
                        quality: 1.0,
                    })
                    .collect()
            }
            SearchMode::Prefix => {
                let prefixes: BTreeSet<String> = self.processor.process_literal(query).into_iter().collect();
                let mut matches = Vec::new();

                for prefix in &prefixes {
                    let prefix_len = prefix.chars().count() as f32;
                    matches.extend(self.trie.prefix_search(prefix).into_iter().map(|m| TermMatch {
                        quality: prefix_len / m.word.chars().count().max(1) as f32,
                        term: m.word,
                        documents: m.document_refs,
                    }));

                    // Stems shorter than the typed prefix ("run" for "runn"), kept
                    // only where the document really has a word starting with it
                    if self.config.analysis.stem {
                        matches.extend(self.trie.words_along(prefix).into_iter().map(|m| TermMatch {
                            documents: m.document_refs
                                .into_iter()
                                .filter(|doc_id| self.has_word_starting_with(doc_id, prefix))
                                .collect(),
                            term: m.word,
                            quality: 1.0,
                        }));
                    }
                }
                matches
            }
            SearchMode::Fuzzy => {
                let max_distance = options.max_distance.unwrap_or(self.config.fuzzy_max_distance) as usize;
                let terms: BTreeSet<String> = self.processor.process(query).into_iter().collect();

                terms.iter()
                    .flat_map(|term| {
                        self.trie.fuzzy_search(term, max_distance).into_iter().map(move |m| TermMatch {
                            quality: 1.0 - m.distance as f32 / (max_distance + 1) as f32,
                            term: m.word,
                            documents: m.document_refs,
                        })
                    })
                    .collect()
            }
            SearchMode::Regex => {
                let pattern = compile_word_pattern(query.trim(), !options.case_sensitive)?;
                self.trie
                    .regex_documents(&pattern, limit, options.traversal)
                    .into_iter()
                    .map(|m| TermMatch {
                        term: m.word,
                        documents: m.document_refs,
                        quality: 1.0,
                    })
                    .collect()
            }
        };

        Ok(merge_matches(matches))
    }

    /// Candidate lookup and scoring. Timing and caching are left to the caller.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        options.validate()?;
        let limit = options.limit.unwrap_or(self.config.max_results);
        let matches = self.candidates(query, options, limit)?;

        let total = self.total_documents();
        let mut scored: BTreeMap<DocId, Accumulator> = BTreeMap::new();
        for m in &matches {
            let idf = inverse_document_frequency(total, self.mapper.document_frequency(&m.term));
            for doc_id in &m.documents {
                let Some(vector) = self.vectors.get(doc_id) else {
                    continue;
                };
                let acc = scored.entry(doc_id.clone()).or_default();
                acc.text += m.quality * calculate_tf_idf(&m.term, vector, self);
                acc.tf += m.quality * vector.frequency(&m.term);
                acc.idf += m.quality * idf;
                acc.terms.insert(m.term.clone());
                acc.fields.extend(vector.fields_for(&m.term).cloned());
            }
        }

        // The index folds case, so a case-sensitive query re-checks the source text
        let literal_check = options.case_sensitive
            && !self.config.analysis.case_sensitive
            && matches!(options.mode, SearchMode::Exact | SearchMode::Prefix);
        if literal_check {
            let words: Vec<String> = self.processor.raw_words(query).into_iter().map(|t| t.text).collect();
            let prefix = options.mode == SearchMode::Prefix;
            scored.retain(|doc_id, _| {
                self.documents
                    .get(doc_id)
                    .is_some_and(|document| self.contains_literal(document, &words, prefix))
            });
        }

        let ranks = self.ranks();
        let mut collector = TopKCollector::new(limit);
        for (doc_id, acc) in &scored {
            let rank = ranks.normalized(doc_id);
            let weight = self.documents.get(doc_id).map(|document| document.weight).unwrap_or(1.0);
            let score = weight * self.scorer.calculate_combined_score(acc.text, rank, acc.tf, acc.idf);
            if score < options.score_threshold {
                continue;
            }
            let fields = acc.fields.iter().cloned().collect();
            collector.collect(SearchResult::new(doc_id.clone(), score).with_fields(fields));
        }

        let total_hits = collector.total_collected;
        let mut hits = collector.get_results();
        if options.snippets {
            for hit in &mut hits {
                if let Some(acc) = scored.get(&hit.doc_id) {
                    hit.snippet = self.snippet_for(&hit.doc_id, &acc.terms);
                }
            }
        }

        let max_score = hits.first().map(|hit| hit.score).unwrap_or(0.0);
        Ok(SearchResults {
            hits,
            total_hits,
            max_score,
            took_ms: 0,
            from_cache: false,
        })
    }

    fn contains_literal(&self, document: &Document, words: &[String], prefix: bool) -> bool {
        self.config.indexed_fields
            .iter()
            .filter_map(|field| document.indexable_text(field))
            .any(|text| {
                self.processor.raw_words(text).iter().any(|token| {
                    words.iter().any(|word| {
                        if prefix {
                            token.text.starts_with(word.as_str())
                        } else {
                            token.text == *word
                        }
                    })
                })
            })
    }

    /// Whether any indexed field has a normalized word beginning with `prefix`
    fn has_word_starting_with(&self, doc_id: &DocId, prefix: &str) -> bool {
        let Some(document) = self.documents.get(doc_id) else {
            return false;
        };
        self.config.indexed_fields
            .iter()
            .filter_map(|field| document.indexable_text(field))
            .any(|text| {
                self.processor
                    .analyze_literal(text)
                    .iter()
                    .any(|token| token.text.starts_with(prefix))
            })
    }

    /// Excerpt from the first indexed field mentioning a matched term
    fn snippet_for(&self, doc_id: &DocId, terms: &BTreeSet<String>) -> Option<String> {
        let document = self.documents.get(doc_id)?;

        self.config.indexed_fields
            .iter()
            .filter_map(|field| document.indexable_text(field))
            .find_map(|text| {
                let tokens = self.processor.analyze_literal(text);
                build_snippet(text, &tokens, |token| terms.contains(&self.processor.index_term(&token.text)))
            })
    }

    pub fn stats(&self) -> IndexStats {
        let entries = self.trie.walk(TraversalMode::DepthFirst);
        IndexStats {
            document_count: self.documents.len(),
            term_count: self.mapper.term_count(),
            trie: self.trie.stats(),
            tag_clusters: self.tag_clusters()
                .into_iter()
                .map(|(tag, documents)| (tag, documents.len()))
                .collect(),
            ..IndexStats::default()
        }
        .with_weights(entries.iter().map(|entry| entry.weight))
        .with_depths(entries.iter().map(|entry| entry.depth))
    }

    pub fn export_snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            created_at: Utc::now(),
            trie: self.trie.clone(),
            terms: self.mapper.export_state(),
            documents: self.documents.values().cloned().collect(),
            stats: self.stats(),
        }
    }

    /// Rebuild an index from a snapshot, rejecting any cross-reference mismatch
    pub fn from_snapshot(config: Config, snapshot: IndexSnapshot) -> Result<Self> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::corrupt_index(format!(
                "Unsupported snapshot format version {}", snapshot.format_version
            )));
        }

        snapshot.trie.validate()?;
        let mapper = InvertedMapper::import_state(snapshot.terms)?;

        let mut manager = IndexManager::new(config);
        for document in snapshot.documents {
            check_document(&document).map_err(|e| Error::corrupt_index(e.context))?;
            let id = document.id.clone();
            if manager.documents.insert(id.clone(), document).is_some() {
                return Err(Error::corrupt_index(format!("Document '{}' appears twice", id)));
            }
        }

        let referenced = snapshot.trie.document_ids();
        for id in referenced.iter().chain(mapper.document_ids().iter()) {
            if !manager.documents.contains_key(id) {
                return Err(Error::corrupt_index(format!("Index references unknown document '{}'", id)));
            }
        }

        if snapshot.trie.stats().word_count != mapper.term_count() {
            return Err(Error::corrupt_index("Trie and term mapping disagree on vocabulary size"));
        }
        for term in mapper.terms() {
            if snapshot.trie.exact_search(term) != mapper.get_documents(term) {
                return Err(Error::corrupt_index(format!("Trie and term mapping disagree on '{}'", term)));
            }
        }

        // Stored terms must be what the documents analyze to under this configuration
        let vectors: Vec<(DocId, TermVector)> = manager.documents
            .values()
            .map(|document| (document.id.clone(), manager.extract_terms(document)))
            .collect();
        let mut pairs = 0usize;
        for (id, vector) in &vectors {
            for term in vector.terms() {
                if !mapper.contains(term, id) {
                    return Err(Error::corrupt_index(format!(
                        "Document '{}' is missing term '{}' in the snapshot", id, term
                    )));
                }
                pairs += 1;
            }
        }
        let mapped: usize = mapper.terms().map(|term| mapper.document_frequency(term)).sum();
        if pairs != mapped {
            return Err(Error::corrupt_index("Snapshot maps terms that its documents do not contain"));
        }

        manager.vectors = vectors.into_iter().collect();
        manager.trie = snapshot.trie;
        manager.mapper = mapper;

        info!(documents = manager.len(), terms = manager.mapper.term_count(), "index imported from snapshot");
        Ok(manager)
    }
}

fn check_document(document: &Document) -> Result<()> {
    if !document.weight.is_finite() || document.weight < 0.0 {
        return Err(Error::invalid_document(&document.id, "weight must be a non-negative number"));
    }
    Ok(())
}

/// Collapse repeated hits on one indexed word so each (word, document) pair
/// counts once, at the best quality any query token reached
fn merge_matches(matches: Vec<TermMatch>) -> Vec<TermMatch> {
    let mut by_term: BTreeMap<String, Vec<TermMatch>> = BTreeMap::new();
    for m in matches {
        by_term.entry(m.term.clone()).or_default().push(m);
    }

    let mut merged = Vec::new();
    for (_, mut group) in by_term {
        group.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(std::cmp::Ordering::Equal));
        let mut covered: BTreeSet<DocId> = BTreeSet::new();
        for mut m in group {
            m.documents.retain(|doc_id| !covered.contains(doc_id));
            if m.documents.is_empty() {
                continue;
            }
            covered.extend(m.documents.iter().cloned());
            merged.push(m);
        }
    }
    merged
}

impl CollectionStatistics for IndexManager {
    fn total_documents(&self) -> usize {
        self.documents.len()
    }

    fn documents_containing(&self, term: &str) -> usize {
        self.mapper.document_frequency(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn doc(id: &str, content: &str) -> Document {
        Document::new(id).with_field("content", content)
    }

    fn manager() -> IndexManager {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("d1", "the quick fox")).unwrap();
        manager.add_document(doc("d2", "quick brown fox")).unwrap();
        manager
    }

    fn ids(results: &SearchResults) -> BTreeSet<String> {
        results.hits.iter().map(|hit| hit.doc_id.0.clone()).collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut manager = manager();
        let err = manager.add_document(doc("d1", "again")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDocument);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn update_of_unknown_document_fails() {
        let mut manager = manager();
        let err = manager.update_document(doc("d9", "nothing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDocument);
    }

    #[test]
    fn update_retracts_old_terms_and_records_history() {
        let mut manager = manager();
        manager.update_document(doc("d1", "the quick dog")).unwrap();

        assert_eq!(manager.trie().exact_search("fox"), [DocId::new("d2")].into_iter().collect());
        assert!(manager.mapper().contains("dog", &DocId::new("d1")));
        assert!(!manager.mapper().contains("fox", &DocId::new("d1")));

        let stored = manager.get_document(&DocId::new("d1")).unwrap();
        assert_eq!(stored.versions.len(), 1);
        assert_eq!(stored.versions[0].fields["content"], "the quick fox");
    }

    #[test]
    fn remove_is_idempotent_and_complete() {
        let mut manager = manager();
        let d1 = DocId::new("d1");
        assert!(manager.remove_document(&d1));
        assert!(!manager.remove_document(&d1));

        assert!(!manager.trie().document_ids().contains(&d1));
        assert!(!manager.mapper().document_ids().contains(&d1));
        manager.trie().validate().unwrap();
    }

    #[test]
    fn search_modes_find_candidates() {
        let manager = manager();
        assert_eq!(ids(&manager.search("fox", &SearchOptions::exact()).unwrap()), set(&["d1", "d2"]));
        assert_eq!(ids(&manager.search("qu", &SearchOptions::prefix()).unwrap()), set(&["d1", "d2"]));
        assert_eq!(ids(&manager.search("foks", &SearchOptions::fuzzy(1)).unwrap()), set(&["d1", "d2"]));
        assert_eq!(ids(&manager.search("br.*", &SearchOptions::regex()).unwrap()), set(&["d2"]));
    }

    #[test]
    fn malformed_regex_is_a_syntax_error() {
        let err = manager().search("(unclosed", &SearchOptions::regex()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuerySyntax);
    }

    #[test]
    fn rarer_terms_score_higher() {
        let manager = manager();
        let results = manager.search("brown fox", &SearchOptions::exact()).unwrap();
        assert_eq!(results.hits[0].doc_id, DocId::new("d2"));
        assert!(results.hits[0].score > results.hits[1].score);
        assert_eq!(results.max_score, results.hits[0].score);
    }

    #[test]
    fn field_boost_and_matched_fields() {
        let config = Config::default().with_field_boost("title", 3.0);
        let mut manager = IndexManager::new(config);
        manager.add_document(Document::new("a").with_field("title", "rust").with_field("content", "notes")).unwrap();
        manager.add_document(Document::new("b").with_field("title", "notes").with_field("content", "rust")).unwrap();
        manager.add_document(Document::new("c").with_field("content", "other")).unwrap();

        let results = manager.search("rust", &SearchOptions::exact()).unwrap();
        assert_eq!(results.hits[0].doc_id, DocId::new("a"));
        assert_eq!(results.hits[0].matched_fields, vec!["title".to_string()]);
        assert_eq!(results.hits[1].matched_fields, vec!["content".to_string()]);
    }

    #[test]
    fn links_lift_rank() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("a", "rust guide")).unwrap();
        manager.add_document(doc("b", "rust guide")).unwrap();
        manager.add_document(doc("c", "unrelated").link_to("b", "cites", 1.0)).unwrap();

        let results = manager.search("rust", &SearchOptions::exact()).unwrap();
        assert_eq!(results.hits[0].doc_id, DocId::new("b"));
    }

    #[test]
    fn threshold_and_limit() {
        let manager = manager();
        let results = manager.search("fox", &SearchOptions::exact().with_limit(1)).unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.total_hits, 2);

        let none = manager.search("fox", &SearchOptions::exact().with_threshold(1e6)).unwrap();
        assert!(none.is_empty());
        assert_eq!(none.total_hits, 0);
    }

    #[test]
    fn case_sensitive_queries_check_source_text() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("upper", "Rust compiler")).unwrap();
        manager.add_document(doc("lower", "rust compiler")).unwrap();

        let options = SearchOptions::exact().with_case_sensitive(true);
        assert_eq!(ids(&manager.search("Rust", &options).unwrap()), set(&["upper"]));
        assert_eq!(ids(&manager.search("Rust", &SearchOptions::exact()).unwrap()), set(&["lower", "upper"]));
    }

    #[test]
    fn snippets_highlight_matches() {
        let manager = manager();
        let results = manager.search("brown", &SearchOptions::exact()).unwrap();
        assert_eq!(results.hits[0].snippet.as_deref(), Some("quick <mark>brown</mark> fox"));

        let bare = manager.search("brown", &SearchOptions::exact().without_snippets()).unwrap();
        assert!(bare.hits[0].snippet.is_none());
    }

    #[test]
    fn content_payload_is_indexed() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(Document::new("p").with_content("payload words")).unwrap();
        assert_eq!(ids(&manager.search("payload", &SearchOptions::exact()).unwrap()), set(&["p"]));
    }

    #[test]
    fn snapshot_rebuilds_equivalent_index() {
        let manager = manager();
        let restored = IndexManager::from_snapshot(Config::default(), manager.export_snapshot()).unwrap();

        for (query, options) in [
            ("fox", SearchOptions::exact()),
            ("qu", SearchOptions::prefix()),
            ("foks", SearchOptions::fuzzy(1)),
        ] {
            assert_eq!(
                manager.search(query, &options).unwrap().hits,
                restored.search(query, &options).unwrap().hits
            );
        }
        assert_eq!(restored.stats().document_count, 2);
    }

    #[test]
    fn snapshot_with_missing_document_is_corrupt() {
        let mut snapshot = manager().export_snapshot();
        snapshot.documents.retain(|document| document.id.as_str() != "d1");
        let err = IndexManager::from_snapshot(Config::default(), snapshot).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::CorruptIndex);
    }

    #[test]
    fn snapshot_with_foreign_terms_is_corrupt() {
        let mut snapshot = manager().export_snapshot();
        snapshot.terms.insert("ghost".to_string(), vec![DocId::new("d1")]);
        let err = IndexManager::from_snapshot(Config::default(), snapshot).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::CorruptIndex);
    }

    #[test]
    fn stats_summarize_index() {
        let stats = manager().stats();
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.term_count, 3);
        assert_eq!(stats.trie.word_count, 3);
        assert!(stats.weight_max >= stats.weight_min);
        // "fox" at depth 3, "quick" and "brown" at depth 5
        assert_eq!(stats.depth_distribution, BTreeMap::from([(3, 1), (5, 2)]));
    }

    #[test]
    fn prefix_reaches_inflected_surface_forms() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("d", "running quickly")).unwrap();
        manager.add_document(doc("e", "run away")).unwrap();

        for prefix in ["runn", "running", "quickl", "quickly"] {
            assert_eq!(ids(&manager.search(prefix, &SearchOptions::prefix()).unwrap()), set(&["d"]), "{prefix}");
        }
        assert_eq!(ids(&manager.search("ru", &SearchOptions::prefix()).unwrap()), set(&["d", "e"]));
        assert!(manager.search("runx", &SearchOptions::prefix()).unwrap().is_empty());
    }

    #[test]
    fn overlapping_query_tokens_count_each_word_once() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("a", "quick")).unwrap();
        manager.add_document(doc("b", "quiet")).unwrap();

        let score = |query: &str, id: &str| {
            let results = manager.search(query, &SearchOptions::prefix()).unwrap();
            results.hits.iter().find(|hit| hit.doc_id.as_str() == id).map(|hit| hit.score)
        };
        // Each word keeps the quality of its longest matching prefix
        assert_eq!(score("qu qui quic", "a"), score("quic", "a"));
        assert_eq!(score("qu qui quic", "b"), score("qui", "b"));

        let merged = manager.candidates("qu qui quic", &SearchOptions::prefix(), 10).unwrap();
        let terms: Vec<&str> = merged.iter().map(|m| m.term.as_str()).collect();
        assert_eq!(terms, vec!["quick", "quiet"]);
    }

    #[test]
    fn regex_limit_counts_documents_not_words() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("a", "cab cad")).unwrap();
        manager.add_document(doc("b", "cam")).unwrap();
        manager.add_document(doc("c", "car")).unwrap();

        for traversal in [TraversalMode::BreadthFirst, TraversalMode::DepthFirst] {
            let options = SearchOptions::regex().with_limit(2).with_traversal(traversal);
            assert_eq!(ids(&manager.search("ca.", &options).unwrap()), set(&["a", "b"]));
        }
    }

    #[test]
    fn document_weight_scales_relevance() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("plain", "rust guide")).unwrap();
        manager.add_document(doc("heavy", "rust guide").with_weight(2.0)).unwrap();

        let results = manager.search("rust", &SearchOptions::exact()).unwrap();
        assert_eq!(results.hits[0].doc_id, DocId::new("heavy"));
        assert!((results.hits[0].score - 2.0 * results.hits[1].score).abs() < 1e-5);
    }

    #[test]
    fn invalid_weight_is_rejected() {
        let mut manager = manager();
        let err = manager.add_document(doc("d3", "text").with_weight(f32::NAN)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDocument);

        let err = manager.update_document(doc("d1", "text").with_weight(-1.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDocument);
        assert!(manager.mapper().contains("fox", &DocId::new("d1")));
    }

    #[test]
    fn tags_group_documents_into_clusters() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("a", "one").with_tag("guide").with_tag("rust")).unwrap();
        manager.add_document(doc("b", "two").with_tag("rust")).unwrap();
        manager.add_document(doc("c", "three")).unwrap();

        let clusters = manager.tag_clusters();
        assert_eq!(clusters["rust"], [DocId::new("a"), DocId::new("b")].into_iter().collect());
        assert_eq!(clusters["guide"].len(), 1);
        assert_eq!(manager.stats().tag_clusters, BTreeMap::from([("guide".to_string(), 1), ("rust".to_string(), 2)]));
    }

    #[test]
    fn links_only_count_from_their_own_document() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("a", "rust")).unwrap();
        manager.add_document(doc("b", "rust")).unwrap();

        let mut forged = doc("c", "other");
        forged.relations.push(DocumentLink::new("a", "b", "cites"));
        manager.add_document(forged).unwrap();

        let ranks = manager.ranks();
        assert_eq!(ranks.get(&DocId::new("a")), ranks.get(&DocId::new("b")));
    }

    #[test]
    fn ranks_are_computed_on_demand() {
        let mut manager = IndexManager::new(Config::default());
        manager.add_document(doc("a", "rust")).unwrap();
        manager.add_document(doc("b", "rust").link_to("a", "cites", 1.0)).unwrap();
        assert!(manager.ranks.get().is_none());

        manager.search("rust", &SearchOptions::exact()).unwrap();
        assert!(manager.ranks.get().is_some());
        assert!(manager.ranks().get(&DocId::new("a")) > manager.ranks().get(&DocId::new("b")));

        manager.remove_document(&DocId::new("b"));
        assert!(manager.ranks.get().is_none());
        assert_eq!(manager.ranks().iterations, 0);
    }
}
