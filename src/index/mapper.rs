use std::collections::{BTreeMap, BTreeSet, HashMap};
use crate::core::error::{Error, Result};
use crate::core::types::DocId;

/// Flat term -> document set index.
///
/// This is the authoritative record of which terms a document contributed,
/// so it drives trie pruning when a document goes away.
#[derive(Debug, Clone, Default)]
pub struct InvertedMapper {
    terms: HashMap<String, BTreeSet<DocId>>,
}

impl InvertedMapper {
    pub fn new() -> Self {
        InvertedMapper {
            terms: HashMap::new(),
        }
    }

    /// Returns true when the pair was not already present
    pub fn map_data(&mut self, term: &str, doc_id: &DocId) -> bool {
        self.terms
            .entry(term.to_string())
            .or_default()
            .insert(doc_id.clone())
    }

    pub fn get_documents(&self, term: &str) -> BTreeSet<DocId> {
        self.terms.get(term).cloned().unwrap_or_default()
    }

    pub fn contains(&self, term: &str, doc_id: &DocId) -> bool {
        self.terms.get(term).is_some_and(|docs| docs.contains(doc_id))
    }

    /// Number of documents containing `term`
    pub fn document_frequency(&self, term: &str) -> usize {
        self.terms.get(term).map(|docs| docs.len()).unwrap_or(0)
    }

    /// Discard `doc_id` from every term; returns the terms it was mapped under
    pub fn remove_document(&mut self, doc_id: &DocId) -> Vec<String> {
        let mut removed = Vec::new();

        self.terms.retain(|term, docs| {
            if docs.remove(doc_id) {
                removed.push(term.clone());
            }
            !docs.is_empty()
        });

        removed.sort();
        removed
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = &String> {
        self.terms.keys()
    }

    pub fn document_ids(&self) -> BTreeSet<DocId> {
        self.terms.values().flatten().cloned().collect()
    }

    pub fn export_state(&self) -> BTreeMap<String, Vec<DocId>> {
        self.terms
            .iter()
            .map(|(term, docs)| (term.clone(), docs.iter().cloned().collect()))
            .collect()
    }

    /// Rebuild from an exported mapping. Duplicate ids within one term are
    /// treated as corruption, as are empty lists.
    pub fn import_state(state: BTreeMap<String, Vec<DocId>>) -> Result<Self> {
        let mut terms = HashMap::with_capacity(state.len());

        for (term, ids) in state {
            if ids.is_empty() {
                return Err(Error::corrupt_index(format!("Term '{}' maps to no documents", term)));
            }

            let mut docs = BTreeSet::new();
            for id in ids {
                if !docs.insert(id.clone()) {
                    return Err(Error::corrupt_index(format!(
                        "Term '{}' lists document '{}' more than once", term, id
                    )));
                }
            }
            terms.insert(term, docs);
        }

        Ok(InvertedMapper { terms })
    }
}
