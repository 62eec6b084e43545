use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};
use crate::core::stats::TrieStats;
use crate::core::types::DocId;
use crate::search::fuzzy::LevenshteinRow;
use crate::search::regex::TraversalMode;

/// Index of a node inside the trie arena
pub type NodeId = usize;

pub const ROOT: NodeId = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrieNode {
    pub ch: Option<char>,                  // None only for the root
    pub parent: Option<NodeId>,
    pub children: BTreeMap<char, NodeId>,
    pub document_refs: BTreeSet<DocId>,    // Non-empty only on word ends
    pub weight: f32,
    pub frequency: u32,
    pub last_accessed: DateTime<Utc>,
    pub depth: u32,
    pub prefix_count: u32,                 // (word, doc) pairs at or below this node
    pub is_end_of_word: bool,
}

impl TrieNode {
    fn new(ch: Option<char>, parent: Option<NodeId>, depth: u32) -> Self {
        TrieNode {
            ch,
            parent,
            children: BTreeMap::new(),
            document_refs: BTreeSet::new(),
            weight: 0.0,
            frequency: 0,
            last_accessed: Utc::now(),
            depth,
            prefix_count: 0,
            is_end_of_word: false,
        }
    }

    fn is_garbage(&self) -> bool {
        self.prefix_count == 0 && self.children.is_empty() && self.document_refs.is_empty()
    }
}

/// Weight grows with the number of documents using the word, with diminishing returns
pub fn node_weight(frequency: u32) -> f32 {
    if frequency == 0 {
        0.0
    } else {
        1.0 + (1.0 + frequency as f32).ln()
    }
}

/// Shallow, heavily used words rank first
pub fn calculate_node_score(node: &TrieNode) -> f32 {
    node.weight / (1.0 + node.depth as f32)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixMatch {
    pub word: String,
    pub document_refs: BTreeSet<DocId>,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub word: String,
    pub distance: usize,
    pub document_refs: BTreeSet<DocId>,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegexMatch {
    pub word: String,
    pub document_refs: BTreeSet<DocId>,
}

/// One indexed word as seen by a full traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrieEntry {
    pub word: String,
    pub depth: u32,
    pub document_count: usize,
    pub frequency: u32,
    pub weight: f32,
}

/// Character trie over an arena of nodes addressed by index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trie {
    nodes: Vec<Option<TrieNode>>,
    free: Vec<NodeId>,
    word_count: usize,
    node_count: usize,
    max_depth: u32,
}

impl Default for Trie {
    fn default() -> Self {
        Trie::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Trie {
            nodes: vec![Some(TrieNode::new(None, None, 0))],
            free: Vec::new(),
            word_count: 0,
            node_count: 1,
            max_depth: 0,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&TrieNode> {
        self.nodes.get(id).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TrieNode {
        match self.nodes.get_mut(id).and_then(|slot| slot.as_mut()) {
            Some(node) => node,
            None => panic!("trie node {} referenced after being freed", id),
        }
    }

    fn live(&self, id: NodeId) -> &TrieNode {
        match self.node(id) {
            Some(node) => node,
            None => panic!("trie node {} referenced after being freed", id),
        }
    }

    fn alloc(&mut self, node: TrieNode) -> NodeId {
        self.node_count += 1;
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id] = None;
        self.free.push(id);
        self.node_count -= 1;
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }

    /// Node reached by spelling `word` from the root
    pub fn find(&self, word: &str) -> Option<NodeId> {
        let mut current = ROOT;
        for ch in word.chars() {
            current = *self.live(current).children.get(&ch)?;
        }
        Some(current)
    }

    fn path(&self, word: &str) -> Option<Vec<NodeId>> {
        let mut path = Vec::with_capacity(word.chars().count() + 1);
        let mut current = ROOT;
        path.push(current);
        for ch in word.chars() {
            current = *self.live(current).children.get(&ch)?;
            path.push(current);
        }
        Some(path)
    }

    pub fn contains(&self, word: &str, doc_id: &DocId) -> bool {
        self.find(word)
            .map(|id| self.live(id).document_refs.contains(doc_id))
            .unwrap_or(false)
    }

    /// Register `doc_id` under `word`. Returns false when the pair already existed.
    pub fn insert(&mut self, word: &str, doc_id: &DocId) -> bool {
        if word.is_empty() || self.contains(word, doc_id) {
            return false;
        }

        let now = Utc::now();
        let mut current = ROOT;
        self.node_mut(ROOT).prefix_count += 1;

        for ch in word.chars() {
            let existing = self.live(current).children.get(&ch).copied();
            let next = match existing {
                Some(id) => id,
                None => {
                    let depth = self.live(current).depth + 1;
                    let id = self.alloc(TrieNode::new(Some(ch), Some(current), depth));
                    self.node_mut(current).children.insert(ch, id);
                    self.max_depth = self.max_depth.max(depth);
                    id
                }
            };

            let node = self.node_mut(next);
            node.prefix_count += 1;
            node.last_accessed = now;
            current = next;
        }

        let node = self.node_mut(current);
        let newly_terminal = !node.is_end_of_word;
        node.is_end_of_word = true;
        node.document_refs.insert(doc_id.clone());
        node.frequency += 1;
        node.weight = node_weight(node.frequency);

        if newly_terminal {
            self.word_count += 1;
        }
        true
    }

    /// Detach `doc_id` from `word` and prune branches left empty.
    /// Returns false when the pair was not indexed.
    pub fn remove(&mut self, word: &str, doc_id: &DocId) -> bool {
        let path = match self.path(word) {
            Some(path) => path,
            None => return false,
        };
        let terminal = path[path.len() - 1];
        if terminal == ROOT || !self.node_mut(terminal).document_refs.remove(doc_id) {
            return false;
        }

        let now = Utc::now();
        let node = self.node_mut(terminal);
        node.frequency = node.frequency.saturating_sub(1);
        node.weight = node_weight(node.frequency);
        if node.document_refs.is_empty() {
            node.is_end_of_word = false;
            self.word_count -= 1;
        }

        for &id in &path {
            let node = self.node_mut(id);
            node.prefix_count = node.prefix_count.saturating_sub(1);
            node.last_accessed = now;
        }

        self.prune(&path);
        true
    }

    /// Delete empty nodes from the end of `path` back toward the root
    fn prune(&mut self, path: &[NodeId]) {
        let mut recompute_depth = false;

        for &id in path.iter().skip(1).rev() {
            let node = self.live(id);
            if !node.is_garbage() {
                break;
            }
            let (parent, ch, depth) = (node.parent, node.ch, node.depth);
            if let (Some(parent), Some(ch)) = (parent, ch) {
                self.node_mut(parent).children.remove(&ch);
            }
            recompute_depth |= depth == self.max_depth;
            self.release(id);
        }

        if recompute_depth {
            self.max_depth = self.nodes.iter().flatten().map(|n| n.depth).max().unwrap_or(0);
        }
    }

    /// Remove `doc_id` from the listed words (mapper-guided removal)
    pub fn remove_document<'a, I>(&mut self, doc_id: &DocId, words: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        words.into_iter().filter(|word| self.remove(word, doc_id)).count()
    }

    /// Remove `doc_id` everywhere by full traversal
    pub fn purge_document(&mut self, doc_id: &DocId) -> usize {
        let words = self.words_for(doc_id);
        self.remove_document(doc_id, words.iter().map(String::as_str))
    }

    /// Every word whose node references `doc_id`
    pub fn words_for(&self, doc_id: &DocId) -> Vec<String> {
        self.walk_nodes(TraversalMode::DepthFirst)
            .into_iter()
            .filter(|(_, id)| self.live(*id).document_refs.contains(doc_id))
            .map(|(word, _)| word)
            .collect()
    }

    pub fn exact_search(&self, term: &str) -> BTreeSet<DocId> {
        match self.find(term) {
            Some(id) if id != ROOT => self.live(id).document_refs.clone(),
            _ => BTreeSet::new(),
        }
    }

    /// All words under `prefix`, best node score first, ties lexicographic
    pub fn prefix_search(&self, prefix: &str) -> Vec<PrefixMatch> {
        let start = match self.find(prefix) {
            Some(id) => id,
            None => return Vec::new(),
        };

        let mut matches = Vec::new();
        let mut stack = vec![(start, prefix.to_string())];

        while let Some((id, word)) = stack.pop() {
            let node = self.live(id);
            if node.is_end_of_word {
                matches.push(PrefixMatch {
                    word: word.clone(),
                    document_refs: node.document_refs.clone(),
                    score: calculate_node_score(node),
                });
            }
            for (ch, child) in node.children.iter().rev() {
                let mut next = word.clone();
                next.push(*ch);
                stack.push((*child, next));
            }
        }

        matches.sort_by(|a, b| {
            b.score.partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.word.cmp(&b.word))
        });
        matches
    }

    /// Words within `max_distance` edits of `term`, closest first
    pub fn fuzzy_search(&self, term: &str, max_distance: usize) -> Vec<FuzzyMatch> {
        if self.is_empty() {
            return Vec::new();
        }

        let target: Vec<char> = term.chars().collect();
        let mut matches = Vec::new();
        let mut stack = vec![(ROOT, String::new(), LevenshteinRow::start(target.len()))];

        while let Some((id, word, row)) = stack.pop() {
            let node = self.live(id);

            if node.is_end_of_word && row.distance() <= max_distance {
                let distance = row.distance();
                matches.push(FuzzyMatch {
                    word: word.clone(),
                    distance,
                    document_refs: node.document_refs.clone(),
                    score: (max_distance - distance) as f32,
                });
            }

            // No extension of this prefix can get back under the bound
            if row.min() > max_distance {
                continue;
            }

            for (ch, child) in &node.children {
                let next_row = row.step(&target, *ch);
                if next_row.min() <= max_distance {
                    let mut next = word.clone();
                    next.push(*ch);
                    stack.push((*child, next, next_row));
                }
            }
        }

        matches.sort_by(|a, b| {
            a.distance.cmp(&b.distance)
                .then_with(|| a.word.cmp(&b.word))
        });
        matches
    }

    /// Test each indexed word against a compiled pattern, stopping at `max_results`
    pub fn regex_traversal(&self, pattern: &Regex, max_results: usize, mode: TraversalMode) -> Vec<RegexMatch> {
        if max_results == 0 {
            return Vec::new();
        }
        let mut found = 0usize;
        self.regex_walk(pattern, mode, |_| {
            found += 1;
            found >= max_results
        })
    }

    /// Like `regex_traversal`, but stops once the matched words cover `max_documents` documents
    pub fn regex_documents(&self, pattern: &Regex, max_documents: usize, mode: TraversalMode) -> Vec<RegexMatch> {
        if max_documents == 0 {
            return Vec::new();
        }
        let mut covered: BTreeSet<DocId> = BTreeSet::new();
        self.regex_walk(pattern, mode, |m| {
            covered.extend(m.document_refs.iter().cloned());
            covered.len() >= max_documents
        })
    }

    fn regex_walk<F>(&self, pattern: &Regex, mode: TraversalMode, mut done: F) -> Vec<RegexMatch>
    where
        F: FnMut(&RegexMatch) -> bool,
    {
        let mut matches = Vec::new();
        if self.is_empty() {
            return matches;
        }

        let mut pending = VecDeque::new();
        pending.push_back((ROOT, String::new()));

        while let Some((id, word)) = match mode {
            TraversalMode::BreadthFirst => pending.pop_front(),
            TraversalMode::DepthFirst => pending.pop_back(),
        } {
            let node = self.live(id);
            if node.is_end_of_word && pattern.is_match(&word) {
                let m = RegexMatch {
                    word: word.clone(),
                    document_refs: node.document_refs.clone(),
                };
                let stop = done(&m);
                matches.push(m);
                if stop {
                    break;
                }
            }

            let children: Box<dyn Iterator<Item = (&char, &NodeId)>> = match mode {
                TraversalMode::BreadthFirst => Box::new(node.children.iter()),
                // Reversed so the smallest child is popped first
                TraversalMode::DepthFirst => Box::new(node.children.iter().rev()),
            };
            for (ch, child) in children {
                let mut next = word.clone();
                next.push(*ch);
                pending.push_back((*child, next));
            }
        }

        matches
    }

    /// Indexed words that are proper prefixes of `word`, shortest first
    pub fn words_along(&self, word: &str) -> Vec<PrefixMatch> {
        let mut matches = Vec::new();
        let mut current = ROOT;
        let mut spelled = String::new();
        let mut chars = word.chars().peekable();

        while let Some(ch) = chars.next() {
            let Some(&next) = self.live(current).children.get(&ch) else {
                break;
            };
            current = next;
            spelled.push(ch);
            let node = self.live(current);
            if node.is_end_of_word && chars.peek().is_some() {
                matches.push(PrefixMatch {
                    word: spelled.clone(),
                    document_refs: node.document_refs.clone(),
                    score: calculate_node_score(node),
                });
            }
        }
        matches
    }

    fn walk_nodes(&self, mode: TraversalMode) -> Vec<(String, NodeId)> {
        let mut visited = Vec::new();
        let mut pending = VecDeque::new();
        pending.push_back((ROOT, String::new()));

        while let Some((id, word)) = match mode {
            TraversalMode::BreadthFirst => pending.pop_front(),
            TraversalMode::DepthFirst => pending.pop_back(),
        } {
            let node = self.live(id);
            let children: Vec<(&char, &NodeId)> = match mode {
                TraversalMode::BreadthFirst => node.children.iter().collect(),
                TraversalMode::DepthFirst => node.children.iter().rev().collect(),
            };
            for (ch, child) in children {
                let mut next = word.clone();
                next.push(*ch);
                pending.push_back((*child, next));
            }
            if node.is_end_of_word {
                visited.push((word, id));
            }
        }

        visited
    }

    /// Every indexed word with its node statistics
    pub fn walk(&self, mode: TraversalMode) -> Vec<TrieEntry> {
        self.walk_nodes(mode)
            .into_iter()
            .map(|(word, id)| {
                let node = self.live(id);
                TrieEntry {
                    word,
                    depth: node.depth,
                    document_count: node.document_refs.len(),
                    frequency: node.frequency,
                    weight: node.weight,
                }
            })
            .collect()
    }

    /// Every document id referenced anywhere in the trie
    pub fn document_ids(&self) -> BTreeSet<DocId> {
        self.nodes
            .iter()
            .flatten()
            .flat_map(|node| node.document_refs.iter().cloned())
            .collect()
    }

    pub fn stats(&self) -> TrieStats {
        TrieStats {
            word_count: self.word_count,
            max_depth: self.max_depth,
            total_nodes: self.node_count,
        }
    }

    /// Structural checks run on imported tries
    pub fn validate(&self) -> Result<()> {
        let root = self.node(ROOT)
            .ok_or_else(|| Error::corrupt_index("Trie has no root node"))?;
        if root.ch.is_some() || root.parent.is_some() || root.depth != 0 {
            return Err(Error::corrupt_index("Trie root is malformed"));
        }

        let mut seen = HashSet::new();
        let mut words = 0usize;
        let mut max_depth = 0u32;
        let mut stack = vec![ROOT];
        seen.insert(ROOT);

        while let Some(id) = stack.pop() {
            let node = self.live(id);
            let overflow = || Error::corrupt_index(format!("Node {} has counts out of range", id));
            let mut below = u32::try_from(node.document_refs.len()).map_err(|_| overflow())?;
            let child_depth = node.depth.checked_add(1).ok_or_else(overflow)?;

            for (ch, &child_id) in &node.children {
                let child = self.node(child_id)
                    .ok_or_else(|| Error::corrupt_index(format!("Node {} points at freed node {}", id, child_id)))?;
                if !seen.insert(child_id) {
                    return Err(Error::corrupt_index(format!("Node {} is reachable twice", child_id)));
                }
                if child.ch != Some(*ch) || child.parent != Some(id) || child.depth != child_depth {
                    return Err(Error::corrupt_index(format!("Node {} disagrees with its parent link", child_id)));
                }
                below = below.checked_add(child.prefix_count).ok_or_else(overflow)?;
                stack.push(child_id);
            }

            if below != node.prefix_count {
                return Err(Error::corrupt_index(format!("Node {} has inconsistent prefix count", id)));
            }
            if node.is_end_of_word != !node.document_refs.is_empty() {
                return Err(Error::corrupt_index(format!("Node {} has inconsistent word flag", id)));
            }
            if id != ROOT && node.is_garbage() {
                return Err(Error::corrupt_index(format!("Node {} is an unpruned empty branch", id)));
            }
            if node.is_end_of_word {
                words += 1;
            }
            max_depth = max_depth.max(node.depth);
        }

        let live = self.nodes.iter().flatten().count();
        if live != seen.len() || live != self.node_count {
            return Err(Error::corrupt_index("Trie contains unreachable nodes"));
        }
        if words != self.word_count || max_depth != self.max_depth {
            return Err(Error::corrupt_index("Trie statistics do not match its nodes"));
        }
        let free_ok = self.free.iter().all(|&id| id != ROOT && self.nodes.get(id).is_some_and(|slot| slot.is_none()));
        if !free_ok || self.free.len() + live != self.nodes.len() {
            return Err(Error::corrupt_index("Trie free list is inconsistent"));
        }
        Ok(())
    }
}
