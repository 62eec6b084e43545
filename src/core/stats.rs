use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

/// Shape of the term trie
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieStats {
    pub word_count: usize,
    pub max_depth: u32,
    pub total_nodes: usize,
}

/// Index-wide statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub term_count: usize,
    pub trie: TrieStats,
    pub weight_mean: f32,
    pub weight_min: f32,
    pub weight_max: f32,
    pub depth_distribution: BTreeMap<u32, usize>, // word depth -> number of words
    pub tag_clusters: BTreeMap<String, usize>,    // tag -> number of documents
}

impl IndexStats {
    /// Fill in the weight summary from per-word node weights
    pub fn with_weights<I: IntoIterator<Item = f32>>(mut self, weights: I) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0f32;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;

        for weight in weights {
            count += 1;
            sum += weight;
            min = min.min(weight);
            max = max.max(weight);
        }

        if count > 0 {
            self.weight_mean = sum / count as f32;
            self.weight_min = min;
            self.weight_max = max;
        }
        self
    }

    /// Count words per trie depth
    pub fn with_depths<I: IntoIterator<Item = u32>>(mut self, depths: I) -> Self {
        for depth in depths {
            *self.depth_distribution.entry(depth).or_insert(0) += 1;
        }
        self
    }
}

/// Query cache counters; observability only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
    pub expirations: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub index: IndexStats,
    pub cache: CacheStats,
    pub searches: u64,
    pub writes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_summary() {
        let stats = IndexStats::default().with_weights(vec![1.0, 2.0, 3.0]);
        assert_eq!(stats.weight_mean, 2.0);
        assert_eq!(stats.weight_min, 1.0);
        assert_eq!(stats.weight_max, 3.0);

        let empty = IndexStats::default().with_weights(Vec::new());
        assert_eq!(empty.weight_mean, 0.0);
    }

    #[test]
    fn depth_histogram() {
        let stats = IndexStats::default().with_depths(vec![3, 5, 3, 1]);
        assert_eq!(stats.depth_distribution, BTreeMap::from([(1, 1), (3, 2), (5, 1)]));
    }

    #[test]
    fn hit_rate_handles_no_traffic() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
        let stats = CacheStats { hits: 3, misses: 1, ..CacheStats::default() };
        assert_eq!(stats.hit_rate(), 0.75);
    }
}
