use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};

/// Upper bound on fuzzy edit distance; trie traversal cost grows quickly past this
pub const MAX_FUZZY_DISTANCE: u8 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub indexed_fields: Vec<String>,
    pub field_boosts: HashMap<String, f32>,
    pub fuzzy_max_distance: u8,
    pub max_results: usize,
    pub analysis: AnalysisConfig,
    pub cache: CacheConfig,
    pub scoring: ScoringConfig,
    pub storage: StorageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    Lru,
    Fifo,
    Lfu,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub max_size: usize,
    pub ttl_ms: u64,
    pub strategy: EvictionStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub text_weight: f32,
    pub rank_weight: f32,
    pub tf_weight: f32,
    pub idf_weight: f32,
    pub damping_factor: f64,
    pub convergence_threshold: f64,
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub case_sensitive: bool,
    pub remove_stop_words: bool,
    pub stem: bool,
    pub strip_diacritics: bool,
    pub min_token_length: usize,
    pub max_token_length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Filesystem { path: PathBuf },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            indexed_fields: vec!["title".to_string(), "content".to_string()],
            field_boosts: HashMap::new(),
            fuzzy_max_distance: 2,
            max_results: 10,
            analysis: AnalysisConfig::default(),
            cache: CacheConfig::default(),
            scoring: ScoringConfig::default(),
            storage: StorageKind::Memory,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_size: 1000,
            ttl_ms: 5 * 60 * 1000, // 5 minutes
            strategy: EvictionStrategy::Lru,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            text_weight: 0.7,
            rank_weight: 0.3,
            tf_weight: 0.1,
            idf_weight: 0.1,
            damping_factor: 0.85,
            convergence_threshold: 1e-6,
            max_iterations: 100,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            case_sensitive: false,
            remove_stop_words: true,
            stem: true,
            strip_diacritics: true,
            min_token_length: 1,
            max_token_length: 255,
        }
    }
}

impl Config {
    pub fn with_indexed_fields(mut self, fields: &[&str]) -> Self {
        self.indexed_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_field_boost(mut self, field: &str, boost: f32) -> Self {
        self.field_boosts.insert(field.to_string(), boost);
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn field_boost(&self, field: &str) -> f32 {
        self.field_boosts.get(field).copied().unwrap_or(1.0)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Unreadable configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Cannot read configuration {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Reject combinations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.indexed_fields.is_empty() {
            return Err(Error::config("At least one indexed field is required"));
        }

        let mut seen = HashSet::new();
        for field in &self.indexed_fields {
            if field.trim().is_empty() {
                return Err(Error::config("Indexed field names must not be blank"));
            }
            if !seen.insert(field.as_str()) {
                return Err(Error::config(format!("Indexed field '{}' listed twice", field)));
            }
        }

        for (field, boost) in &self.field_boosts {
            if !seen.contains(field.as_str()) {
                return Err(Error::config(format!("Boost given for non-indexed field '{}'", field)));
            }
            if !boost.is_finite() || *boost <= 0.0 {
                return Err(Error::config(format!("Boost for '{}' must be positive", field)));
            }
        }

        if self.fuzzy_max_distance > MAX_FUZZY_DISTANCE {
            return Err(Error::config(format!(
                "fuzzy_max_distance {} exceeds limit {}",
                self.fuzzy_max_distance, MAX_FUZZY_DISTANCE
            )));
        }

        if self.max_results == 0 {
            return Err(Error::config("max_results must be at least 1"));
        }

        if self.analysis.min_token_length > self.analysis.max_token_length {
            return Err(Error::config("min_token_length is greater than max_token_length"));
        }

        self.cache.validate()?;
        self.scoring.validate()
    }
}

impl CacheConfig {
    pub fn new(max_size: usize, ttl_ms: u64, strategy: EvictionStrategy) -> Self {
        CacheConfig { max_size, ttl_ms, strategy }
    }

    fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::config("cache.max_size must be at least 1"));
        }
        if self.ttl_ms == 0 {
            return Err(Error::config("cache.ttl_ms must be at least 1"));
        }
        Ok(())
    }
}

impl ScoringConfig {
    fn validate(&self) -> Result<()> {
        let weights = [
            ("text_weight", self.text_weight),
            ("rank_weight", self.rank_weight),
            ("tf_weight", self.tf_weight),
            ("idf_weight", self.idf_weight),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::config(format!("scoring.{} must be a non-negative number", name)));
            }
        }
        if self.text_weight + self.rank_weight == 0.0 {
            return Err(Error::config("text_weight and rank_weight cannot both be zero"));
        }
        if !(self.damping_factor > 0.0 && self.damping_factor < 1.0) {
            return Err(Error::config("damping_factor must lie strictly between 0 and 1"));
        }
        if !(self.convergence_threshold > 0.0) {
            return Err(Error::config("convergence_threshold must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(Error::config("max_iterations must be at least 1"));
        }
        Ok(())
    }
}
