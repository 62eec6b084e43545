use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::stats::EngineStats;
use crate::core::types::{DocId, Document};
use crate::index::manager::IndexManager;
use crate::index::snapshot::IndexSnapshot;
use crate::query::cache::{CacheKey, QueryCache};
use crate::search::options::SearchOptions;
use crate::search::results::SearchResults;
use crate::storage::backend::{open_storage, StorageBackend};

/// Storage key the index snapshot is persisted under
pub const SNAPSHOT_KEY: &str = "index.snapshot";

pub struct SearchEngine {
    config: Config,

    index: RwLock<IndexManager>, // single writer, many readers
    cache: QueryCache,
    storage: Arc<dyn StorageBackend>,

    // Metrics
    search_count: AtomicU64,
    write_count: AtomicU64,
}

impl SearchEngine {
    /// Validate `config` and open the storage adapter it names
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let storage = open_storage(&config.storage)?;
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        config.validate()?;
        info!(
            fields = ?config.indexed_fields,
            storage = storage.name(),
            cache_size = config.cache.max_size,
            "search engine created"
        );

        Ok(SearchEngine {
            index: RwLock::new(IndexManager::new(config.clone())),
            cache: QueryCache::new(&config.cache),
            storage,
            search_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // Each write clears the cache while still holding the write lock, so no
    // reader can cache a result computed against the old index afterwards.

    pub fn add_document(&self, document: Document) -> Result<()> {
        let mut index = self.index.write();
        index.add_document(document)?;
        self.cache.clear();
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn update_document(&self, document: Document) -> Result<()> {
        let mut index = self.index.write();
        index.update_document(document)?;
        self.cache.clear();
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns whether a document was removed; unknown ids are not an error
    pub fn remove_document(&self, doc_id: &DocId) -> bool {
        let mut index = self.index.write();
        let removed = index.remove_document(doc_id);
        if removed {
            self.cache.clear();
            self.write_count.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn get_document(&self, doc_id: &DocId) -> Option<Document> {
        self.index.read().get_document(doc_id).cloned()
    }

    /// Documents grouped by tag
    pub fn tag_clusters(&self) -> BTreeMap<String, BTreeSet<DocId>> {
        self.index.read().tag_clusters()
    }

    pub fn contains(&self, doc_id: &DocId) -> bool {
        self.index.read().contains(doc_id)
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Cached lookup first, then candidate retrieval, scoring and cache population
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        let started = Instant::now();
        options.validate()?;

        let index = self.index.read();
        let key = CacheKey::new(&index.normalize_query(query, options), options)?;
        self.search_count.fetch_add(1, Ordering::Relaxed);

        if let Some(mut cached) = self.cache.get(&key) {
            cached.from_cache = true;
            cached.took_ms = started.elapsed().as_millis() as u64;
            debug!(query, mode = ?options.mode, hits = cached.hits.len(), "search served from cache");
            return Ok(cached);
        }

        let mut results = index.search(query, options)?;
        results.took_ms = started.elapsed().as_millis() as u64;
        self.cache.set(key, results.clone());

        debug!(
            query,
            mode = ?options.mode,
            hits = results.hits.len(),
            total_hits = results.total_hits,
            took_ms = results.took_ms,
            "search executed"
        );
        Ok(results)
    }

    pub fn export_snapshot(&self) -> IndexSnapshot {
        self.index.read().export_snapshot()
    }

    /// Serialize trie, term mapping and documents as one consistent blob
    pub fn export_index(&self) -> Result<Vec<u8>> {
        let snapshot = self.export_snapshot();
        let bytes = snapshot.encode()?;
        info!(
            documents = snapshot.documents.len(),
            terms = snapshot.terms.len(),
            bytes = bytes.len(),
            "index exported"
        );
        Ok(bytes)
    }

    /// Replace the whole index. On error the current index is left untouched.
    pub fn import_index(&self, bytes: &[u8]) -> Result<()> {
        let snapshot = IndexSnapshot::decode(bytes)?;
        self.import_snapshot(snapshot)
    }

    pub fn import_snapshot(&self, snapshot: IndexSnapshot) -> Result<()> {
        let manager = IndexManager::from_snapshot(self.config.clone(), snapshot)?;

        let mut index = self.index.write();
        *index = manager;
        self.cache.clear();
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Write the current snapshot to storage; storage failures are returned
    pub async fn persist(&self) -> Result<()> {
        let bytes = self.export_index()?;
        self.storage.store(SNAPSHOT_KEY, &bytes).await?;
        info!(storage = self.storage.name(), bytes = bytes.len(), "index persisted");
        Ok(())
    }

    /// Load the persisted snapshot, if any. Returns whether an index was loaded.
    ///
    /// A storage failure is logged and the in-memory index keeps serving;
    /// a snapshot that fails validation is an error.
    pub async fn restore(&self) -> Result<bool> {
        let bytes = match self.storage.retrieve(SNAPSHOT_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(storage = self.storage.name(), "no persisted index found");
                return Ok(false);
            }
            Err(e) => {
                warn!(storage = self.storage.name(), error = %e, "index restore skipped");
                return Ok(false);
            }
        };

        self.import_index(&bytes)?;
        info!(storage = self.storage.name(), documents = self.len(), "index restored");
        Ok(true)
    }

    pub async fn close(&self) -> Result<()> {
        self.storage.close().await
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            index: self.index.read().stats(),
            cache: self.cache.get_stats(),
            searches: self.search_count.load(Ordering::Relaxed),
            writes: self.write_count.load(Ordering::Relaxed),
        }
    }
}
