pub mod core;
pub mod analysis;
pub mod index;
pub mod scoring;
pub mod search;
pub mod query;
pub mod storage;

pub use crate::core::config::{AnalysisConfig, CacheConfig, Config, EvictionStrategy, ScoringConfig, StorageKind};
pub use crate::core::engine::SearchEngine;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::stats::{CacheStats, EngineStats, IndexStats, TrieStats};
pub use crate::core::types::{DocId, Document, DocumentLink, DocumentVersion};
pub use crate::search::options::{SearchMode, SearchOptions};
pub use crate::search::regex::TraversalMode;
pub use crate::search::results::{SearchResult, SearchResults};
pub use crate::storage::backend::{MemoryStorage, StorageBackend};
pub use crate::storage::file::FileStorage;

/*
┌──────────────────────────────────────────────────────────────────────────────────────┐
│                              TRIESEEK STRUCT ARCHITECTURE                             │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────────── CORE LAYER ─────────────────────────────────────┐
│  ┌────────────────────────────────────────────────────────────────────────────────┐  │
│  │                             struct SearchEngine                                │  │
│  │ config: Config                        // Validated before construction         │  │
│  │ index: RwLock<IndexManager>           // Single writer, many readers           │  │
│  │ cache: QueryCache                     // Ranked results by query + options     │  │
│  │ storage: Arc<dyn StorageBackend>      // Async persistence boundary            │  │
│  │ search_count / write_count: AtomicU64                                          │  │
│  └────────────────────────────────────────────────────────────────────────────────┘  │
│  ┌──────────────────┐  ┌──────────────────────┐  ┌────────────────────────────────┐  │
│  │ struct Config    │  │ struct Document      │  │ struct EngineStats             │  │
│  │ • indexed_fields │  │ • id: DocId(String)  │  │ • index: IndexStats            │  │
│  │ • field_boosts   │  │ • fields / metadata  │  │ • cache: CacheStats            │  │
│  │ • analysis       │  │ • versions (history) │  │ • searches / writes            │  │
│  │ • cache, scoring │  │ • relations (links)  │  └────────────────────────────────┘  │
│  │ • storage        │  │ • content            │                                      │
│  └──────────────────┘  └──────────────────────┘                                      │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── INDEX LAYER ─────────────────────────────────────┐
│  struct IndexManager                                                                 │
│  • trie: Trie                      // Arena of TrieNode, children by char -> NodeId   │
│  • mapper: InvertedMapper          // term -> BTreeSet<DocId>, drives trie pruning    │
│  • documents: BTreeMap<DocId, Document>                                              │
│  • vectors: HashMap<DocId, TermVector>                                               │
│  • ranks: DocumentRanks            // Recomputed on the first search after a write    │
│                                                                                      │
│  struct IndexSnapshot  "TSIX" | version | crc32 | lz4(bincode(snapshot))             │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────── ANALYSIS / SEARCH / SCORING ──────────────────────────────┐
│  QueryProcessor: StandardTokenizer -> NormalizeFilter -> StopWordFilter -> Stemmer   │
│  SearchMode::{Exact, Prefix, Fuzzy, Regex}   LevenshteinRow   TraversalMode          │
│  TopKCollector -> SearchResults { hits, total_hits, max_score, took_ms, from_cache } │
│  RelevanceScorer: text * w + rank * w + ln(1 + tf) * w + idf * w                     │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── QUERY / STORAGE ─────────────────────────────────┐
│  QueryCache: LruCache<CacheKey, CacheEntry>, TTL checked on read, Lru/Fifo/Lfu       │
│  StorageBackend (async): MemoryStorage, FileStorage (temp file + rename)             │
└──────────────────────────────────────────────────────────────────────────────────────┘
*/
