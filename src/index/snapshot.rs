use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};
use crate::core::stats::IndexStats;
use crate::core::types::{DocId, Document};
use crate::index::trie::Trie;

pub const SNAPSHOT_MAGIC: &[u8; 4] = b"TSIX";
pub const SNAPSHOT_FORMAT_VERSION: u32 = 2;

// magic + format version + crc32
const HEADER_LEN: usize = 12;

/// Everything needed to rebuild an index: trie, term mapping, documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub trie: Trie,
    pub terms: BTreeMap<String, Vec<DocId>>,
    pub documents: Vec<Document>,
    pub stats: IndexStats,
}

// [ MAGIC "TSIX" ][ VERSION u32 LE ][ CRC32 u32 LE ] <- byte 0
// [ LZ4 (size-prefixed) of bincode(IndexSnapshot) ]
impl IndexSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let compressed = lz4_flex::compress_prepend_size(&payload);

        let mut hasher = Hasher::new();
        hasher.update(&compressed);
        let checksum = hasher.finalize();

        let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
        bytes.extend_from_slice(SNAPSHOT_MAGIC);
        bytes.extend_from_slice(&self.format_version.to_le_bytes());
        bytes.extend_from_slice(&checksum.to_le_bytes());
        bytes.extend_from_slice(&compressed);
        Ok(bytes)
    }

    /// Decode and verify framing. Structural consistency is checked by the index on import.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::corrupt_index("Snapshot is truncated"));
        }
        if &bytes[0..4] != SNAPSHOT_MAGIC {
            return Err(Error::corrupt_index("Snapshot magic mismatch"));
        }

        let version = read_u32(&bytes[4..8]);
        if version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::corrupt_index(format!(
                "Unsupported snapshot format version {}", version
            )));
        }

        let expected = read_u32(&bytes[8..12]);
        let compressed = &bytes[HEADER_LEN..];
        let mut hasher = Hasher::new();
        hasher.update(compressed);
        if hasher.finalize() != expected {
            return Err(Error::corrupt_index("Snapshot checksum mismatch"));
        }

        let payload = lz4_flex::decompress_size_prepended(compressed)
            .map_err(|e| Error::corrupt_index(format!("Snapshot decompression failed: {}", e)))?;
        let snapshot: IndexSnapshot = bincode::deserialize(&payload)
            .map_err(|e| Error::corrupt_index(format!("Snapshot payload is malformed: {}", e)))?;

        if snapshot.format_version != version {
            return Err(Error::corrupt_index("Snapshot header and payload versions differ"));
        }
        Ok(snapshot)
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
