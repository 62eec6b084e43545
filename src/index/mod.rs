pub mod trie;
pub mod mapper;
pub mod manager;
pub mod snapshot;
