//! Durable key-value storage shared by the session and cache layers.
//!
//! Everything above this layer speaks string keys and string values through
//! the [`KeyValueStore`] trait, so tests can swap the file-backed store for
//! an in-memory one without touching real state on disk.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// Synchronous string-keyed storage.
///
/// Reads are infallible: a backend that cannot produce a value for a key
/// reports it as absent. Only writes surface errors, since losing a write
/// is something callers may need to know about.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str);

    /// All keys currently present, in no particular order
    fn keys(&self) -> Vec<String>;
}
