//! TTL-bounded caching over the durable key-value store.

mod recent;
mod reference;
mod ttl;

pub use recent::{RecencyList, DEFAULT_RECENT_CAP};
pub use reference::ReferenceCache;
pub use ttl::{CacheStats, TtlCache};
