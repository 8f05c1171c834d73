//! Core client library for the MindHaven platform.
//!
//! This crate holds everything the UI layers share: the authenticated API
//! client, the token lifecycle manager with coalesced refresh, the durable
//! key-value store, and the TTL cache used for reference data.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod store;

pub use api::{ApiClient, ApiError, AuthTransport};
pub use auth::{AuthError, LoginOutcome, SessionStore, TokenLifecycleManager};
pub use cache::{CacheStats, RecencyList, ReferenceCache, TtlCache};
pub use config::Config;
pub use models::{TokenPair, UserProfile};
pub use store::{FileStore, KeyValueStore, MemoryStore};
