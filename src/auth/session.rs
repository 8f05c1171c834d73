//! Persisted session state: token pair and user profile.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::{TokenPair, UserProfile};
use crate::store::KeyValueStore;

const ACCESS_TOKEN_KEY: &str = "session.access_token";
const REFRESH_TOKEN_KEY: &str = "session.refresh_token";
const PROFILE_KEY: &str = "session.profile";

/// Sole owner of the persisted token pair and profile.
///
/// The token pair is always written as a pair: the server rotates the
/// refresh token, so a half-updated session could never refresh again.
/// All writes here are synchronous, with no suspension point between the
/// individual keys, which is what "atomic" means in a cooperative runtime.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// The persisted profile. Corrupt data is discarded and reported as
    /// absent rather than surfaced - a profile is a convenience snapshot,
    /// never proof of authentication.
    pub fn profile(&self) -> Option<UserProfile> {
        let raw = self.store.get(PROFILE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Discarding corrupt persisted profile");
                self.store.remove(PROFILE_KEY);
                None
            }
        }
    }

    /// Replace the whole session: both tokens and the profile.
    pub fn set_session(&self, pair: &TokenPair, profile: &UserProfile) -> Result<()> {
        let serialized =
            serde_json::to_string(profile).context("Failed to serialize user profile")?;
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &pair.refresh_token)?;
        self.store.set(PROFILE_KEY, &serialized)?;
        Ok(())
    }

    /// Replace the token pair, preserving the profile. Used on refresh.
    pub fn set_tokens(&self, pair: &TokenPair) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &pair.refresh_token)?;
        Ok(())
    }

    /// Remove tokens and profile unconditionally.
    pub fn clear_session(&self) {
        self.store.remove(ACCESS_TOKEN_KEY);
        self.store.remove(REFRESH_TOKEN_KEY);
        self.store.remove(PROFILE_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn profile() -> UserProfile {
        UserProfile {
            id: 1,
            email: "me@example.com".to_string(),
            full_name: None,
            role: "user".to_string(),
            is_verified: true,
        }
    }

    fn session() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_set_session_stores_all_three() {
        let store = session();
        let pair = TokenPair {
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
        };

        store.set_session(&pair, &profile()).expect("set");
        assert_eq!(store.access_token().as_deref(), Some("A1"));
        assert_eq!(store.refresh_token().as_deref(), Some("R1"));
        assert_eq!(store.profile().expect("profile").email, "me@example.com");
    }

    #[test]
    fn test_set_tokens_preserves_profile() {
        let store = session();
        let pair = TokenPair {
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
        };
        store.set_session(&pair, &profile()).expect("set");

        let rotated = TokenPair {
            access_token: "A2".to_string(),
            refresh_token: "R2".to_string(),
        };
        store.set_tokens(&rotated).expect("set");

        assert_eq!(store.access_token().as_deref(), Some("A2"));
        assert_eq!(store.refresh_token().as_deref(), Some("R2"));
        assert_eq!(store.profile().expect("profile").id, 1);
    }

    #[test]
    fn test_clear_session_removes_everything() {
        let store = session();
        let pair = TokenPair {
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
        };
        store.set_session(&pair, &profile()).expect("set");

        store.clear_session();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert!(store.profile().is_none());

        // Idempotent on an already-empty session
        store.clear_session();
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn test_corrupt_profile_is_discarded() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("session.profile", "{not json").expect("set");

        let store = SessionStore::new(kv.clone());
        assert!(store.profile().is_none());
        // The bad entry is gone, not just ignored
        assert_eq!(kv.get("session.profile"), None);
    }
}
