//! Shared domain types.

use serde::{Deserialize, Serialize};

/// Access and refresh token, always replaced together.
///
/// The server rotates the refresh token on every refresh, so storing one
/// half of a new pair next to the other half of an old pair would leave the
/// client unable to refresh again. `SessionStore` is the only writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Identity snapshot returned by the login endpoint.
///
/// Presence of a profile does not imply a usable token; consumers check
/// token freshness through the lifecycle manager instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_verified: bool,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

/// One entry of the clinical assessment catalog (PHQ-9, GAD-7, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssessmentDefinition {
    pub id: i64,
    /// Short stable code, e.g. "phq9"
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub question_count: u32,
}

/// Row of the admin document listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminDocument {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Platform usage counters shown on the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageStats {
    #[serde(default)]
    pub active_users: u64,
    #[serde(default)]
    pub sessions_today: u64,
    #[serde(default)]
    pub assessments_completed: u64,
}
