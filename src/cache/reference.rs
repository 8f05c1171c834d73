//! Typed cache facade for the platform's reference data.
//!
//! Gives each data class a named accessor and its TTL policy, keeping the
//! generic cache engine free of domain knowledge. The reference catalog and
//! the admin listings live under disjoint prefixes, so clearing one side
//! never touches the other.

use std::sync::Arc;

use anyhow::Result;

use crate::config::{
    ADMIN_LISTING_TTL_MS, ASSESSMENT_CATALOG_TTL_MS, RECENT_ITEMS_TTL_MS, USAGE_STATS_TTL_MS,
};
use crate::models::{AdminDocument, AssessmentDefinition, UsageStats};
use crate::store::KeyValueStore;

use super::recent::{RecencyList, DEFAULT_RECENT_CAP};
use super::ttl::{CacheStats, TtlCache};

const REFERENCE_PREFIX: &str = "cache.reference";
const ADMIN_PREFIX: &str = "cache.admin";

const ASSESSMENTS_NS: &str = "assessments";
const DOCUMENTS_NS: &str = "documents";
const STATS_NS: &str = "usage_stats";
const RECENT_NS: &str = "recent_assessments";

pub struct ReferenceCache {
    reference: TtlCache,
    admin: TtlCache,
    recent: RecencyList<AssessmentDefinition>,
}

impl ReferenceCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let reference = TtlCache::new(store.clone(), REFERENCE_PREFIX);
        let admin = TtlCache::new(store, ADMIN_PREFIX);
        let recent = RecencyList::new(
            reference.clone(),
            RECENT_NS,
            DEFAULT_RECENT_CAP,
            RECENT_ITEMS_TTL_MS,
        );
        Self {
            reference,
            admin,
            recent,
        }
    }

    // ===== Assessment catalog =====

    pub fn assessment_catalog(&self) -> Option<Vec<AssessmentDefinition>> {
        self.reference.get(ASSESSMENTS_NS)
    }

    pub fn store_assessment_catalog(&self, catalog: &[AssessmentDefinition]) -> Result<()> {
        self.reference
            .set(ASSESSMENTS_NS, &catalog, ASSESSMENT_CATALOG_TTL_MS)
    }

    // ===== Admin document listings (paged) =====

    pub fn admin_documents(&self, page: u32) -> Option<Vec<AdminDocument>> {
        self.admin.get_with(DOCUMENTS_NS, &page)
    }

    pub fn store_admin_documents(&self, page: u32, documents: &[AdminDocument]) -> Result<()> {
        self.admin
            .set_with(DOCUMENTS_NS, &documents, ADMIN_LISTING_TTL_MS, &page)
    }

    // ===== Usage stats =====

    pub fn usage_stats(&self) -> Option<UsageStats> {
        self.reference.get(STATS_NS)
    }

    pub fn store_usage_stats(&self, stats: &UsageStats) -> Result<()> {
        self.reference.set(STATS_NS, stats, USAGE_STATS_TTL_MS)
    }

    // ===== Recently opened assessments =====

    pub fn touch_recent_assessment(&self, definition: AssessmentDefinition) -> Result<()> {
        let key = definition.code.clone();
        self.recent.touch(&key, definition)
    }

    pub fn recent_assessments(&self) -> Vec<AssessmentDefinition> {
        self.recent.list()
    }

    // ===== Maintenance =====

    /// Drop admin listings only; reference data is untouched.
    pub fn clear_admin(&self) {
        self.admin.clear(None);
    }

    /// Drop everything, both prefixes.
    pub fn clear_all(&self) {
        self.reference.clear(None);
        self.admin.clear(None);
    }

    pub fn stats(&self) -> CacheStats {
        let reference = self.reference.stats();
        let admin = self.admin.stats();
        CacheStats {
            total_entries: reference.total_entries + admin.total_entries,
            valid_entries: reference.valid_entries + admin.valid_entries,
            approximate_size_bytes: reference.approximate_size_bytes
                + admin.approximate_size_bytes,
        }
    }
}
