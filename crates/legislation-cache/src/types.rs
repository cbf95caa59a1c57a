//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contents of an entry's `metadata.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheMetadata {
    /// Whether the entry is past its expiry at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Per-type totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    pub count: usize,
    pub size: u64,
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub expired: usize,
    /// Live entries expiring within the next seven days
    pub expiring_soon: usize,
    pub by_type: BTreeMap<String, TypeStats>,
    pub hits: u64,
    pub misses: u64,
}

/// Outcome of a sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub dry_run: bool,
    /// Directory names of expired entries removed (or that would be)
    pub expired: Vec<String>,
    /// Entry directories without readable metadata, plus stale staging leftovers
    pub orphaned: Vec<String>,
    /// Entries or leftovers that could not be inspected or removed
    #[serde(default)]
    pub failed: Vec<String>,
    pub bytes_freed: u64,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired.len() + self.orphaned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert!(stats.by_type.is_empty());
    }

    #[test]
    fn test_metadata_uses_type_field_name() {
        let cached_at = Utc::now();
        let metadata = CacheMetadata {
            id: "011357".to_string(),
            item_type: "law".to_string(),
            cached_at,
            expires_at: cached_at + TimeDelta::days(7),
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["id"], "011357");
        assert_eq!(json["type"], "law");
        assert!(json["expires_at"].is_string());

        let back: CacheMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn test_is_expired_is_strict() {
        let cached_at = Utc::now();
        let metadata = CacheMetadata {
            id: "1".to_string(),
            item_type: "precedent".to_string(),
            cached_at,
            expires_at: cached_at + TimeDelta::seconds(10),
        };

        assert!(!metadata.is_expired(cached_at));
        assert!(!metadata.is_expired(metadata.expires_at));
        assert!(metadata.is_expired(metadata.expires_at + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn test_sweep_report_removed_counts_both_kinds() {
        let report = SweepReport {
            dry_run: false,
            expired: vec!["law_1".to_string(), "law_2".to_string()],
            orphaned: vec!["precedent_9".to_string()],
            failed: vec!["law_3".to_string()],
            bytes_freed: 120,
        };
        assert_eq!(report.removed(), 3);
    }
}
