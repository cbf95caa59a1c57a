//! Core types for the legislation gateway

use legislation_cache::CacheStats;
use legislation_context::ContextStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Configuration for the gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 3005,
            cache_dir: PathBuf::from("./cache/legislation"),
            cache_ttl_secs: 7 * 24 * 60 * 60, // 7 days
        }
    }
}

/// A detail document and whether it came from the cache
#[derive(Debug, Clone)]
pub struct Fetched {
    pub payload: Value,
    pub cached: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
    pub context: ContextStatus,
}

/// `POST /cache/sweep` query
#[derive(Debug, Default, Deserialize)]
pub struct SweepQuery {
    #[serde(default)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 3005);
        assert_eq!(config.cache_dir, PathBuf::from("./cache/legislation"));
        assert_eq!(config.cache_ttl_secs, 604_800);
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            uptime_secs: 3600,
            cache: CacheStats {
                entries: 12,
                hits: 500,
                ..CacheStats::default()
            },
            context: ContextStatus {
                fallback_initialized: true,
                api_key_hint: Some("tes***".to_string()),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["uptime_secs"], 3600);
        assert_eq!(json["cache"]["hits"], 500);
        assert_eq!(json["context"]["api_key_hint"], "tes***");
    }
}
