//! Legislation Gateway - cached HTTP front for the Korean legislation open API
//!
//! Serves search and document lookups from law.go.kr. Document lookups are
//! kept in a file cache for a week so repeated reads skip the upstream API.

mod error;
mod server;
#[cfg(test)]
mod test_support;
mod tools;
mod types;

use crate::error::{GatewayError, Result};
use crate::server::{start_server, ServerState, SharedState};
use crate::types::GatewayConfig;
use chrono::{TimeDelta, Utc};
use legislation_cache::TtlCache;
use legislation_context::ContextResolver;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("legislation_gateway=info".parse()?)
        .add_directive("legislation_cache=info".parse()?)
        .add_directive("legislation_context=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Legislation Gateway...");

    let config = load_config(|key| std::env::var(key).ok())?;
    info!("Port: {}", config.port);
    info!("Cache dir: {:?}", config.cache_dir);
    info!("Cache TTL: {} seconds", config.cache_ttl_secs);

    let cache = Arc::new(TtlCache::with_ttl(
        config.cache_dir,
        Duration::from_secs(config.cache_ttl_secs),
    ));
    cache.init().await?;

    // A missing API key should not keep the server down: requests may bring
    // their own context, and the fallback is retried on every call.
    let resolver = ContextResolver::from_env();
    if let Err(e) = resolver.fallback().await {
        warn!(error = %e, "Fallback context unavailable, tool calls need a scoped context");
    }

    let state: SharedState = Arc::new(ServerState::new(resolver, cache));

    // Start HTTP server (blocking)
    start_server(state, config.port).await
        .map_err(|e| GatewayError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

fn load_config(lookup: impl Fn(&str) -> Option<String>) -> Result<GatewayConfig> {
    let defaults = GatewayConfig::default();

    let port = lookup("PORT")
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(defaults.port);

    let cache_dir = lookup("CACHE_DIR")
        .map(PathBuf::from)
        .or_else(|| {
            lookup("HOME").map(|home| PathBuf::from(home).join(".cache/legislation-gateway"))
        })
        .unwrap_or(defaults.cache_dir);

    let cache_ttl_secs = lookup("CACHE_TTL_SECS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.cache_ttl_secs);
    if cache_ttl_secs == 0 {
        return Err(GatewayError::Config(
            "CACHE_TTL_SECS must be greater than zero".to_string(),
        ));
    }
    let representable = TimeDelta::from_std(Duration::from_secs(cache_ttl_secs))
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .is_some();
    if !representable {
        return Err(GatewayError::Config(format!(
            "CACHE_TTL_SECS is too large: {}",
            cache_ttl_secs
        )));
    }

    Ok(GatewayConfig {
        port,
        cache_dir,
        cache_ttl_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 3005);
        assert_eq!(config.cache_dir, PathBuf::from("./cache/legislation"));
        assert_eq!(config.cache_ttl_secs, 604_800);
    }

    #[test]
    fn test_load_config_home_cache_dir() {
        let config = load_config(lookup_from(&[("HOME", "/home/lawyer")])).unwrap();
        assert_eq!(
            config.cache_dir,
            PathBuf::from("/home/lawyer/.cache/legislation-gateway")
        );
    }

    #[test]
    fn test_load_config_overrides() {
        let config = load_config(lookup_from(&[
            ("PORT", "8080"),
            ("CACHE_DIR", "/var/cache/law"),
            ("CACHE_TTL_SECS", "3600"),
            ("HOME", "/home/lawyer"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/law"));
        assert_eq!(config.cache_ttl_secs, 3600);
    }

    #[test]
    fn test_load_config_ignores_unparseable_port() {
        let config = load_config(lookup_from(&[("PORT", "eighty")])).unwrap();
        assert_eq!(config.port, 3005);
    }

    #[test]
    fn test_load_config_rejects_zero_ttl() {
        let result = load_config(lookup_from(&[("CACHE_TTL_SECS", "0")]));
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_load_config_rejects_unrepresentable_ttl() {
        let result = load_config(lookup_from(&[("CACHE_TTL_SECS", "18446744073709551615")]));
        assert!(matches!(result, Err(GatewayError::Config(_))));

        // Ten thousand years fits
        let config = load_config(lookup_from(&[("CACHE_TTL_SECS", "315360000000")])).unwrap();
        assert_eq!(config.cache_ttl_secs, 315_360_000_000);
    }
}
