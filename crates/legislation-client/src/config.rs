use std::env;
use std::time::Duration;

use crate::error::{ClientError, Result};

pub const DEFAULT_SEARCH_URL: &str = "http://www.law.go.kr/DRF/lawSearch.do";
pub const DEFAULT_SERVICE_URL: &str = "http://www.law.go.kr/DRF/lawService.do";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Upstream API settings
#[derive(Clone)]
pub struct ApiConfig {
    /// Institution code sent as `OC`
    pub api_key: String,
    pub search_base_url: String,
    pub service_base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Settings for the public endpoints with the given key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            search_base_url: DEFAULT_SEARCH_URL.to_string(),
            service_base_url: DEFAULT_SERVICE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Parse settings from `LEGISLATION_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse settings through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("LEGISLATION_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ClientError::Config("LEGISLATION_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);

        if let Some(url) = lookup("LEGISLATION_SEARCH_URL") {
            config.search_base_url = url;
        }
        if let Some(url) = lookup("LEGISLATION_SERVICE_URL") {
            config.service_base_url = url;
        }
        if let Some(secs) = lookup("LEGISLATION_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|_| {
                ClientError::Config(format!("LEGISLATION_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// The key with all but its first three characters masked
    pub fn api_key_hint(&self) -> String {
        let prefix: String = self.api_key.chars().take(3).collect();
        format!("{prefix}***")
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &self.api_key_hint())
            .field("search_base_url", &self.search_base_url)
            .field("service_base_url", &self.service_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
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
    fn test_defaults_with_key_only() {
        let config =
            ApiConfig::from_lookup(lookup_from(&[("LEGISLATION_API_KEY", "test")])).unwrap();
        assert_eq!(config.api_key, "test");
        assert_eq!(config.search_base_url, DEFAULT_SEARCH_URL);
        assert_eq!(config.service_base_url, DEFAULT_SERVICE_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let result = ApiConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ClientError::Config(_))));

        let result = ApiConfig::from_lookup(lookup_from(&[("LEGISLATION_API_KEY", "   ")]));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("LEGISLATION_API_KEY", "abc"),
            ("LEGISLATION_SEARCH_URL", "http://localhost:9000/search"),
            ("LEGISLATION_SERVICE_URL", "http://localhost:9000/service"),
            ("LEGISLATION_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.search_base_url, "http://localhost:9000/search");
        assert_eq!(config.service_base_url, "http://localhost:9000/service");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_bad_timeout() {
        let result = ApiConfig::from_lookup(lookup_from(&[
            ("LEGISLATION_API_KEY", "abc"),
            ("LEGISLATION_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_key_is_masked() {
        let config = ApiConfig::new("secretkey");
        assert_eq!(config.api_key_hint(), "sec***");
        assert!(!format!("{:?}", config).contains("secretkey"));
        assert_eq!(ApiConfig::new("ab").api_key_hint(), "ab***");
    }
}
