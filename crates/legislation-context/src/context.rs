use async_trait::async_trait;
use legislation_client::{ApiConfig, ClientError, LegislationClient, Params};
use serde_json::Value;

use crate::error::Result;

/// What a tool needs from its calling context: the two upstream calls.
#[async_trait]
pub trait UpstreamContext: Send + Sync + 'static {
    /// Whether this context can actually serve calls
    fn is_ready(&self) -> bool;

    /// Masked credential, safe to show in health output
    fn key_hint(&self) -> Option<String> {
        None
    }

    async fn search(
        &self,
        target: &str,
        params: &Params,
    ) -> std::result::Result<Value, ClientError>;

    async fn service(
        &self,
        target: &str,
        params: &Params,
    ) -> std::result::Result<Value, ClientError>;
}

/// Context backed by the real legislation API. Read-only once built.
pub struct LegislationContext {
    client: LegislationClient,
}

impl LegislationContext {
    pub fn from_config(config: ApiConfig) -> Result<Self> {
        let client = LegislationClient::new(config)?;
        Ok(Self { client })
    }

    /// Build from `LEGISLATION_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(ApiConfig::from_env()?)
    }
}

#[async_trait]
impl UpstreamContext for LegislationContext {
    fn is_ready(&self) -> bool {
        !self.client.config().api_key.trim().is_empty()
    }

    fn key_hint(&self) -> Option<String> {
        Some(self.client.config().api_key_hint())
    }

    async fn search(
        &self,
        target: &str,
        params: &Params,
    ) -> std::result::Result<Value, ClientError> {
        self.client.search(target, params).await
    }

    async fn service(
        &self,
        target: &str,
        params: &Params,
    ) -> std::result::Result<Value, ClientError> {
        self.client.service(target, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_readiness_follows_key() {
        let ctx = LegislationContext::from_config(ApiConfig::new("testkey")).unwrap();
        assert!(ctx.is_ready());

        let blank = LegislationContext::from_config(ApiConfig::new(" ")).unwrap();
        assert!(!blank.is_ready());
    }
}
