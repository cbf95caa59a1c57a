//! The tool call path: resolve context, consult the cache, call upstream

use crate::error::ToolError;
use crate::types::Fetched;
use legislation_cache::EntryStore;
use legislation_client::{clean::clean_value, Params};
use legislation_context::{ContextResolver, UpstreamContext};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs tool calls against whichever context the caller ends up with
pub struct ToolRunner<C> {
    resolver: ContextResolver<C>,
    cache: Arc<dyn EntryStore>,
}

impl<C: UpstreamContext> ToolRunner<C> {
    pub fn new(resolver: ContextResolver<C>, cache: Arc<dyn EntryStore>) -> Self {
        Self { resolver, cache }
    }

    pub fn resolver(&self) -> &ContextResolver<C> {
        &self.resolver
    }

    /// Search a category. Listings are not cached; markup is stripped.
    pub async fn search(
        &self,
        scoped: Option<Arc<C>>,
        tool_name: &str,
        target: &str,
        params: &Params,
    ) -> Result<Value, ToolError> {
        let ctx = self.resolver.resolve_optional(scoped, tool_name).await?;
        let data = ctx.search(target, params).await?;
        Ok(clean_value(data))
    }

    /// Fetch one document, going through the cache.
    ///
    /// Cache failures never fail the call: a broken cache behaves like an
    /// empty one.
    pub async fn fetch_detail(
        &self,
        scoped: Option<Arc<C>>,
        tool_name: &str,
        item_type: &str,
        item_id: &str,
        target: &str,
        params: &Params,
    ) -> Result<Fetched, ToolError> {
        let ctx = self.resolver.resolve_optional(scoped, tool_name).await?;

        if let Some(payload) = self.cache.get(item_type, item_id).await {
            debug!(tool = tool_name, item_type, item_id, "Serving detail from cache");
            return Ok(Fetched {
                payload,
                cached: true,
            });
        }

        let payload = ctx.service(target, params).await?;

        if let Err(e) = self.cache.put(item_type, item_id, &payload).await {
            warn!(tool = tool_name, item_type, item_id, error = %e, "Failed to cache detail");
        }

        Ok(Fetched {
            payload,
            cached: false,
        })
    }

    /// Fetch one document without touching the cache
    pub async fn fetch_uncached(
        &self,
        scoped: Option<Arc<C>>,
        tool_name: &str,
        target: &str,
        params: &Params,
    ) -> Result<Value, ToolError> {
        let ctx = self.resolver.resolve_optional(scoped, tool_name).await?;
        Ok(ctx.service(target, params).await?)
    }
}
