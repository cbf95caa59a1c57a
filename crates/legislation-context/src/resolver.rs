use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::context::{LegislationContext, UpstreamContext};
use crate::error::{ContextError, Result};

type Factory<C> = Box<dyn Fn() -> Result<C> + Send + Sync>;

/// How a call wants its context supplied
pub enum ContextRequest<C> {
    /// The transport injected a usable context for this call
    Scoped(Arc<C>),
    /// Nothing usable was injected
    UseFallback,
}

impl<C: UpstreamContext> ContextRequest<C> {
    /// Classify whatever the transport handed over
    pub fn from_option(scoped: Option<Arc<C>>) -> Self {
        match scoped {
            Some(ctx) if ctx.is_ready() => Self::Scoped(ctx),
            _ => Self::UseFallback,
        }
    }
}

impl<C> Clone for ContextRequest<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Scoped(ctx) => Self::Scoped(ctx.clone()),
            Self::UseFallback => Self::UseFallback,
        }
    }
}

impl<C> std::fmt::Debug for ContextRequest<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scoped(_) => f.write_str("Scoped"),
            Self::UseFallback => f.write_str("UseFallback"),
        }
    }
}

/// Fallback context state, for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct ContextStatus {
    pub fallback_initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_hint: Option<String>,
}

/// Hands every tool call a context, building the fallback at most once
pub struct ContextResolver<C> {
    fallback: OnceCell<Arc<C>>,
    factory: Factory<C>,
}

impl<C: UpstreamContext> ContextResolver<C> {
    pub fn new(factory: impl Fn() -> Result<C> + Send + Sync + 'static) -> Self {
        Self {
            fallback: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// Pick the context for one call. `tool_name` is only logged.
    pub async fn resolve(&self, request: ContextRequest<C>, tool_name: &str) -> Result<Arc<C>> {
        match request {
            ContextRequest::Scoped(ctx) => {
                debug!(tool = tool_name, source = "scoped", "Resolved tool context");
                Ok(ctx)
            }
            ContextRequest::UseFallback => {
                let ctx = self.fallback().await.inspect_err(|e| {
                    error!(tool = tool_name, error = %e, "No usable context for tool call");
                })?;
                debug!(tool = tool_name, source = "fallback", "Resolved tool context");
                Ok(ctx)
            }
        }
    }

    /// Shorthand for `resolve(ContextRequest::from_option(scoped), ..)`
    pub async fn resolve_optional(
        &self,
        scoped: Option<Arc<C>>,
        tool_name: &str,
    ) -> Result<Arc<C>> {
        self.resolve(ContextRequest::from_option(scoped), tool_name).await
    }

    /// The fallback context, constructed on first call.
    ///
    /// Concurrent first callers wait, without blocking the runtime, for a
    /// single construction. A failed construction is not remembered; the
    /// next call tries again.
    pub async fn fallback(&self) -> Result<Arc<C>> {
        self.fallback
            .get_or_try_init(|| async {
                let ctx = (self.factory)()?;
                if !ctx.is_ready() {
                    return Err(ContextError::Configuration(
                        "fallback context is not usable".to_string(),
                    ));
                }
                info!("Fallback legislation context initialized");
                Ok(Arc::new(ctx))
            }).await
            .cloned()
    }

    pub fn is_fallback_initialized(&self) -> bool {
        self.fallback.initialized()
    }

    /// Never triggers construction
    pub fn status(&self) -> ContextStatus {
        ContextStatus {
            fallback_initialized: self.is_fallback_initialized(),
            api_key_hint: self.fallback.get().and_then(|ctx| ctx.key_hint()),
        }
    }
}

impl ContextResolver<LegislationContext> {
    /// Resolver whose fallback is built from `LEGISLATION_*` variables
    pub fn from_env() -> Self {
        Self::new(LegislationContext::from_env)
    }
}
