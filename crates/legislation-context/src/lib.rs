//! Calling-context resolution for legislation API tools
//!
//! Some transports hand each call a request-scoped context, others hand it
//! nothing. [`ContextResolver`] hides the difference: a usable scoped context
//! is returned as-is, otherwise the resolver's fallback context is returned,
//! constructed exactly once on first use.

mod context;
mod error;
mod resolver;

pub use context::{LegislationContext, UpstreamContext};
pub use error::{ContextError, Result};
pub use resolver::{ContextRequest, ContextResolver, ContextStatus};
