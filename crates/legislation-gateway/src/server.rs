//! HTTP server for gateway endpoints
//!
//! Provides /health, /search/{target}, /service/{target}/{id}, and cache
//! maintenance endpoints. A request may carry its own context as an
//! `Extension<Arc<C>>`; otherwise the resolver's fallback context is used.

use crate::error::ToolError;
use crate::tools::ToolRunner;
use crate::types::{HealthResponse, SweepQuery};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use legislation_cache::{CacheStats, SweepReport, TtlCache};
use legislation_client::Params;
use legislation_context::{ContextResolver, LegislationContext, UpstreamContext};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Query parameter choosing which id parameter a detail call uses
const ID_PARAM_SELECTOR: &str = "by";

/// Shared state for the HTTP server
pub struct ServerState<C> {
    pub tools: ToolRunner<C>,
    pub cache: Arc<TtlCache>,
    pub started_at: DateTime<Utc>,
}

impl<C: UpstreamContext> ServerState<C> {
    pub fn new(resolver: ContextResolver<C>, cache: Arc<TtlCache>) -> Self {
        Self {
            tools: ToolRunner::new(resolver, cache.clone()),
            cache,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState<C = LegislationContext> = Arc<ServerState<C>>;

/// Create the HTTP router
pub fn create_router<C: UpstreamContext>(state: SharedState<C>) -> Router {
    Router::new()
        .route("/health", get(health::<C>))
        .route("/search/{target}", get(search::<C>))
        .route("/service/{target}/{id}", get(service::<C>))
        .route("/cache/stats", get(cache_stats::<C>))
        .route("/cache/sweep", post(sweep::<C>))
        .route("/cache/{item_type}/{item_id}", delete(invalidate::<C>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health<C: UpstreamContext>(State(state): State<SharedState<C>>) -> Json<HealthResponse> {
    let cache_stats = state.cache.stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: cache_stats,
        context: state.tools.resolver().status(),
    })
}

/// Search a category (`lawSearch.do`)
async fn search<C: UpstreamContext>(
    State(state): State<SharedState<C>>,
    scoped: Option<Extension<Arc<C>>>,
    Path(target): Path<String>,
    Query(params): Query<Params>,
) -> Result<Json<serde_json::Value>, ToolError> {
    let tool_name = format!("search_{}", target);
    let data = state
        .tools
        .search(scoped.map(|Extension(ctx)| ctx), &tool_name, &target, &params)
        .await?;
    Ok(Json(data))
}

/// Fetch a single document (`lawService.do`).
///
/// Only plain lookups are cached: extra parameters such as an article filter
/// change the response and go straight upstream.
async fn service<C: UpstreamContext>(
    State(state): State<SharedState<C>>,
    scoped: Option<Extension<Arc<C>>>,
    Path((target, id)): Path<(String, String)>,
    Query(mut params): Query<Params>,
) -> Result<Response, ToolError> {
    let id_param = match params.remove(ID_PARAM_SELECTOR).as_deref() {
        None | Some("ID") | Some("id") => "ID",
        Some("MST") | Some("mst") => "MST",
        Some(other) => {
            return Err(ToolError::BadRequest(format!(
                "unsupported id parameter: {}",
                other
            )))
        }
    };
    if target.is_empty() || !target.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ToolError::BadRequest(format!("invalid target: {}", target)));
    }
    let tool_name = format!("get_{}_detail", target);
    let scoped = scoped.map(|Extension(ctx)| ctx);

    if !params.is_empty() {
        params.insert(id_param.to_string(), id);
        let data = state
            .tools
            .fetch_uncached(scoped, &tool_name, &target, &params)
            .await?;
        return Ok(([("X-Cache", "BYPASS")], Json(data)).into_response());
    }

    // Targets are alphanumeric, so `@` keeps MST keys apart from ID keys
    let item_type = if id_param == "ID" {
        target.clone()
    } else {
        format!("{}@{}", target, id_param)
    };
    let item_id = id.clone();
    params.insert(id_param.to_string(), id);

    let fetched = state
        .tools
        .fetch_detail(scoped, &tool_name, &item_type, &item_id, &target, &params)
        .await?;
    let cache_header = if fetched.cached { "HIT" } else { "MISS" };

    Ok(([("X-Cache", cache_header)], Json(fetched.payload)).into_response())
}

async fn cache_stats<C: UpstreamContext>(State(state): State<SharedState<C>>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// Remove expired entries (`?dry_run=true` only reports them)
async fn sweep<C: UpstreamContext>(
    State(state): State<SharedState<C>>,
    Query(query): Query<SweepQuery>,
) -> Result<Json<SweepReport>, ToolError> {
    let report = if query.dry_run {
        state.cache.sweep_dry_run().await?
    } else {
        state.cache.sweep().await?
    };
    Ok(Json(report))
}

async fn invalidate<C: UpstreamContext>(
    State(state): State<SharedState<C>>,
    Path((item_type, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ToolError> {
    state.cache.invalidate(&item_type, &item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
