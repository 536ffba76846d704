//! Knowledge and health handlers.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use grchub_protocol::Category;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::knowledge::{KnowledgeEntry, KnowledgeStats};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Query parameters for listing knowledge entries.
#[derive(Debug, Deserialize)]
pub struct KnowledgeQuery {
    /// Filter by category; absent means all categories.
    pub category: Option<String>,
}

/// Parse a category query value, surfacing unknown values as 400s with the
/// offending value named (serde would reject them too, but with a less
/// useful message).
fn parse_category(raw: Option<&str>) -> ApiResult<Option<Category>> {
    match raw {
        None => Ok(None),
        Some(raw) => Category::from_str(raw)
            .map(Some)
            .map_err(ApiError::bad_request),
    }
}

/// List knowledge entries, optionally filtered by category.
///
/// GET /api/knowledge?category=risks
pub async fn list_knowledge(
    State(state): State<AppState>,
    Query(query): Query<KnowledgeQuery>,
) -> ApiResult<Json<Vec<KnowledgeEntry>>> {
    let category = parse_category(query.category.as_deref())?;

    let entries: Vec<KnowledgeEntry> = match category {
        Some(category) => state
            .store
            .by_category(category)
            .into_iter()
            .cloned()
            .collect(),
        None => state.store.all().to_vec(),
    };

    debug!(count = entries.len(), category = ?category, "Listed knowledge entries");
    Ok(Json(entries))
}

/// Query parameters for knowledge search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Substring search across the knowledge base.
///
/// GET /api/knowledge/search?q=gdpr
pub async fn search_knowledge(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<KnowledgeEntry>> {
    let entries: Vec<KnowledgeEntry> =
        state.store.search(&query.q).into_iter().cloned().collect();
    debug!(query = %query.q, count = entries.len(), "Searched knowledge base");
    Json(entries)
}

/// Aggregate counts for the dashboard stat cards.
///
/// GET /api/knowledge/stats
pub async fn knowledge_stats(State(state): State<AppState>) -> Json<KnowledgeStats> {
    Json(state.store.stats())
}

/// Fetch a single entry by id.
///
/// GET /api/knowledge/{id}
pub async fn get_knowledge_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<KnowledgeEntry>> {
    state
        .store
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Knowledge entry {} not found", id)))
}
