use super::accelerated::SearchService;
use super::types::{SearchQuery, SearchResponse};
use crate::error::CatalogError;
use axum::extract::Query;
use axum::{Extension, Json};
use std::sync::Arc;

pub async fn handle_search(
    Query(query): Query<SearchQuery>,
    Extension(service): Extension<Arc<SearchService>>,
) -> Result<Json<SearchResponse>, CatalogError> {
    let response = service.search(&query).await?;
    tracing::debug!(
        "Search served by {:?}: {} of {} results",
        response.backend,
        response.count,
        response.total_count
    );
    Ok(Json(response))
}
