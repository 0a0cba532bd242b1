use super::store::CatalogStore;
use super::types::{
    CatalogOverview, CompanyDetails, CompanyKeywords, RegionSlug, RubricPage, SuggestResponse,
};
use crate::error::CatalogError;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_PAGE_LIMIT: usize = 20;
const DEFAULT_SUGGEST_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct RegionParams {
    pub region: Option<RegionSlug>,
}

#[derive(Debug, Deserialize)]
pub struct RubricParams {
    pub region: Option<RegionSlug>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub companies: usize,
    pub skipped_lines: usize,
    pub excluded: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub companies: usize,
}

pub async fn handle_catalog(
    Query(params): Query<RegionParams>,
    Extension(store): Extension<Arc<CatalogStore>>,
) -> Result<Json<CatalogOverview>, CatalogError> {
    Ok(Json(store.catalog(params.region).await?))
}

pub async fn handle_rubric(
    Path(slug): Path<String>,
    Query(params): Query<RubricParams>,
    Extension(store): Extension<Arc<CatalogStore>>,
) -> Result<Json<RubricPage>, CatalogError> {
    let page = store
        .rubric_companies(
            &slug,
            params.region,
            params.offset.unwrap_or(0),
            params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;
    Ok(Json(page))
}

pub async fn handle_suggest(
    Query(params): Query<SuggestParams>,
    Extension(store): Extension<Arc<CatalogStore>>,
) -> Result<Json<SuggestResponse>, CatalogError> {
    let limit = params.limit.unwrap_or(DEFAULT_SUGGEST_LIMIT);
    Ok(Json(store.suggest(&params.q, limit).await?))
}

pub async fn handle_company(
    Path(id): Path<String>,
    Extension(store): Extension<Arc<CatalogStore>>,
) -> Result<Json<CompanyDetails>, CatalogError> {
    Ok(Json(store.company(&id).await?))
}

pub async fn handle_company_keywords(
    Path(id): Path<String>,
    Extension(store): Extension<Arc<CatalogStore>>,
) -> Result<Json<CompanyKeywords>, CatalogError> {
    Ok(Json(store.keyword_phrases(&id).await?))
}

pub async fn handle_reload(
    Extension(store): Extension<Arc<CatalogStore>>,
) -> Result<Json<ReloadResponse>, CatalogError> {
    let snapshot = store.reload().await?;
    tracing::info!("Reload requested, serving {} companies", snapshot.len());
    Ok(Json(ReloadResponse {
        companies: snapshot.len(),
        skipped_lines: snapshot.skipped_lines(),
        excluded: snapshot.excluded(),
    }))
}

/// Reports readiness without touching the catalog file.
pub async fn handle_health(
    Extension(store): Extension<Arc<CatalogStore>>,
) -> (StatusCode, Json<HealthResponse>) {
    match store.current().await {
        Some(snapshot) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                companies: snapshot.len(),
            }),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "loading".to_string(),
                companies: 0,
            }),
        ),
    }
}
