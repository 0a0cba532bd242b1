//! Accelerated Search Collaborator
//!
//! An optional external full-text engine answers queries first. Its answer is
//! a ranked list of company ids, which are hydrated from the current snapshot
//! so excluded or unknown ids never surface. On error, timeout, an answer
//! with no known id, or a full page without a match total, the in-process
//! ranking engine takes over.

use super::engine::{DEFAULT_LIMIT, has_signal, rank};
use super::types::{SearchBackend, SearchQuery, SearchResponse, SearchResultItem};
use crate::catalog::snapshot::CatalogSnapshot;
use crate::catalog::store::CatalogStore;
use crate::catalog::types::CompanySummary;
use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(800);

/// One answer of the accelerated engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceleratedHits {
    /// Ranked company ids, best first, at most the requested limit.
    pub ids: Vec<String>,
    /// Number of matches the engine found in total, when it reports one.
    pub total: Option<usize>,
}

#[async_trait]
pub trait AcceleratedSearch: std::fmt::Debug + Send + Sync {
    async fn search(&self, query: &SearchQuery, limit: usize) -> Result<AcceleratedHits>;
}

#[derive(Debug, Serialize)]
struct EngineRequest<'a> {
    name: &'a str,
    service: &'a str,
    city: &'a str,
    region: Option<&'a str>,
    rubric: Option<&'a str>,
    category: Option<&'a str>,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct EngineHit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct EngineResponse {
    #[serde(default)]
    hits: Vec<EngineHit>,
    #[serde(default)]
    total: Option<usize>,
}

/// JSON-over-HTTP engine: `POST {base_url}/search` answering
/// `{"hits": [{"id": ...}], "total": ...}`; `total` is optional.
#[derive(Debug, Clone)]
pub struct HttpSearchEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchEngine {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Configuration(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AcceleratedSearch for HttpSearchEngine {
    async fn search(&self, query: &SearchQuery, limit: usize) -> Result<AcceleratedHits> {
        let body = EngineRequest {
            name: &query.name,
            service: &query.service,
            city: &query.city,
            region: query.region.map(|r| r.as_str()),
            rubric: query.rubric.as_deref(),
            category: query.category.as_deref(),
            limit,
        };
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CatalogError::AcceleratedSearch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CatalogError::AcceleratedSearch(format!(
                "{} answered {}",
                url,
                response.status()
            )));
        }
        let parsed: EngineResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::AcceleratedSearch(e.to_string()))?;
        Ok(AcceleratedHits {
            ids: parsed.hits.into_iter().map(|hit| hit.id).collect(),
            total: parsed.total,
        })
    }
}

/// Search entry point used by the HTTP layer.
pub struct SearchService {
    store: Arc<CatalogStore>,
    accelerated: Option<Arc<dyn AcceleratedSearch>>,
    timeout: Duration,
}

impl SearchService {
    pub fn new(store: Arc<CatalogStore>) -> Self {
        Self {
            store,
            accelerated: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_accelerated(mut self, engine: Arc<dyn AcceleratedSearch>, timeout: Duration) -> Self {
        self.accelerated = Some(engine);
        self.timeout = timeout;
        self
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let snapshot = self.store.snapshot().await?;
        if !has_signal(query, snapshot.lexicon()) {
            return Ok(SearchResponse::empty(query, SearchBackend::Ranking));
        }
        let max_limit = self.store.config().max_limit;

        if let Some(engine) = &self.accelerated {
            let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(max_limit);
            let window = query.offset.saturating_add(limit);

            match tokio::time::timeout(self.timeout, engine.search(query, window)).await {
                Ok(Ok(hits)) => {
                    if let Some(response) = hydrate(&snapshot, query, hits, window, limit) {
                        return Ok(response);
                    }
                }
                Ok(Err(e)) => warn!("{}, ranking in-process", e),
                Err(_) => warn!(
                    "{}, ranking in-process",
                    CatalogError::Timeout {
                        elapsed: self.timeout
                    }
                ),
            }
        }

        Ok(rank(&snapshot, query, max_limit))
    }
}

/// Turns engine ids into a response page, or `None` when the in-process
/// ranking has to answer instead: no returned id is known, or the engine
/// filled the whole window without reporting how many matches exist.
fn hydrate(
    snapshot: &CatalogSnapshot,
    query: &SearchQuery,
    hits: AcceleratedHits,
    window: usize,
    limit: usize,
) -> Option<SearchResponse> {
    let returned = hits.ids.len();
    let known: Vec<&CompanySummary> = hits
        .ids
        .iter()
        .filter_map(|id| snapshot.summary(id))
        .collect();
    if known.is_empty() {
        debug!("Accelerated engine returned no known companies, ranking in-process");
        return None;
    }
    let unknown = returned - known.len();
    let total_count = match hits.total {
        Some(total) => total.saturating_sub(unknown).max(known.len()),
        None if returned < window => known.len(),
        None => {
            debug!("Accelerated engine filled the page window without a total, ranking in-process");
            return None;
        }
    };

    let results: Vec<SearchResultItem> = known
        .into_iter()
        .enumerate()
        .skip(query.offset)
        .take(limit)
        .map(|(position, summary)| SearchResultItem {
            company: summary.clone(),
            score: u32::try_from(window.saturating_sub(position)).unwrap_or(u32::MAX),
        })
        .collect();
    Some(SearchResponse {
        name: query.name.clone(),
        service: query.service.clone(),
        filters: query.filters(),
        backend: SearchBackend::Accelerated,
        total_count,
        count: results.len(),
        offset: query.offset,
        results,
    })
}
