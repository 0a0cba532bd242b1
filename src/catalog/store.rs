//! Catalog Store
//!
//! Owns the current snapshot and decides when to rebuild it. Every read first
//! compares the catalog file's modification time with the snapshot's; a
//! change triggers a rebuild.
//!
//! ## Concurrency
//! - Readers only ever see a fully built `Arc<CatalogSnapshot>`.
//! - Rebuilds are single-flight per `(path, mtime)`: the first caller loads,
//!   later callers subscribe to a `watch` channel and receive the same result.
//! - A failed rebuild keeps serving the previous snapshot. Only the first load
//!   can fail the caller.

use super::exclusion::ExclusionRegistry;
use super::overrides::FieldOverrides;
use super::snapshot::CatalogSnapshot;
use super::types::{
    CatalogOverview, CompanyDetails, CompanyKeywords, RegionSlug, RubricPage, SuggestResponse,
};
use crate::error::{CatalogError, Result};
use crate::keywords::engine::KeywordEngine;
use crate::search::engine::rank;
use crate::search::types::{SearchQuery, SearchResponse};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_path: PathBuf,
    pub overrides_path: Option<PathBuf>,
    /// Upper bound for every `limit` a caller passes.
    pub max_limit: usize,
}

impl StoreConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            overrides_path: None,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LoadKey {
    path: PathBuf,
    modified: Option<SystemTime>,
}

type LoadResult = std::result::Result<Arc<CatalogSnapshot>, Arc<str>>;
type LoadSender = Arc<watch::Sender<Option<LoadResult>>>;
type InFlightLoads = DashMap<LoadKey, LoadSender>;

/// Removes the in-flight entry even when the loading task is dropped, so
/// waiters see the channel close and retry instead of hanging.
struct InFlightLoadGuard<'a> {
    key: LoadKey,
    map: &'a InFlightLoads,
    tx: LoadSender,
    finished: bool,
}

impl<'a> InFlightLoadGuard<'a> {
    fn new(key: LoadKey, map: &'a InFlightLoads, tx: LoadSender) -> Self {
        Self {
            key,
            map,
            tx,
            finished: false,
        }
    }

    fn finish(mut self, result: LoadResult) {
        // send before removing so late subscribers still observe the result
        let _ = self.tx.send(Some(result));
        self.map.remove(&self.key);
        self.finished = true;
    }
}

impl Drop for InFlightLoadGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.map.remove(&self.key);
        }
    }
}

pub struct CatalogStore {
    config: StoreConfig,
    engine: Arc<KeywordEngine>,
    overrides: FieldOverrides,
    exclusions: Arc<dyn ExclusionRegistry>,
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
    in_flight: InFlightLoads,
}

impl CatalogStore {
    /// Builds the store and performs the first load, which must succeed.
    pub async fn init(
        config: StoreConfig,
        engine: Arc<KeywordEngine>,
        exclusions: Arc<dyn ExclusionRegistry>,
    ) -> Result<Arc<Self>> {
        let store = Self::new(config, engine, exclusions)?;
        store.snapshot().await?;
        Ok(store)
    }

    /// Builds the store without loading; the first read loads the catalog.
    pub fn new(
        config: StoreConfig,
        engine: Arc<KeywordEngine>,
        exclusions: Arc<dyn ExclusionRegistry>,
    ) -> Result<Arc<Self>> {
        let overrides = match &config.overrides_path {
            Some(path) => FieldOverrides::from_path(path)?,
            None => FieldOverrides::default(),
        };
        Ok(Arc::new(Self {
            config,
            engine,
            overrides,
            exclusions,
            current: RwLock::new(None),
            in_flight: DashMap::new(),
        }))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Last installed snapshot, without a freshness check.
    pub async fn current(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current.read().await.clone()
    }

    /// Forces a freshness check and returns the snapshot it settled on.
    pub async fn reload(&self) -> Result<Arc<CatalogSnapshot>> {
        self.snapshot().await
    }

    /// Fresh snapshot for the catalog file's current mtime.
    pub async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>> {
        let path = &self.config.data_path;
        let current = self.current().await;

        let modified = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.modified().ok(),
            Err(e) => return self.stale_or_fail(current, e.to_string()),
        };
        if let Some(snapshot) = &current
            && snapshot.modified() == modified
        {
            return Ok(snapshot.clone());
        }

        let key = LoadKey {
            path: path.clone(),
            modified,
        };
        match self.load_shared(key).await {
            Ok(snapshot) => Ok(snapshot),
            Err(reason) => self.stale_or_fail(current, reason.to_string()),
        }
    }

    fn stale_or_fail(
        &self,
        current: Option<Arc<CatalogSnapshot>>,
        reason: String,
    ) -> Result<Arc<CatalogSnapshot>> {
        match current {
            Some(snapshot) => {
                warn!(
                    "Catalog reload failed ({}), serving snapshot with {} companies",
                    reason,
                    snapshot.len()
                );
                Ok(snapshot)
            }
            None => Err(CatalogError::InitialLoad {
                path: self.config.data_path.clone(),
                reason,
            }),
        }
    }

    async fn load_shared(&self, key: LoadKey) -> LoadResult {
        loop {
            let receiver = match self.in_flight.entry(key.clone()) {
                Entry::Occupied(entry) => Some(entry.get().subscribe()),
                Entry::Vacant(entry) => {
                    let (tx, _rx) = watch::channel(None::<LoadResult>);
                    entry.insert(Arc::new(tx));
                    None
                }
            };

            let Some(mut rx) = receiver else {
                break;
            };
            debug!("Catalog load already in flight, waiting");
            loop {
                if let Some(result) = rx.borrow().as_ref() {
                    return result.clone();
                }
                if rx.changed().await.is_err() {
                    // loader dropped without a result; try to become the loader
                    break;
                }
            }
        }

        let Some(tx) = self.in_flight.get(&key).map(|entry| entry.value().clone()) else {
            return Err(Arc::from("in-flight load entry vanished"));
        };
        let guard = InFlightLoadGuard::new(key.clone(), &self.in_flight, tx);

        info!("Loading catalog from {}", key.path.display());
        let result: LoadResult = CatalogSnapshot::load(
            &key.path,
            key.modified,
            self.engine.clone(),
            &self.overrides,
            self.exclusions.as_ref(),
        )
        .await
        .map(Arc::new)
        .map_err(|e| Arc::from(e.to_string()));

        if let Ok(snapshot) = &result {
            let mut current = self.current.write().await;
            match current.as_ref() {
                Some(installed) if installed.modified() > snapshot.modified() => debug!(
                    "Catalog load for an older version finished late, keeping newer snapshot"
                ),
                _ => *current = Some(snapshot.clone()),
            }
        }
        guard.finish(result.clone());
        result
    }

    fn clamp_limit(&self, limit: usize) -> usize {
        limit.min(self.config.max_limit)
    }

    // ============================================================
    // READ OPERATIONS
    // ============================================================

    pub async fn catalog(&self, region: Option<RegionSlug>) -> Result<CatalogOverview> {
        Ok(self.snapshot().await?.catalog(region))
    }

    pub async fn rubric_companies(
        &self,
        slug: &str,
        region: Option<RegionSlug>,
        offset: usize,
        limit: usize,
    ) -> Result<RubricPage> {
        let limit = self.clamp_limit(limit);
        self.snapshot()
            .await?
            .rubric_companies(slug, region, offset, limit)
    }

    pub async fn suggest(&self, query: &str, limit: usize) -> Result<SuggestResponse> {
        let limit = self.clamp_limit(limit);
        Ok(self.snapshot().await?.suggest(query, limit))
    }

    pub async fn company(&self, id: &str) -> Result<CompanyDetails> {
        let snapshot = self.snapshot().await?;
        let record = snapshot
            .company(id)
            .ok_or_else(|| CatalogError::CompanyNotFound { id: id.to_string() })?;
        Ok(CompanyDetails {
            record: record.clone(),
            region_slug: snapshot.region_of(id),
            has_logo: snapshot.profile(id).is_some_and(|p| p.has_real_logo),
        })
    }

    pub async fn keyword_phrases(&self, id: &str) -> Result<CompanyKeywords> {
        let snapshot = self.snapshot().await?;
        let not_found = || CatalogError::CompanyNotFound { id: id.to_string() };
        let phrases = snapshot.keyword_phrases(id).ok_or_else(not_found)?;
        let tokens = snapshot.keyword_tokens(id).ok_or_else(not_found)?;
        Ok(CompanyKeywords {
            id: id.to_string(),
            phrases: phrases.as_ref().clone(),
            tokens: tokens.as_ref().clone(),
        })
    }

    /// In-process ranking over the current snapshot.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let snapshot = self.snapshot().await?;
        Ok(rank(&snapshot, query, self.config.max_limit))
    }
}
