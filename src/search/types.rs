use crate::catalog::types::{CompanySummary, RegionSlug};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query surface shared by the ranking engine and the accelerated engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    /// Free-text company name.
    pub name: String,
    /// Free-text service or product.
    pub service: String,
    pub city: String,
    pub region: Option<RegionSlug>,
    pub rubric: Option<String>,
    pub category: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Non-empty filters, echoed back in the response.
    pub fn filters(&self) -> BTreeMap<String, String> {
        let mut filters = BTreeMap::new();
        if !self.city.trim().is_empty() {
            filters.insert("city".to_string(), self.city.trim().to_string());
        }
        if let Some(region) = self.region {
            filters.insert("region".to_string(), region.to_string());
        }
        if let Some(rubric) = &self.rubric {
            filters.insert("rubric".to_string(), rubric.clone());
        }
        if let Some(category) = &self.category {
            filters.insert("category".to_string(), category.clone());
        }
        filters
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    Ranking,
    Accelerated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    #[serde(flatten)]
    pub company: CompanySummary,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub name: String,
    pub service: String,
    pub filters: BTreeMap<String, String>,
    pub backend: SearchBackend,
    pub total_count: usize,
    pub count: usize,
    pub offset: usize,
    pub results: Vec<SearchResultItem>,
}

impl SearchResponse {
    pub fn empty(query: &SearchQuery, backend: SearchBackend) -> Self {
        Self {
            name: query.name.clone(),
            service: query.service.clone(),
            filters: query.filters(),
            backend,
            total_count: 0,
            count: 0,
            offset: query.offset,
            results: Vec::new(),
        }
    }
}
