//! Per-record field overrides loaded from a JSON file:
//!
//! ```json
//! {
//!   "logos": { "<company id>": "https://..." },
//!   "locations": { "<company id>": { "address": "...", "lat": 53.9, "lon": 27.5 } }
//! }
//! ```
//!
//! Website canonicalization always runs, with or without an override file.

use super::types::CompanyRecord;
use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationOverride {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOverrides {
    pub logos: HashMap<String, String>,
    pub locations: HashMap<String, LocationOverride>,
}

impl FieldOverrides {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Configuration(format!("cannot read overrides {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CatalogError::Configuration(format!("invalid overrides {}: {}", path.display(), e))
        })
    }

    pub fn apply(&self, record: &mut CompanyRecord) {
        if let Some(logo) = self.logos.get(&record.source_id) {
            record.logo_url = logo.trim().to_string();
        }
        if let Some(location) = self.locations.get(&record.source_id) {
            if let Some(address) = &location.address {
                record.address = address.trim().to_string();
            }
            if location.lat.is_some() && location.lon.is_some() {
                record.lat = location.lat;
                record.lon = location.lon;
            }
        }

        let mut websites: Vec<String> = Vec::new();
        for site in record.websites.iter().filter_map(|w| canonical_website(w)) {
            if !websites.contains(&site) {
                websites.push(site);
            }
        }
        record.websites = websites;
    }
}

/// Lower-cases the host, drops a trailing slash and adds `https://` when the
/// scheme is missing. Blank entries yield `None`.
pub fn canonical_website(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => ("https".to_string(), trimmed),
    };
    let (host, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    if host.is_empty() {
        return None;
    }
    Some(format!("{}://{}{}", scheme, host.to_lowercase(), path))
}
