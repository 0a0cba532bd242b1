use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;

/// Decides which companies must never be served. Excluded records are dropped
/// while a snapshot is built, so no read path can surface them.
#[async_trait]
pub trait ExclusionRegistry: std::fmt::Debug + Send + Sync {
    async fn is_excluded(&self, source_id: &str, unp: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct NoExclusions;

#[async_trait]
impl ExclusionRegistry for NoExclusions {
    async fn is_excluded(&self, _source_id: &str, _unp: &str) -> bool {
        false
    }
}

/// Static list of company ids and UNPs, one per line; `#` starts a comment.
#[derive(Debug, Default, Clone)]
pub struct ListExclusions {
    keys: HashSet<String>,
}

impl ListExclusions {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|k| k.as_ref().trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Configuration(format!(
                "cannot read exclusion list {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(
            content
                .lines()
                .map(|line| line.split('#').next().unwrap_or_default()),
        ))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl ExclusionRegistry for ListExclusions {
    async fn is_excluded(&self, source_id: &str, unp: &str) -> bool {
        (!source_id.is_empty() && self.keys.contains(source_id))
            || (!unp.is_empty() && self.keys.contains(unp))
    }
}
