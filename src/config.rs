//! Server Configuration
//!
//! Command-line arguments with environment fallbacks. The binary parses
//! `ServerArgs` once and hands the library plain config structs; nothing in
//! the library reads the environment.

use crate::catalog::store::{DEFAULT_MAX_LIMIT, StoreConfig};
use crate::keywords::types::{DEFAULT_MAX_KEYWORDS, DeriveOptions, FallbackMode};
use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "catalog-search", version, about = "Company catalog keyword and search service")]
pub struct ServerArgs {
    /// Address the HTTP server listens on.
    #[arg(long, env = "CATALOG_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Catalog NDJSON file, one company per line.
    #[arg(long, env = "CATALOG_DATA")]
    pub data: PathBuf,

    /// Search statistics files (CSV or JSON). Repeatable.
    #[arg(long = "stats", env = "CATALOG_STATS", value_delimiter = ',')]
    pub stats: Vec<PathBuf>,

    #[arg(
        long,
        env = "CATALOG_STATS_SKIP_MISSING",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub stats_skip_missing: bool,

    /// Only keep phrases with a non-zero search volume.
    #[arg(long, env = "CATALOG_STRICT_STATS")]
    pub strict_stats: bool,

    /// Taxonomy fallback when too few content phrases survive: rubrics | none.
    #[arg(long, env = "CATALOG_FALLBACK", default_value_t = FallbackMode::Rubrics)]
    pub fallback: FallbackMode,

    #[arg(long, env = "CATALOG_MAX_KEYWORDS", default_value_t = DEFAULT_MAX_KEYWORDS)]
    pub max_keywords: usize,

    /// JSON file overriding any subset of the built-in lexicon tables.
    #[arg(long, env = "CATALOG_LEXICON")]
    pub lexicon: Option<PathBuf>,

    /// JSON file with per-company logo and location overrides.
    #[arg(long, env = "CATALOG_OVERRIDES")]
    pub overrides: Option<PathBuf>,

    /// Newline-delimited UNPs or company ids to hide.
    #[arg(long, env = "CATALOG_EXCLUSIONS")]
    pub exclusions: Option<PathBuf>,

    /// Base URL of the accelerated search engine.
    #[arg(long, env = "CATALOG_SEARCH_ENGINE_URL")]
    pub search_engine_url: Option<String>,

    #[arg(long, env = "CATALOG_SEARCH_ENGINE_TIMEOUT_MS", default_value_t = 800)]
    pub search_engine_timeout_ms: u64,

    /// Upper bound for any requested page size.
    #[arg(long, env = "CATALOG_MAX_LIMIT", default_value_t = DEFAULT_MAX_LIMIT)]
    pub max_limit: usize,

    /// Seconds between background freshness checks; 0 disables them.
    #[arg(long, env = "CATALOG_REFRESH_SECS", default_value_t = 30)]
    pub refresh_secs: u64,

    #[arg(long, env = "CATALOG_LOG_LEVEL", default_value_t = tracing::Level::INFO)]
    pub log_level: tracing::Level,
}

/// Where search statistics come from and how missing files are treated.
#[derive(Debug, Clone, Default)]
pub struct StatsConfig {
    pub paths: Vec<PathBuf>,
    pub skip_missing: bool,
}

impl ServerArgs {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            data_path: self.data.clone(),
            overrides_path: self.overrides.clone(),
            max_limit: self.max_limit.max(1),
        }
    }

    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig {
            paths: self.stats.clone(),
            skip_missing: self.stats_skip_missing,
        }
    }

    pub fn derive_options(&self) -> DeriveOptions {
        DeriveOptions {
            max_keywords: self.max_keywords,
            strict_stats: self.strict_stats,
            fallback: self.fallback,
        }
    }

    pub fn search_engine_timeout(&self) -> Duration {
        Duration::from_millis(self.search_engine_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_secs > 0).then(|| Duration::from_secs(self.refresh_secs))
    }
}
