use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use catalog_search::catalog::exclusion::{ExclusionRegistry, ListExclusions, NoExclusions};
use catalog_search::catalog::handlers::{
    handle_catalog, handle_company, handle_company_keywords, handle_health, handle_reload,
    handle_rubric, handle_suggest,
};
use catalog_search::catalog::store::CatalogStore;
use catalog_search::config::ServerArgs;
use catalog_search::keywords::engine::KeywordEngine;
use catalog_search::keywords::volume::VolumeTableCache;
use catalog_search::search::accelerated::{HttpSearchEngine, SearchService};
use catalog_search::search::handlers::handle_search;
use catalog_search::text::lexicon::Lexicon;
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::info!("Starting catalog service on {}", args.bind);
    tracing::info!("Catalog file: {}", args.data.display());

    // 1. Keyword engine (lexicon + search statistics):
    let lexicon = match &args.lexicon {
        Some(path) => {
            tracing::info!("Lexicon overrides: {}", path.display());
            Lexicon::from_path(path)?
        }
        None => Lexicon::default(),
    };
    let stats = args.stats_config();
    let volume_cache = VolumeTableCache::new();
    let volumes = volume_cache.get_or_load(&stats.paths, stats.skip_missing)?;
    tracing::info!(
        "Search statistics: {} phrases from {} file(s)",
        volumes.len(),
        stats.paths.len()
    );
    let engine = Arc::new(KeywordEngine::new(
        Arc::new(lexicon),
        volumes,
        args.derive_options(),
    ));

    // 2. Catalog store (first load must succeed):
    let exclusions: Arc<dyn ExclusionRegistry> = match &args.exclusions {
        Some(path) => {
            let list = ListExclusions::from_path(path)?;
            tracing::info!("Excluding {} companies listed in {}", list.len(), path.display());
            Arc::new(list)
        }
        None => Arc::new(NoExclusions),
    };
    let store = CatalogStore::init(args.store_config(), engine, exclusions).await?;

    // 3. Search service:
    let mut search = SearchService::new(store.clone());
    if let Some(url) = &args.search_engine_url {
        let timeout = args.search_engine_timeout();
        let accelerated = HttpSearchEngine::new(url.as_str(), timeout)?;
        tracing::info!("Accelerated search engine: {} (timeout {:?})", url, timeout);
        search = search.with_accelerated(Arc::new(accelerated), timeout);
    }
    let search = Arc::new(search);

    // 4. HTTP Router:
    let app = Router::new()
        .route("/catalog", get(handle_catalog))
        .route("/rubrics/:slug", get(handle_rubric))
        .route("/suggest", get(handle_suggest))
        .route("/companies/:id", get(handle_company))
        .route("/companies/:id/keywords", get(handle_company_keywords))
        .route("/search", get(handle_search))
        .route("/reload", post(handle_reload))
        .route("/health", get(handle_health))
        .layer(Extension(store.clone()))
        .layer(Extension(search));

    // 5. Spawn freshness checker:
    if let Some(period) = args.refresh_interval() {
        let refresh_store = store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                match refresh_store.snapshot().await {
                    Ok(snapshot) => tracing::debug!(
                        "Catalog stats: {} companies, {} skipped lines, {} excluded",
                        snapshot.len(),
                        snapshot.skipped_lines(),
                        snapshot.excluded()
                    ),
                    Err(e) => tracing::warn!("Catalog freshness check failed: {}", e),
                }
            }
        });
    }

    // 6. Start HTTP server:
    tracing::info!("HTTP server listening on {}", args.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
