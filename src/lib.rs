//! Company Catalog Search Library
//!
//! This library crate defines the modules behind the catalog service binary
//! (`main.rs`): keyword derivation for company records, the reloadable
//! catalog snapshot and the search engines that query it.
//!
//! ## Architecture Modules
//! - **`text`**: Normalization, tokenization and the lexicon tables every
//!   heuristic consults.
//! - **`keywords`**: Derives ranked search phrases for one company from its
//!   free text, structured lists, taxonomy and search-volume statistics.
//! - **`catalog`**: Loads the NDJSON catalog into immutable snapshots, swaps
//!   them when the file changes and serves listing, suggest and detail reads.
//! - **`search`**: Ranks companies for name and service queries, optionally
//!   delegating to an external accelerated engine.
//! - **`config`**: Command-line and environment configuration.
//! - **`error`**: The crate error type and its HTTP mapping.

pub mod catalog;
pub mod config;
pub mod error;
pub mod keywords;
pub mod search;
pub mod text;
