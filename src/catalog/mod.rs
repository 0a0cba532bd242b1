//! Catalog Store Module
//!
//! Loads the NDJSON company catalog into immutable, indexed snapshots and
//! serves the read operations built on them.
//!
//! ## Overview
//! Each snapshot is built in one streaming pass: records are parsed, filtered
//! through the exclusion registry, patched with field overrides, classified
//! into a region and indexed by id, rubric and category. The store swaps in a
//! new snapshot whenever the catalog file's modification time changes.
//!
//! ## Submodules
//! - **`types`**: `CompanyRecord`, region slugs and the response DTOs.
//! - **`region`**: free-text address to region classification.
//! - **`overrides`**: logo/location overrides and website canonicalization.
//! - **`exclusion`**: the `ExclusionRegistry` collaborator.
//! - **`snapshot`**: one immutable, indexed catalog version.
//! - **`store`**: snapshot lifecycle (reload by mtime, single-flight, stale fallback).
//! - **`handlers`**: HTTP request handlers for the Axum web server.

pub mod exclusion;
pub mod handlers;
pub mod overrides;
pub mod region;
pub mod snapshot;
pub mod store;
pub mod types;

pub use exclusion::{ExclusionRegistry, ListExclusions, NoExclusions};
pub use snapshot::CatalogSnapshot;
pub use store::{CatalogStore, StoreConfig};
