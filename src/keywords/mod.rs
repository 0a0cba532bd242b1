//! Keyword Derivation Module
//!
//! Turns a company record into a short, diverse list of search phrases.
//!
//! ## Pipeline
//! 1. **Extract** raw candidates from structured lists, free text and taxonomy.
//! 2. **Filter** them through the safety rules and **score** them with
//!    observed search volume.
//! 3. **Select** up to `max_keywords` phrases, one per core phrase.
//! 4. **Refine** the selection with a few ordered rewrite rules.
//!
//! ## Submodules
//! - **`types`**: candidate types, sources, options and score constants.
//! - **`volume`**: search-volume table loaded from CSV/JSON statistics exports.
//! - **`extractor`**: the five candidate producers.
//! - **`safety`**: phrase rejection rules.
//! - **`scorer`**: scoring, duplicate merging and ranking order.
//! - **`selector`**: greedy selection with the diversity cap and taxonomy fallback.
//! - **`refine`**: post-selection rewrite rules (cargo phrasing, buy intent).
//! - **`engine`**: `KeywordEngine`, the entry point tying the stages together.

pub mod engine;
pub mod extractor;
pub mod refine;
pub mod safety;
pub mod scorer;
pub mod selector;
pub mod types;
pub mod volume;

pub use engine::KeywordEngine;
pub use types::{DeriveOptions, FallbackMode, KeywordCandidate, KeywordSource};
pub use volume::{VolumeTable, VolumeTableCache};

#[cfg(test)]
mod tests;
