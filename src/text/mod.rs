//! Text Processing Module
//!
//! Canonicalization shared by keyword derivation and search.
//!
//! ## Submodules
//! - **`normalizer`**: lower-casing, `ё` folding, entity/markup stripping, whitespace collapse.
//! - **`tokenizer`**: word splitting, edge stop-word trimming, query tokens.
//! - **`lexicon`**: the curated word tables, loadable from JSON.

pub mod lexicon;
pub mod normalizer;
pub mod tokenizer;

pub use lexicon::Lexicon;
pub use normalizer::{compact, normalize};
pub use tokenizer::{tokenize, tokenize_query, trim_edge_words};
