//! Search Service Module
//!
//! Answers company queries over the current catalog snapshot.
//!
//! ## Overview
//! A query carries a company name, a service/product phrase and optional
//! city, region, rubric and category filters. An external accelerated engine,
//! when configured, answers first; the in-process ranking engine is the
//! fallback and the reference behaviour.
//!
//! ## Responsibilities
//! - **Matching**: per-token prefix rules with curated stem exceptions.
//! - **Ranking**: name-match strength plus keyword-token overlap, with a
//!   real-logo and name tie-break.
//! - **Orchestration**: timeout and fallback around the accelerated engine.
//! - **API**: the `/search` HTTP endpoint.
//!
//! ## Submodules
//! - **`matching`**: token match rules and the stem exception table.
//! - **`engine`**: the in-process ranking engine.
//! - **`accelerated`**: the accelerated engine collaborator and `SearchService`.
//! - **`handlers`**: HTTP request handlers for the Axum web server.
//! - **`types`**: Data Transfer Objects (DTOs) for API communication.

pub mod accelerated;
pub mod engine;
pub mod handlers;
pub mod matching;
pub mod types;

#[cfg(test)]
mod tests;
