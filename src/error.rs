//! Crate Error Type
//!
//! Every fallible library operation returns [`CatalogError`]. Heuristic steps
//! (normalization, extraction, scoring, region classification, matching) are
//! total and never produce one.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A configured statistics file does not exist and missing files are fatal.
    #[error("statistics file {} is missing", path.display())]
    StatsFileMissing { path: PathBuf },

    #[error("statistics file {} is malformed: {reason}", path.display())]
    StatsFormat { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The very first catalog load failed, so there is no snapshot to serve.
    #[error("catalog {} could not be loaded: {reason}", path.display())]
    InitialLoad { path: PathBuf, reason: String },

    #[error("rubric '{slug}' not found")]
    RubricNotFound { slug: String },

    #[error("company '{id}' not found")]
    CompanyNotFound { id: String },

    #[error("accelerated search failed: {0}")]
    AcceleratedSearch(String),

    #[error("accelerated search timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::RubricNotFound { .. } | CatalogError::CompanyNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            CatalogError::AcceleratedSearch(_) | CatalogError::Timeout { .. } => {
                StatusCode::BAD_GATEWAY
            }
            CatalogError::InitialLoad { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CatalogError::Io(_)
            | CatalogError::StatsFileMissing { .. }
            | CatalogError::StatsFormat { .. }
            | CatalogError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
