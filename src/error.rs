//! Error taxonomy for the vault and the proxy.
//!
//! Only [`VaultError::BackendUnavailable`] and [`VaultError::BackendTimeout`] ever
//! reach an inference caller. Everything else is recovered inside the memory
//! subsystem by degrading to unmodified behaviour, or is reported to admin callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::vault::types::Category;

#[derive(Debug, Error)]
pub enum VaultError {
    /// The caller's permission scope excludes this category.
    #[error("model {model} may not read {category} entries")]
    PermissionDenied { model: String, category: Category },

    /// Store or similarity index could not serve a retrieval.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(#[source] anyhow::Error),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend did not respond within {0} seconds")]
    BackendTimeout(u64),

    #[error("extraction failed: {0}")]
    ExtractionFailure(#[source] anyhow::Error),

    /// The new entry is persisted; only its contradiction check failed.
    #[error("conflict resolution failed for {entry_id}: {source}")]
    ConflictResolutionFailure {
        entry_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl VaultError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::RetrievalUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ExtractionFailure(_)
            | Self::ConflictResolutionFailure { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors render in the backend's own `{"error": "..."}` shape so clients
/// written against Ollama can parse them.
impl IntoResponse for VaultError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
