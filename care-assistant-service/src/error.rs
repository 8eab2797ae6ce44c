use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

use crate::analysis::AnalysisError;
use crate::extract::ExtractionError;
use crate::llm::ModelError;
use crate::models::FieldErrors;
use crate::storage::StorageError;

/// Every failure a handler can return. Rendered as JSON with an `error` key.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Model returned an invalid analysis")]
    InvalidAnalysis(String),

    #[error("{context}")]
    Model {
        context: &'static str,
        source: ModelError,
    },

    #[error("Internal Server Error")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn model(context: &'static str, source: ModelError) -> Self {
        Self::Model { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) | Self::Extraction(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidAnalysis(_) => StatusCode::BAD_GATEWAY,
            Self::Model {
                source: ModelError::Timeout(_),
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            Self::Model { .. } | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Validation(details) => json!({
                "error": self.to_string(),
                "details": details
            }),
            Self::InvalidAnalysis(details) => json!({
                "error": self.to_string(),
                "details": details
            }),
            Self::Model { source, .. } => json!({
                "error": self.to_string(),
                "details": source.to_string()
            }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Model(source) => Self::model("Error generating analysis", source),
            AnalysisError::InvalidFormat { reason, .. } => Self::InvalidAnalysis(reason),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Storage(e) => error!(error = %e, "Storage failure"),
            Self::Model { context, source } => error!(error = %source, "{}", context),
            Self::Internal(e) => error!(error = %e, "Internal failure"),
            other => warn!(status = status.as_u16(), error = %other, "Request rejected"),
        }
        (status, Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, AppError>;
