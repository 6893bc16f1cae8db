use std::collections::BTreeMap;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use tracing::error;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Patch cannot be applied: {0}")]
    UnprocessablePatch(String),

    #[error("Validation failed")]
    ValidationFailed(garde::Report),

    #[error("Database error: {0}")]
    Database(filmes_dal::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<filmes_dal::Error> for ApiError {
    fn from(value: filmes_dal::Error) -> Self {
        match value {
            filmes_dal::Error::RecordNotFound(what) => ApiError::RecordNotFound(what),
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::RecordNotFound(what) => {
                (StatusCode::NOT_FOUND, format!("{what} not found")).into_response()
            }
            ApiError::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::UnprocessablePatch(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "patch": msg })),
            )
                .into_response(),
            ApiError::ValidationFailed(report) => {
                // field -> list of violated invariants, nothing was persisted
                let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for (path, error) in report.iter() {
                    fields
                        .entry(path.to_string())
                        .or_default()
                        .push(error.to_string());
                }
                (StatusCode::UNPROCESSABLE_ENTITY, Json(fields)).into_response()
            }
            other => {
                error!("Internal error: {other}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
