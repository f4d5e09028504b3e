//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use engine::EngineError;
use serde_json::json;
use thiserror::Error;

/// A failed request, rendered as `{status: "error", message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Export(#[from] EngineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Export(EngineError::UnknownProfile(_)) => StatusCode::NOT_FOUND,
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}
