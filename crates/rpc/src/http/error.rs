//! Error responses

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use onbehalf_engine::EngineError;
use serde_json::json;

/// An [`EngineError`] on its way to the client.
///
/// Server-side failures are logged in full and reported with a generic
/// message; client errors carry the engine's message.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError(EngineError::Internal(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(EngineError::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(EngineError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.0.kind().is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            match self.0 {
                EngineError::Commit { ref audit_log_id, .. } => {
                    format!("internal error, audit entry {audit_log_id} was recorded")
                }
                _ => "internal error".to_string(),
            }
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EngineError::validation("x"), StatusCode::BAD_REQUEST),
            (EngineError::authorization("x"), StatusCode::FORBIDDEN),
            (EngineError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (EngineError::Conflict("x".into()), StatusCode::CONFLICT),
            (EngineError::ReviewState("x".into()), StatusCode::CONFLICT),
            (EngineError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
