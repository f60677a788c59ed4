use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::domain::DomainError;

/// HTTP-facing error wrapper for domain failures
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::AllProvidersFailed { .. } => StatusCode::BAD_GATEWAY,
            DomainError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = Json(serde_json::json!({
            "error": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_for(error: DomainError) -> StatusCode {
        ApiError(error).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(DomainError::validation("empty")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(DomainError::not_found("no session")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(DomainError::all_providers_failed("generate")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(DomainError::timeout("anthropic")),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(DomainError::internal("oops")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
