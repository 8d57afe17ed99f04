//! Mapping of failures onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use claw_master_platforms::{ApiError, ApiErrorKind};
use claw_master_session::ManagerError;

use crate::protocol::ErrorBody;

/// A failed request, rendered as `{ "error": ..., "hint": ... }`.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiFailure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                hint: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl From<ManagerError> for ApiFailure {
    fn from(err: ManagerError) -> Self {
        let status = match &err {
            ManagerError::Validation(_) => StatusCode::BAD_REQUEST,
            ManagerError::NotFound(_) => StatusCode::NOT_FOUND,
            ManagerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ManagerError::Transient(_) => StatusCode::BAD_GATEWAY,
            ManagerError::Storage(e) => {
                tracing::error!("storage failure: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<ApiError> for ApiFailure {
    fn from(err: ApiError) -> Self {
        let status = match (err.kind, err.status) {
            (ApiErrorKind::Http, Some(code)) if (400..500).contains(&code) => {
                StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
            }
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            body: ErrorBody {
                error: err.message,
                hint: err.hint,
            },
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_error_statuses() {
        let cases = [
            (ManagerError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ManagerError::NotFound("id".into()), StatusCode::NOT_FOUND),
            (ManagerError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (ManagerError::Transient("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiFailure::from(err).status, status);
        }
    }

    #[test]
    fn test_platform_error_keeps_hint() {
        let failure = ApiFailure::from(ApiError {
            kind: ApiErrorKind::Http,
            status: Some(409),
            message: "Name taken".to_string(),
            hint: Some("Pick another name".to_string()),
        });
        assert_eq!(failure.status, StatusCode::CONFLICT);
        assert_eq!(failure.body.hint.as_deref(), Some("Pick another name"));

        let failure = ApiFailure::from(ApiError {
            kind: ApiErrorKind::Network,
            status: None,
            message: "request failed".to_string(),
            hint: None,
        });
        assert_eq!(failure.status, StatusCode::BAD_GATEWAY);
    }
}
