//! Converts `AppError` into consistent JSON error responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::error::AppError;

impl IntoResponse for AppError {
    /// # Status Code Mapping
    /// - Validation → 400 BAD_REQUEST
    /// - BadRequest → 400 BAD_REQUEST
    /// - Configuration → 500 INTERNAL_SERVER_ERROR
    /// - Internal → 500 INTERNAL_SERVER_ERROR
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Validation { field, reason } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", &format!("Validation failed for {field}"))
                    .with_details(json!({ "field": field, "reason": reason })),
            ),
            AppError::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("BAD_REQUEST", message),
            ),
            AppError::Configuration { key, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("CONFIGURATION_ERROR", &format!("Configuration error: {key}"))
                    .with_details(json!({ "key": key })),
            ),
            // Source chains stay in the logs.
            AppError::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred"),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, error_details = ?self, "Request failed");
        }

        (status, Json(error_response)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::JsonDataError(_) => "Invalid JSON format",
            JsonRejection::JsonSyntaxError(_) => "JSON syntax error",
            JsonRejection::MissingJsonContentType(_) => "Missing or invalid Content-Type header",
            JsonRejection::BytesRejection(_) => "Request body could not be read",
            _ => "Failed to parse JSON request",
        };
        AppError::bad_request(format!("{message}: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::validation("type", "empty"), StatusCode::BAD_REQUEST),
            (AppError::bad_request("nope"), StatusCode::BAD_REQUEST),
            (
                AppError::Internal {
                    source: anyhow::anyhow!("boom"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
