use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use models::errors::FieldError;
use serde::Serialize;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::error;

/// JSON error body returned by every handler.
#[derive(Debug, Serialize)]
pub struct JsonApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, message: Option<String>) -> Self {
        Self { status, error, message, details: Vec::new() }
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, error: "Validation Error", message: None, details }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request", Some(message.into()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(details) => JsonApiError::validation(details),
            ServiceError::Conflict(msg) => JsonApiError::new(StatusCode::BAD_REQUEST, "Conflict", Some(msg)),
            ServiceError::NotFound(msg) => JsonApiError::new(StatusCode::NOT_FOUND, "Not Found", Some(msg)),
            e @ ServiceError::LastAddress(_) => {
                JsonApiError::new(StatusCode::BAD_REQUEST, "Invariant Violation", Some(e.to_string()))
            }
            e => {
                error!(error = %e, code = e.code(), "unexpected service failure");
                JsonApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    Some("an unexpected error occurred".into()),
                )
            }
        }
    }
}

impl From<JsonRejection> for JsonApiError {
    fn from(r: JsonRejection) -> Self { JsonApiError::bad_request(r.body_text()) }
}

impl From<PathRejection> for JsonApiError {
    fn from(r: PathRejection) -> Self { JsonApiError::bad_request(r.body_text()) }
}

impl From<QueryRejection> for JsonApiError {
    fn from(r: QueryRejection) -> Self { JsonApiError::bad_request(r.body_text()) }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("storage initialization failed: {0}")]
    Storage(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_errors_hide_detail() {
        let e = JsonApiError::from(ServiceError::Db("connection refused to 10.0.0.5".into()));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!e.message.unwrap_or_default().contains("10.0.0.5"));
    }

    #[test]
    fn service_errors_map_to_status() {
        assert_eq!(JsonApiError::from(ServiceError::not_found("customer")).status, StatusCode::NOT_FOUND);
        assert_eq!(JsonApiError::from(ServiceError::duplicate_phone("1111111111")).status, StatusCode::BAD_REQUEST);
        assert_eq!(JsonApiError::from(ServiceError::LastAddress(3)).status, StatusCode::BAD_REQUEST);
        let v = JsonApiError::from(ServiceError::invalid("pinCode", "pinCode must be exactly 6 digits"));
        assert_eq!(v.details.len(), 1);
        let body = serde_json::to_value(&v).unwrap();
        assert_eq!(body["details"][0]["field"], "pinCode");
        assert!(body.get("message").is_none());
    }
}
