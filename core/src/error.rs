//! Error types for the management API client.
//!
//! # Design
//! Two families of failure reach the caller. A structured API error
//! (`ErrorResponse`) is produced only from an HTTP response with status 400 or
//! above and carries whatever the server said about it. Everything else
//! (connection failures, bad arguments, misuse of a disposed pipeline) keeps
//! its own variant so the retry policy and callers can tell them apart.

use std::time::Duration;

use thiserror::Error;

use crate::http::{Headers, HttpResponse};

/// Errors returned by every fallible client operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required constructor argument was missing or empty.
    #[error("`{field}` is required")]
    Validation { field: &'static str },

    /// The server answered with status 400 or above.
    #[error(transparent)]
    Api(Box<ErrorResponse>),

    /// The request never produced an HTTP response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A pipeline or handler was used after `dispose`.
    #[error("{0} has been disposed")]
    Disposed(&'static str),

    /// The call is not valid in the current state, or the pipeline is
    /// misconfigured.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The composed request URL could not be parsed.
    #[error("invalid request uri: {0}")]
    InvalidUri(String),

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),
}

impl ApiError {
    /// HTTP status of a structured API error, if this is one.
    pub fn status_code(&self) -> Option<u16> {
        self.error_response().map(|response| response.status_code)
    }

    pub fn error_response(&self) -> Option<&ErrorResponse> {
        match self {
            ApiError::Api(response) => Some(response),
            _ => None,
        }
    }

    /// Short name of the variant, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation",
            ApiError::Api(_) => "api",
            ApiError::Transport(_) => "transport",
            ApiError::Disposed(_) => "disposed",
            ApiError::InvalidOperation(_) => "invalid_operation",
            ApiError::InvalidUri(_) => "invalid_uri",
            ApiError::SerializationError(_) => "serialization",
            ApiError::DeserializationError(_) => "deserialization",
        }
    }
}

impl From<ErrorResponse> for ApiError {
    fn from(response: ErrorResponse) -> Self {
        ApiError::Api(Box::new(response))
    }
}

/// Structured error built from a response with status 400 or above.
#[derive(Debug, Clone, Error)]
#[error("HTTP {status_code} {reason_phrase}: {error_message} (error_code {error_code})")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub reason_phrase: String,
    pub headers: Headers,
    /// Machine error code from the body, `0` when absent.
    pub error_code: i64,
    /// Human message from the body, empty when absent.
    pub error_message: String,
    /// Field-level details, e.g. `{"password": ["is invalid"]}`.
    pub errors: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ErrorResponse {
    /// Build the structured error from a failed response. A missing or
    /// unparseable body still yields an error with the status line filled in.
    pub fn from_response(response: &HttpResponse) -> Self {
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap_or_default();
        Self {
            status_code: response.status,
            reason_phrase: response.reason.clone(),
            headers: response.headers.clone(),
            error_code: body["error_code"].as_i64().unwrap_or(0),
            error_message: body["error_message"].as_str().unwrap_or_default().to_string(),
            errors: body["errors"].as_object().cloned(),
        }
    }
}

/// Failures below the HTTP layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The lower-level I/O error, surfaced without its transport wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("response body exceeded {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Connectivity problems that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Connect(_) | TransportError::Timeout(_) | TransportError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, Headers::new(), body.as_bytes().to_vec())
    }

    #[test]
    fn parses_error_fields_from_body() {
        let resp = response(
            422,
            r#"{"error_message":"Looks like your email or password is invalid.","error_code":104,"errors":{"password":["is invalid"]}}"#,
        );
        let err = ErrorResponse::from_response(&resp);
        assert_eq!(err.status_code, 422);
        assert_eq!(err.reason_phrase, "Unprocessable Entity");
        assert_eq!(err.error_code, 104);
        assert_eq!(err.error_message, "Looks like your email or password is invalid.");
        assert_eq!(err.errors.unwrap()["password"][0], "is invalid");
    }

    #[test]
    fn unparseable_body_defaults_message_and_code() {
        let err = ErrorResponse::from_response(&response(500, "<html>oops</html>"));
        assert_eq!(err.status_code, 500);
        assert_eq!(err.reason_phrase, "Internal Server Error");
        assert_eq!(err.error_message, "");
        assert_eq!(err.error_code, 0);
        assert!(err.errors.is_none());
    }

    #[test]
    fn empty_body_defaults_message_and_code() {
        let err = ErrorResponse::from_response(&response(404, ""));
        assert_eq!(err.error_message, "");
        assert_eq!(err.error_code, 0);
    }

    #[test]
    fn api_error_exposes_status_code() {
        let err: ApiError = ErrorResponse::from_response(&response(404, "{}")).into();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.kind(), "api");
        assert_eq!(ApiError::Disposed("pipeline").status_code(), None);
    }

    #[test]
    fn transient_transport_errors() {
        assert!(TransportError::Connect("refused".into()).is_transient());
        assert!(TransportError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(TransportError::Io(std::io::Error::other("reset")).is_transient());
        assert!(!TransportError::BodyTooLarge { limit: 10 }.is_transient());
        assert!(!TransportError::Other("tls".into()).is_transient());
    }
}
