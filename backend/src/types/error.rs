//! Universal error handling for the API

use std::borrow::Cow;
use std::time::Duration;

use aide::OperationOutput;
use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use records_storage::error::RepositoryError;
use schemars::JsonSchema;
use serde::Serialize;

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: Cow<'static, str>,
    /// Human-readable error message
    pub message: &'static str,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: Option<ApiErrorResponse>,
    retry_after: Option<Duration>,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: Some(ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody {
                    code: Cow::Borrowed(code),
                    message: msg,
                },
            }),
            retry_after: None,
        }
    }

    /// Create an error that is sent with an empty body
    #[must_use]
    pub const fn empty(status: StatusCode) -> Self {
        Self {
            status,
            inner: None,
            retry_after: None,
        }
    }

    /// The requested resource does not exist
    #[must_use]
    pub const fn not_found() -> Self {
        Self::empty(StatusCode::NOT_FOUND)
    }

    /// The request body failed validation
    #[must_use]
    pub fn validation(code: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            inner: Some(ApiErrorResponse {
                allow_retry: false,
                error: ErrorBody {
                    code: code.into(),
                    message: "Request validation failed",
                },
            }),
            retry_after: None,
        }
    }

    /// HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self
            .inner
            .as_ref()
            .map_or("", |inner| inner.error.code.as_ref());

        // Log the error based on status code
        match self.status.as_u16() {
            404 => tracing::debug!("Resource not found"),
            400..=499 => tracing::warn!("Client error: {} - {code}", self.status),
            500..=599 => tracing::error!("Server error: {} - {code}", self.status),
            _ => {}
        }

        let mut response = match self.inner {
            Some(inner) => (self.status, Json(inner)).into_response(),
            None => self.status.into_response(),
        };

        if let Some(retry_after) = self.retry_after {
            let secs = retry_after.as_secs().max(1);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

/// Convert repository errors to application errors
///
/// The store failure is logged here and never sent to the client.
impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Transient { retry_after } => {
                tracing::warn!(?retry_after, "Store is rate limiting requests");
                Self {
                    retry_after,
                    ..Self::new(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "rate_limited",
                        "Service is busy, retry later",
                        true,
                    )
                }
            }
            RepositoryError::Fatal(err) => {
                tracing::error!(error = ?err, "Store operation failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
