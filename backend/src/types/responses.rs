//! Success responses that carry more than a JSON body

use aide::OperationOutput;
use axum::{
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use url::Url;

/// `201 CREATED` with the new resource and a `Location` header pointing at it
#[derive(Debug)]
pub struct Created<T> {
    location: Option<String>,
    body: T,
}

impl<T> Created<T> {
    /// Create a new response for a resource readable at the path made of `segments`
    ///
    /// Each segment is percent-encoded on its own, so values may contain spaces, slashes
    /// or non-ASCII characters.
    #[must_use]
    pub fn at(segments: &[&str], body: T) -> Self {
        Self {
            location: encode_path(segments),
            body,
        }
    }
}

fn encode_path(segments: &[&str]) -> Option<String> {
    let mut url = Url::parse("http://localhost/").ok()?;
    url.path_segments_mut().ok()?.clear().extend(segments);
    Some(url.path().to_string())
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::CREATED, Json(self.body)).into_response();

        match self.location.as_deref().map(HeaderValue::from_str) {
            Some(Ok(location)) => {
                response.headers_mut().insert(LOCATION, location);
            }
            Some(Err(err)) => tracing::warn!("Location header omitted: {err}"),
            None => tracing::warn!("Location header omitted: path could not be encoded"),
        }

        response
    }
}

impl<T: JsonSchema> OperationOutput for Created<T> {
    type Inner = T;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<T>::operation_response(ctx, operation)
    }

    fn inferred_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        Self::operation_response(ctx, operation)
            .map(|response| vec![(Some(201), response)])
            .unwrap_or_default()
    }
}

/// `204 NO_CONTENT` with an empty body
#[derive(Debug, Clone, Copy)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

impl OperationOutput for NoContent {
    type Inner = ();

    fn operation_response(
        _ctx: &mut aide::generate::GenContext,
        _operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Some(aide::openapi::Response {
            description: "No Content".to_string(),
            ..Default::default()
        })
    }

    fn inferred_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        Self::operation_response(ctx, operation)
            .map(|response| vec![(Some(204), response)])
            .unwrap_or_default()
    }
}
