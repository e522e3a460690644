use aide::{axum::ApiRouter, openapi::OpenApi, scalar::Scalar};
use axum::{routing::get, Extension, Json};

/// Serves the `OpenAPI` document and the Scalar UI, or nothing when docs are hidden
pub fn handler(show_api_docs: bool) -> ApiRouter {
    if !show_api_docs {
        return ApiRouter::new();
    }

    let scalar = Scalar::new("/openapi.json").with_title("Records API Docs");

    ApiRouter::new()
        .route("/docs", scalar.axum_route())
        .route("/openapi.json", get(openapi_schema))
}

#[allow(clippy::unused_async)]
async fn openapi_schema(Extension(openapi): Extension<OpenApi>) -> Json<OpenApi> {
    Json(openapi)
}
