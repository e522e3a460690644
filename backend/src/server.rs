use std::sync::Arc;

use aide::openapi::OpenApi;
use axum::Extension;
use datadog_tracing::axum::{shutdown_signal, OtelAxumLayer, OtelInResponseLayer};
use records_storage::{employee::EmployeeRepository, item::ItemRepository};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::routes;
use crate::types::Environment;

/// Builds the application router with all routes and shared layers
///
/// Tracing context propagation is added by [`start`] only, so tests can drive this
/// router directly.
#[must_use]
pub fn app(
    environment: Environment,
    item_repository: Arc<ItemRepository>,
    employee_repository: Arc<EmployeeRepository>,
) -> axum::Router {
    let mut openapi = OpenApi::default();
    let request_timeout = environment.request_timeout();

    routes::handler(&environment)
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(item_repository))
        .layer(Extension(employee_repository))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

/// Starts the server with the given environment and repositories
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    item_repository: Arc<ItemRepository>,
    employee_repository: Arc<EmployeeRepository>,
) -> anyhow::Result<()> {
    let router = app(environment, item_repository, employee_repository)
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default());

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8001), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Records API started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}
