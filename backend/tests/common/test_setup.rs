use axum::{body::Body, http::Request, response::Response, Router};
use records_backend::{server, types::Environment};
use records_storage::{
    employee::EmployeeRepository,
    item::ItemRepository,
    store::{MemoryStore, StoreError},
};
use std::sync::Arc;
use tower::ServiceExt;

/// Initialize tracing for tests
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Router over an in-memory store
pub struct TestSetup {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub item_repository: Arc<ItemRepository>,
    pub employee_repository: Arc<EmployeeRepository>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_environment(Environment::Development)
    }

    pub fn with_environment(environment: Environment) -> Self {
        setup_test_env();

        let store = Arc::new(MemoryStore::new());
        let item_repository = Arc::new(ItemRepository::new(
            store.clone(),
            "test-items".to_string(),
        ));
        let employee_repository = Arc::new(EmployeeRepository::new(
            store.clone(),
            "test-employees".to_string(),
        ));

        let router = server::app(
            environment,
            item_repository.clone(),
            employee_repository.clone(),
        );

        Self {
            router,
            store,
            item_repository,
            employee_repository,
        }
    }

    /// Makes the next store call fail with `error`
    pub async fn fail_next(&self, error: StoreError) {
        self.store.fail_next(error).await;
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    fn json_request(method: &str, route: &str, payload: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .uri(route)
            .method(method)
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    pub async fn send_get_request(&self, route: &str) -> Response {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn send_post_request(&self, route: &str, payload: serde_json::Value) -> Response {
        self.send(Self::json_request("POST", route, &payload)).await
    }

    pub async fn send_put_request(&self, route: &str, payload: serde_json::Value) -> Response {
        self.send(Self::json_request("PUT", route, &payload)).await
    }

    pub async fn send_delete_request(&self, route: &str) -> Response {
        let request = Request::builder()
            .uri(route)
            .method("DELETE")
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}
