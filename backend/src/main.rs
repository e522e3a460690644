use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use records_backend::{server, types::Environment};
use records_storage::{
    employee::EmployeeRepository,
    item::ItemRepository,
    store::{DynamoDbStore, PartitionedStore},
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // Configure logging format based on environment
    // Use JSON format for staging/production (Datadog), regular format for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
    }

    let dynamodb_client = Arc::new(DynamoDbClient::from_conf(
        environment.dynamodb_client_config().await,
    ));
    let store: Arc<dyn PartitionedStore> = Arc::new(
        DynamoDbStore::new(dynamodb_client).with_page_size(environment.query_page_size()),
    );

    let item_repository = Arc::new(ItemRepository::new(
        store.clone(),
        environment.items_table(),
    ));
    let employee_repository = Arc::new(EmployeeRepository::new(
        store.clone(),
        environment.employees_table(),
    ));

    for collection in [item_repository.collection(), employee_repository.collection()] {
        if let Err(err) = store.ensure_collection(collection).await {
            tracing::error!(collection = collection.name(), error = ?err, "Failed to provision collection");
        }
    }

    server::start(environment, item_repository, employee_repository).await
}
