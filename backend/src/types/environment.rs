//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};

/// Attempts made for a rate-limited store request, including the first one
const STORE_MAX_ATTEMPTS: u32 = 3;

/// Longest wait between two attempts of a rate-limited store request
const STORE_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Default number of records fetched per query page
const DEFAULT_QUERY_PAGE_SIZE: i32 = 100;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the table name for items
    ///
    /// # Panics
    ///
    /// Panics if `ITEMS_TABLE_NAME` is not set outside development
    #[must_use]
    pub fn items_table(&self) -> String {
        self.table_name("ITEMS_TABLE_NAME", "items")
    }

    /// Returns the table name for employees
    ///
    /// # Panics
    ///
    /// Panics if `EMPLOYEES_TABLE_NAME` is not set outside development
    #[must_use]
    pub fn employees_table(&self) -> String {
        self.table_name("EMPLOYEES_TABLE_NAME", "employees")
    }

    fn table_name(&self, var: &str, default: &str) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var(var).unwrap_or_else(|_| panic!("{var} environment variable is not set"))
            }
            Self::Development => env::var(var).unwrap_or_else(|_| default.to_string()),
        }
    }

    /// Number of records fetched per query page, from `QUERY_PAGE_SIZE`
    #[must_use]
    pub fn query_page_size(&self) -> i32 {
        env::var("QUERY_PAGE_SIZE")
            .ok()
            .and_then(|val| val.parse::<i32>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_QUERY_PAGE_SIZE)
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Time budget for a whole HTTP request
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        // Leaves room for the store's own retries and operation timeout
        Duration::from_secs(35)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// Retry policy applied to every store request
    ///
    /// Rate-limited requests are retried transparently by the SDK up to a fixed attempt cap;
    /// the store client itself never retries.
    #[must_use]
    pub fn store_retry_config(&self) -> RetryConfig {
        RetryConfig::standard()
            .with_max_attempts(STORE_MAX_ATTEMPTS)
            .with_initial_backoff(Duration::from_millis(50))
            .with_max_backoff(STORE_MAX_BACKOFF)
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(self.store_retry_config())
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS `DynamoDB` service configuration
    pub async fn dynamodb_client_config(&self) -> aws_sdk_dynamodb::Config {
        let aws_config = self.aws_config().await;
        (&aws_config).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        // Test explicit development
        env::set_var("APP_ENV", "development");
        assert_eq!(Environment::from_env(), Environment::Development);

        // Test staging
        env::set_var("APP_ENV", " Staging ");
        assert_eq!(Environment::from_env(), Environment::Staging);

        // Test production
        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let result = std::panic::catch_unwind(Environment::from_env);
        env::remove_var("APP_ENV");
        std::panic::resume_unwind(result.unwrap_err());
    }

    #[test]
    #[serial]
    fn test_table_names() {
        env::remove_var("ITEMS_TABLE_NAME");
        env::remove_var("EMPLOYEES_TABLE_NAME");

        let env = Environment::Development;
        assert_eq!(env.items_table(), "items");
        assert_eq!(env.employees_table(), "employees");

        env::set_var("ITEMS_TABLE_NAME", "prod-items");
        assert_eq!(Environment::Production.items_table(), "prod-items");

        env::remove_var("ITEMS_TABLE_NAME");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "EMPLOYEES_TABLE_NAME environment variable is not set")]
    fn test_production_requires_table_name() {
        env::remove_var("EMPLOYEES_TABLE_NAME");
        let _ = Environment::Production.employees_table();
    }

    #[test]
    #[serial]
    fn test_query_page_size() {
        env::remove_var("QUERY_PAGE_SIZE");
        assert_eq!(Environment::Development.query_page_size(), 100);

        env::set_var("QUERY_PAGE_SIZE", "25");
        assert_eq!(Environment::Development.query_page_size(), 25);

        // Invalid values fall back to the default
        env::set_var("QUERY_PAGE_SIZE", "0");
        assert_eq!(Environment::Development.query_page_size(), 100);
        env::set_var("QUERY_PAGE_SIZE", "invalid");
        assert_eq!(Environment::Development.query_page_size(), 100);

        env::remove_var("QUERY_PAGE_SIZE");
    }

    #[test]
    fn test_show_api_docs() {
        assert!(Environment::Development.show_api_docs());
        assert!(Environment::Staging.show_api_docs());
        assert!(!Environment::Production.show_api_docs());
    }

    #[test]
    fn test_store_retry_config() {
        let config = Environment::Production.store_retry_config();
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.max_backoff(), Duration::from_secs(30));
    }
}
