//! Connection configuration and the shared client.
//!
//! A [`Connection`] wraps the SDK client together with the table-name
//! prefix every model table shares. Most applications set one global
//! connection at startup; tests and multi-environment tools can carry
//! explicit connections instead.

use std::sync::OnceLock;

use aws_sdk_dynamodb::Client;

use crate::error::{Result, StoreError};

static GLOBAL: OnceLock<Connection> = OnceLock::new();

/// AWS client configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Custom endpoint URL (for local DynamoDB).
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
    /// Prefix applied to every table name, e.g. an environment name.
    pub table_prefix: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            table_prefix: std::env::var("DYNAMAP_TABLE_PREFIX").ok(),
        }
    }
}

/// A DynamoDB client bound to a table-name prefix.
#[derive(Debug, Clone)]
pub struct Connection {
    client: Client,
    table_prefix: Option<String>,
}

impl Connection {
    /// Wrap an existing SDK client.
    pub fn new(client: Client, table_prefix: Option<String>) -> Self {
        Self {
            client,
            table_prefix,
        }
    }

    /// Build a client from the given configuration.
    pub async fn connect(config: &ConnectionConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), config.table_prefix.clone())
    }

    /// Build a client from environment configuration.
    ///
    /// Reads `AWS_ENDPOINT_URL`, `AWS_REGION` (defaults to `us-east-1`),
    /// and `DYNAMAP_TABLE_PREFIX`.
    pub async fn from_env() -> Self {
        Self::connect(&ConnectionConfig::default()).await
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The full table name for a model table, prefix applied.
    pub fn table_name(&self, table: &str) -> String {
        match &self.table_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}-{}", prefix, table),
            _ => table.to_string(),
        }
    }

    /// Install this connection as the process-wide default.
    ///
    /// Fails when a global connection is already set; the global can only
    /// be set once per process.
    pub fn set_global(self) -> Result<()> {
        GLOBAL.set(self).map_err(|_| StoreError::GlobalAlreadySet)
    }

    /// The process-wide connection installed with [`Connection::set_global`].
    pub fn global() -> Result<&'static Connection> {
        GLOBAL.get().ok_or(StoreError::GlobalNotSet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_applies_prefix() {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        let client = Client::from_conf(config);

        let plain = Connection::new(client.clone(), None);
        assert_eq!(plain.table_name("users"), "users");

        let prefixed = Connection::new(client.clone(), Some("staging".to_string()));
        assert_eq!(prefixed.table_name("users"), "staging-users");

        let empty = Connection::new(client, Some(String::new()));
        assert_eq!(empty.table_name("users"), "users");
    }
}
