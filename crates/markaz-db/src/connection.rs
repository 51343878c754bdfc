//! SurrealDB connection management.
//!
//! The connection is an explicit, owned resource: operations borrow the
//! client from a [`DbManager`] instead of reaching for a shared global,
//! and dropping the manager tears the connection down.

use markaz_core::error::{MarkazError, MarkazResult};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

/// Configuration for connecting to the local SurrealDB server.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:5004`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:5004".into(),
            namespace: "local".into(),
            database: "local".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Manages a connection to the local SurrealDB instance.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Authenticates as root, selects the configured namespace and
    /// database, and returns a ready-to-use manager. Unreachable or
    /// refusing servers surface as [`MarkazError::Connection`]; retrying
    /// is the caller's responsibility.
    pub async fn connect(config: &DbConfig) -> MarkazResult<Self> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url)
            .await
            .map_err(|e| MarkazError::Connection(e.to_string()))?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await
        .map_err(|e| MarkazError::Connection(e.to_string()))?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| MarkazError::Connection(e.to_string()))?;

        info!("Successfully connected to SurrealDB");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
