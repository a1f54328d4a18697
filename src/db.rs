use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{Result, TagError};

/// Shared, read-only handle to the spatial database.
///
/// Cloning is cheap and every clone refers to the same pool. The engine owns
/// the handle; taggers receive clones and only ever borrow the pool for
/// queries.
#[derive(Clone, Debug)]
pub struct DatabaseHandle {
    pool: PgPool,
}

impl DatabaseHandle {
    /// Wraps a pool the caller already established.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds a handle whose connections are opened on first use.
    ///
    /// No I/O happens here, which makes it suitable for wiring up an engine
    /// before the database is reachable.
    pub fn lazy(config: &DatabaseConfig) -> Self {
        let pool = pool_options(config).connect_lazy_with(connect_options(config));
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Opens a pool and verifies that at least one connection can be made.
///
/// Without a `host`, the connection goes through the local Unix socket
/// directory; with one, TCP is used on `port` (5432 unless set).
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseHandle> {
    let pool = pool_options(config)
        .connect_with(connect_options(config))
        .await
        .map_err(TagError::DatabaseConnection)?;

    info!(
        dbname = %config.dbname,
        host = config.host.as_deref().unwrap_or("<socket>"),
        "connected to spatial database"
    );
    Ok(DatabaseHandle { pool })
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
}

fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .database(&config.dbname)
        .username(&config.user)
        .password(&config.password)
        .application_name("geotagger");

    match &config.host {
        Some(host) => options.host(host).port(config.port.unwrap_or(5432)),
        None => options.socket(&config.socket_dir),
    }
}
