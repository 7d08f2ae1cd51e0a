use duckdb::Connection;
use r2d2::{ManageConnection, Pool};
use std::sync::Mutex;

use crate::config::DatabaseConfig;

pub type DbPool = Pool<DuckDBConnectionManager>;

/// Hands out connections to a single DuckDB database instance.
///
/// The database is opened once; every pooled connection is a clone of the
/// root handle, so `:memory:` databases are shared across the pool instead of
/// each connection getting its own empty instance.
pub struct DuckDBConnectionManager {
    root: Mutex<Connection>,
}

impl DuckDBConnectionManager {
    pub fn open(connection_string: &str) -> Result<Self, duckdb::Error> {
        let root = Connection::open(connection_string)?;
        Ok(Self {
            root: Mutex::new(root),
        })
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let root = self.root.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        root.try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Failed to open database: {0}")]
    Open(#[from] duckdb::Error),

    #[error("Failed to build connection pool: {0}")]
    Build(#[from] r2d2::Error),
}

/// Opens the configured database and builds the process-wide pool.
pub fn build_pool(config: &DatabaseConfig) -> Result<DbPool, PoolError> {
    let manager = DuckDBConnectionManager::open(&config.connection_string)?;
    let pool = Pool::builder()
        .max_size(config.pool_size as u32)
        .build(manager)?;
    Ok(pool)
}

#[cfg(test)]
pub(crate) fn memory_pool() -> DbPool {
    let config = DatabaseConfig {
        connection_string: ":memory:".to_string(),
        pool_size: 2,
        schema: "main".to_string(),
    };
    build_pool(&config).expect("in-memory pool")
}
