//! Single-connection database handle
//!
//! The audit holds exactly one connection for the whole run. An in-memory
//! SQLite database lives only as long as its connection, so a pool would hand
//! out empty databases.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Live connection owned by the audit run
///
/// Call [`Database::close`] on every exit path. Dropping the handle also
/// releases the connection, without waiting for it.
#[derive(Debug)]
pub struct Database {
    conn: SqliteConnection,
    url: String,
}

impl Database {
    /// Open a connection, creating file databases that do not exist yet
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let conn = options.connect().await?;
        info!("Connected to database: {}", url);

        Ok(Self {
            conn,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Borrow the underlying connection for queries and migrations
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Check whether a table exists in the main schema
    pub async fn table_exists(&mut self, table: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type='table' AND name = ? COLLATE NOCASE
            )
            "#,
        )
        .bind(table)
        .fetch_one(&mut self.conn)
        .await?;

        Ok(exists)
    }

    /// Close the connection gracefully
    pub async fn close(self) {
        debug!("Closing database connection: {}", self.url);
        if let Err(e) = self.conn.close().await {
            warn!("Error while closing database connection: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_is_private_to_connection() {
        let mut first = Database::connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER)")
            .execute(first.conn())
            .await
            .unwrap();
        assert!(first.table_exists("t").await.unwrap());
        assert!(first.table_exists("T").await.unwrap());

        let mut second = Database::connect("sqlite::memory:").await.unwrap();
        assert!(!second.table_exists("t").await.unwrap());

        first.close().await;
        second.close().await;
    }

    #[tokio::test]
    async fn test_unopenable_path_is_rejected() {
        let result = Database::connect("sqlite:///nonexistent-clobaudit-dir/sub/audit.db").await;
        assert!(result.is_err());
    }
}
