//! SQLite-backed document store for local deployments.

use super::{DocumentStore, StoreError, VersionedDocument};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::info;

/// Initialize the SQLite database with schema and pragmas.
pub async fn init_store(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_pragmas_conn(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!("Document store initialized at {}", db_path);
    Ok(pool)
}

/// Run all database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let schema_sql = include_str!("schema.sql");

    for statement in schema_sql.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }

    Ok(())
}

/// Configure SQLite pragmas for reliability under concurrent readers.
async fn configure_pragmas_conn(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode returns the actual mode set; must use fetch to get result
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    info!("SQLite journal_mode set to: {}", journal_mode);

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Document store over a `documents` table, CAS on the version column.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store over an initialized pool.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn fetch(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<VersionedDocument>, StoreError> {
        let row = sqlx::query(
            "SELECT body, version FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let body: String = row.get(0);
                let version: i64 = row.get(1);
                let body: Value = serde_json::from_str(&body)?;
                Ok(Some(VersionedDocument { body, version }))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        body: Value,
        expected: Option<i64>,
    ) -> Result<i64, StoreError> {
        let body = serde_json::to_string(&body)?;
        let now_ms = Utc::now().timestamp_millis();

        let result = match expected {
            Some(version) => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET body = ?, version = version + 1, updated_ms = ?
                    WHERE collection = ? AND id = ? AND version = ?
                    "#,
                )
                .bind(&body)
                .bind(now_ms)
                .bind(collection)
                .bind(id)
                .bind(version)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, body, version, updated_ms)
                    VALUES (?, ?, ?, 1, ?)
                    ON CONFLICT(collection, id) DO NOTHING
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(&body)
                .bind(now_ms)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        Ok(expected.unwrap_or(0) + 1)
    }

    async fn list(
        &self,
        collection: &str,
        id_prefix: &str,
    ) -> Result<Vec<(String, VersionedDocument)>, StoreError> {
        // LIKE with the prefix escaped would be fragile for ids containing
        // wildcards; a range scan on the primary key avoids that.
        let upper = format!("{}\u{10FFFF}", id_prefix);
        let rows = sqlx::query(
            r#"
            SELECT id, body, version FROM documents
            WHERE collection = ? AND id >= ? AND id < ?
            ORDER BY id
            "#,
        )
        .bind(collection)
        .bind(id_prefix)
        .bind(&upper)
        .fetch_all(&self.pool)
        .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get(0);
            let body: String = row.get(1);
            let version: i64 = row.get(2);
            let body: Value = serde_json::from_str(&body)?;
            documents.push((id, VersionedDocument { body, version }));
        }
        Ok(documents)
    }
}
