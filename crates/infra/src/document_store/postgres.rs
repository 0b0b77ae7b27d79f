//! Postgres-backed document store.
//!
//! Documents live in a single table keyed by `(collection, id)` with the document
//! body stored as `JSONB`:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS <table> (
//!     collection TEXT  NOT NULL,
//!     id         TEXT  NOT NULL,
//!     body       JSONB NOT NULL,
//!     PRIMARY KEY (collection, id)
//! );
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StorageError |
//! |------------|----------------------|--------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Query` |
//! | PoolClosed / Io / Tls / PoolTimedOut | N/A | `Unavailable` |
//! | ColumnDecode / Decode | N/A | `Serialization` |
//! | Other | N/A | `Query` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use super::r#trait::{Document, DocumentStore, StorageError, document_id};

/// Postgres-backed document store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and shared across request
/// tasks. `find_one_and_replace` and `find_one_and_delete` are single statements, so
/// each is atomic per document.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
    table: String,
}

impl PostgresDocumentStore {
    /// Wrap a pool, storing documents in `table`.
    ///
    /// The table name is interpolated into SQL, so it must be a plain identifier
    /// (`[a-z_][a-z0-9_]*`).
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self, StorageError> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(StorageError::Query(format!(
                "invalid table name {table:?}: expected [a-z_][a-z0-9_]*"
            )));
        }
        Ok(Self {
            pool: Arc::new(pool),
            table,
        })
    }

    /// Connect to `database_url` and wrap the resulting pool.
    pub async fn connect(database_url: &str, table: impl Into<String>) -> Result<Self, StorageError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Self::new(pool, table)
    }

    /// Create the documents table if it does not exist yet.
    #[instrument(skip(self), fields(table = %self.table), err)]
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                collection TEXT  NOT NULL,
                id         TEXT  NOT NULL,
                body       JSONB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
            table = self.table
        );
        sqlx::query(&ddl)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table), err)]
    async fn find_one(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        let sql = format!(
            "SELECT body FROM {} WHERE collection = $1 AND id = $2",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_one", e))?;

        row.map(|r| body_of(&r)).transpose()
    }

    #[instrument(skip(self), fields(table = %self.table), err)]
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        let sql = format!(
            "SELECT body FROM {} WHERE collection = $1 ORDER BY id ASC",
            self.table
        );
        let rows = sqlx::query(&sql)
            .bind(collection)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_all", e))?;

        rows.iter().map(body_of).collect()
    }

    #[instrument(skip(self, document), fields(table = %self.table), err)]
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StorageError> {
        let id = document_id(&document)?.to_string();
        let sql = format!(
            "INSERT INTO {} (collection, id, body) VALUES ($1, $2, $3)",
            self.table
        );
        sqlx::query(&sql)
            .bind(collection)
            .bind(&id)
            .bind(&document)
            .execute(&*self.pool)
            .await
            .map_err(|e| match map_sqlx_error("insert_one", e) {
                StorageError::Duplicate { .. } => StorageError::Duplicate {
                    collection: collection.to_string(),
                    id: id.clone(),
                },
                other => other,
            })?;
        Ok(())
    }

    #[instrument(skip(self, document), fields(table = %self.table), err)]
    async fn find_one_and_replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<Option<Document>, StorageError> {
        if document_id(&document)? != id {
            return Err(StorageError::Serialization(format!(
                "replacement document must keep _id {id}"
            )));
        }

        // The sub-select locks the row and hands back the pre-update body.
        let sql = format!(
            r#"
            UPDATE {table} AS d
            SET body = $3
            FROM (
                SELECT collection, id, body
                FROM {table}
                WHERE collection = $1 AND id = $2
                FOR UPDATE
            ) AS old
            WHERE d.collection = old.collection AND d.id = old.id
            RETURNING old.body AS body
            "#,
            table = self.table
        );
        let row = sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .bind(&document)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_one_and_replace", e))?;

        row.map(|r| body_of(&r)).transpose()
    }

    #[instrument(skip(self), fields(table = %self.table), err)]
    async fn find_one_and_delete(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        let sql = format!(
            "DELETE FROM {} WHERE collection = $1 AND id = $2 RETURNING body",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_one_and_delete", e))?;

        row.map(|r| body_of(&r)).transpose()
    }
}

fn body_of(row: &sqlx::postgres::PgRow) -> Result<Document, StorageError> {
    row.try_get::<Document, _>("body")
        .map_err(|e| StorageError::Serialization(format!("failed to read document body: {e}")))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Map SQLx errors to `StorageError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StorageError::Duplicate {
                    collection: String::new(),
                    id: String::new(),
                },
                _ => StorageError::Query(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StorageError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StorageError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => StorageError::Unavailable(format!("tls error in {operation}: {e}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StorageError::Serialization(format!("decode error in {operation}: {err}"))
        }
        _ => StorageError::Query(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_must_be_plain_identifiers() {
        assert!(is_identifier("billflow"));
        assert!(is_identifier("_docs_2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2docs"));
        assert!(!is_identifier("docs; DROP TABLE users"));
        assert!(!is_identifier("Docs"));
    }
}
