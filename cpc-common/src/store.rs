//! Record store
//!
//! Named collections of schemaless JSON documents keyed by string ids. The
//! console only needs insert, list, filtered list, get, partial update and
//! delete, so the [`RecordStore`] trait is kept to exactly that surface and
//! [`SqliteRecordStore`] implements it on the shared database.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

/// Field map of one stored record
pub type Document = Map<String, Value>;

/// A stored document and its id
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Students,
    Recruiters,
    Admins,
    ContactSubmissions,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Recruiters => "recruiters",
            Collection::Admins => "admins",
            Collection::ContactSubmissions => "contactSubmissions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document persistence used by every console operation
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert with a generated id; returns the id
    async fn insert(&self, collection: Collection, fields: Document) -> Result<String>;

    /// Insert under a caller-chosen id (profile records use the identity uid).
    /// Fails with `InvalidInput` if the id is taken.
    async fn insert_with_id(&self, collection: Collection, id: &str, fields: Document) -> Result<()>;

    /// All records in creation order
    async fn list_all(&self, collection: Collection) -> Result<Vec<Record>>;

    /// Records whose top-level string `field` equals `value`, in creation order
    async fn list_where(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Record>>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>>;

    /// Merge `changes` into the stored fields; `NotFound` if absent
    async fn update(&self, collection: Collection, id: &str, changes: Document) -> Result<Record>;

    /// Remove a record; deleting a missing id is not an error
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;
}

/// SQLite-backed record store (`records` table)
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn decode(id: String, fields: &str) -> Result<Record> {
        let fields: Document = serde_json::from_str(fields)?;
        Ok(Record { id, fields })
    }

    fn decode_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Record>> {
        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let fields: String = row.get("fields");
                Self::decode(id, &fields)
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, collection: Collection, fields: Document) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.insert_with_id(collection, &id, fields).await?;
        Ok(id)
    }

    async fn insert_with_id(&self, collection: Collection, id: &str, fields: Document) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(&fields)?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO records (collection, id, fields, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(&body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::InvalidInput(format!(
                "record {} already exists in {}",
                id, collection
            )));
        }

        debug!(collection = %collection, id = %id, "Inserted record");
        Ok(())
    }

    async fn list_all(&self, collection: Collection) -> Result<Vec<Record>> {
        let rows = sqlx::query("SELECT id, fields FROM records WHERE collection = ? ORDER BY seq")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await?;
        Self::decode_rows(rows)
    }

    async fn list_where(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Record>> {
        let path = format!("$.\"{}\"", field.replace('"', ""));
        let rows = sqlx::query(
            r#"
            SELECT id, fields FROM records
            WHERE collection = ? AND json_extract(fields, ?) = ?
            ORDER BY seq
            "#,
        )
        .bind(collection.as_str())
        .bind(&path)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;
        Self::decode_rows(rows)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>> {
        let row = sqlx::query("SELECT id, fields FROM records WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let id: String = row.get("id");
                let fields: String = row.get("fields");
                Ok(Some(Self::decode(id, &fields)?))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, collection: Collection, id: &str, changes: Document) -> Result<Record> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT fields FROM records WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let current = current.ok_or_else(|| Error::NotFound(format!("{} record {}", collection, id)))?;
        let mut record = Self::decode(id.to_string(), &current)?;
        for (key, value) in changes {
            record.fields.insert(key, value);
        }

        sqlx::query("UPDATE records SET fields = ?, updated_at = ? WHERE collection = ? AND id = ?")
            .bind(serde_json::to_string(&record.fields)?)
            .bind(Utc::now().to_rfc3339())
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(collection = %collection, id = %id, "Updated record");
        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(
            collection = %collection,
            id = %id,
            removed = result.rows_affected(),
            "Deleted record"
        );
        Ok(())
    }
}
