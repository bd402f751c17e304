use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use super::store::{ScopeSnapshot, ScopeStore, ScopeWrite, StoreError, StoredBlob, StoredRecord};
use crate::types::Scope;

/// Postgres-backed store: one row per scope (version) and one row per record
pub struct PgScopeStore {
    pool: PgPool,
}

impl PgScopeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScopeStore for PgScopeStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn load(&self, scope: Scope) -> Result<Option<ScopeSnapshot>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM crm_scopes WHERE scope = $1")
            .bind(scope.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(version) = version else {
            tx.commit().await?;
            return Ok(None);
        };

        let rows: Vec<(String, Value)> =
            sqlx::query_as("SELECT record_key, doc FROM crm_records WHERE scope = $1 ORDER BY seq")
                .bind(scope.as_str())
                .fetch_all(&mut *tx)
                .await?;
        tx.commit().await?;

        let records = rows
            .into_iter()
            .map(|(key, doc)| StoredRecord { key, doc })
            .collect();
        Ok(Some(ScopeSnapshot { version, records }))
    }

    async fn commit(&self, mut writes: Vec<ScopeWrite>) -> Result<Vec<(Scope, i64)>, StoreError> {
        // Lock scope rows in a fixed order so multi-scope commits cannot deadlock
        writes.sort_by_key(|w| w.scope);

        let mut tx = self.pool.begin().await?;
        let mut versions = Vec::with_capacity(writes.len());

        for write in &writes {
            let scope = write.scope.as_str();

            sqlx::query("INSERT INTO crm_scopes (scope, version) VALUES ($1, 0) ON CONFLICT (scope) DO NOTHING")
                .bind(scope)
                .execute(&mut *tx)
                .await?;

            let actual: i64 = sqlx::query_scalar("SELECT version FROM crm_scopes WHERE scope = $1 FOR UPDATE")
                .bind(scope)
                .fetch_one(&mut *tx)
                .await?;

            if let Some(expected) = write.expected_version {
                if expected != actual {
                    // Dropping the transaction rolls back everything written so far
                    return Err(StoreError::Conflict { scope: write.scope, expected, actual });
                }
            }

            if !write.delta.removals.is_empty() {
                sqlx::query("DELETE FROM crm_records WHERE scope = $1 AND record_key = ANY($2)")
                    .bind(scope)
                    .bind(&write.delta.removals)
                    .execute(&mut *tx)
                    .await?;
            }

            for record in &write.delta.upserts {
                sqlx::query(
                    r#"INSERT INTO crm_records (scope, record_key, doc) VALUES ($1, $2, $3)
                       ON CONFLICT (scope, record_key) DO UPDATE SET doc = EXCLUDED.doc, updated_at = now()"#,
                )
                .bind(scope)
                .bind(&record.key)
                .bind(&record.doc)
                .execute(&mut *tx)
                .await?;
            }

            let version: i64 = sqlx::query_scalar(
                "UPDATE crm_scopes SET version = version + 1, updated_at = now() WHERE scope = $1 RETURNING version",
            )
            .bind(scope)
            .fetch_one(&mut *tx)
            .await?;

            debug!(
                scope,
                version,
                upserts = write.delta.upserts.len(),
                removals = write.delta.removals.len(),
                "scope written"
            );
            versions.push((write.scope, version));
        }

        tx.commit().await?;
        Ok(versions)
    }

    async fn put_blob(&self, blob: StoredBlob) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO crm_document_blobs (case_id, document_id, content_type, file_name, bytes, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (case_id, document_id) DO UPDATE
                 SET content_type = EXCLUDED.content_type,
                     file_name = EXCLUDED.file_name,
                     bytes = EXCLUDED.bytes"#,
        )
        .bind(&blob.case_id)
        .bind(&blob.document_id)
        .bind(&blob.content_type)
        .bind(&blob.file_name)
        .bind(&blob.bytes)
        .bind(blob.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_blob(&self, case_id: &str, document_id: &str) -> Result<Option<StoredBlob>, StoreError> {
        let row: Option<(String, String, Vec<u8>, DateTime<Utc>)> = sqlx::query_as(
            r#"SELECT content_type, file_name, bytes, created_at
               FROM crm_document_blobs WHERE case_id = $1 AND document_id = $2"#,
        )
        .bind(case_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(content_type, file_name, bytes, created_at)| StoredBlob {
            case_id: case_id.to_string(),
            document_id: document_id.to_string(),
            content_type,
            file_name,
            bytes,
            created_at,
        }))
    }

    async fn delete_blob(&self, case_id: &str, document_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM crm_document_blobs WHERE case_id = $1 AND document_id = $2")
            .bind(case_id)
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_case_blobs(&self, case_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM crm_document_blobs WHERE case_id = $1")
            .bind(case_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
