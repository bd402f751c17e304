use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

use crate::config::StorageConfig;
use crate::database::store::StoreError;

/// Builds the Postgres pool and makes sure the CRM tables exist
pub struct DatabaseManager;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS crm_scopes (
        scope TEXT PRIMARY KEY,
        version BIGINT NOT NULL DEFAULT 0,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS crm_records (
        scope TEXT NOT NULL REFERENCES crm_scopes(scope),
        record_key TEXT NOT NULL,
        seq BIGSERIAL NOT NULL,
        doc JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (scope, record_key)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS crm_records_scope_seq ON crm_records (scope, seq)"#,
    r#"CREATE TABLE IF NOT EXISTS crm_document_blobs (
        case_id TEXT NOT NULL,
        document_id TEXT NOT NULL,
        content_type TEXT NOT NULL,
        file_name TEXT NOT NULL,
        bytes BYTEA NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (case_id, document_id)
    )"#,
];

impl DatabaseManager {
    /// Connect using DATABASE_URL, optionally pointing at another database name
    pub async fn connect(config: &StorageConfig) -> Result<PgPool, StoreError> {
        let base = config
            .database_url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let connection_string = Self::build_connection_string(base, config.database_name.as_deref())?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&connection_string)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(pool)
    }

    /// Idempotent schema setup, run once at startup
    pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(pool).await?;
        }
        info!("CRM schema ready");
        Ok(())
    }

    fn build_connection_string(base: &str, database_name: Option<&str>) -> Result<String, StoreError> {
        let mut url = url::Url::parse(base).map_err(|_| StoreError::InvalidDatabaseUrl)?;
        if let Some(name) = database_name {
            if !Self::is_valid_db_name(name) {
                return Err(StoreError::InvalidDatabaseUrl);
            }
            url.set_path(&format!("/{}", name));
        }
        Ok(url.into())
    }

    /// Database names are restricted to [a-zA-Z0-9_], starting with a letter
    fn is_valid_db_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}
