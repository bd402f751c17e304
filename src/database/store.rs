use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::types::Scope;

/// Errors from a scope store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Version conflict on {scope}: expected {expected}, found {actual}")]
    Conflict { scope: Scope, expected: i64, actual: i64 },

    #[error("Corrupt record {key} in {scope}: {message}")]
    Corrupt { scope: Scope, key: String, message: String },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// One normalized record of a scope (a client, a fee, a settings section, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: String,
    pub doc: Value,
}

impl StoredRecord {
    pub fn new(key: impl Into<String>, doc: Value) -> Self {
        Self { key: key.into(), doc }
    }
}

/// Records of a scope in insertion order, plus the scope version.
/// Version 0 means the scope was never written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeSnapshot {
    pub version: i64,
    pub records: Vec<StoredRecord>,
}

/// Record-level change set between two states of a scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDelta {
    pub upserts: Vec<StoredRecord>,
    pub removals: Vec<String>,
}

impl RecordDelta {
    /// Records added or changed in `after`, keys present only in `before`
    pub fn between(before: &[StoredRecord], after: &[StoredRecord]) -> Self {
        let previous: HashMap<&str, &Value> = before.iter().map(|r| (r.key.as_str(), &r.doc)).collect();
        let upserts = after
            .iter()
            .filter(|r| previous.get(r.key.as_str()) != Some(&&r.doc))
            .cloned()
            .collect();

        let remaining: HashMap<&str, ()> = after.iter().map(|r| (r.key.as_str(), ())).collect();
        let removals = before
            .iter()
            .filter(|r| !remaining.contains_key(r.key.as_str()))
            .map(|r| r.key.clone())
            .collect();

        Self { upserts, removals }
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }

    /// Apply onto an ordered record list: updates keep their slot, new keys append
    pub fn apply_to(&self, records: &mut Vec<StoredRecord>) {
        records.retain(|r| !self.removals.contains(&r.key));
        for upsert in &self.upserts {
            match records.iter_mut().find(|r| r.key == upsert.key) {
                Some(existing) => existing.doc = upsert.doc.clone(),
                None => records.push(upsert.clone()),
            }
        }
    }
}

/// A pending write to one scope
#[derive(Debug, Clone)]
pub struct ScopeWrite {
    pub scope: Scope,
    /// When set, the write fails with `StoreError::Conflict` unless the
    /// stored version still matches
    pub expected_version: Option<i64>,
    pub delta: RecordDelta,
}

/// Bytes of an uploaded case document
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub case_id: String,
    pub document_id: String,
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Persistence backend for scopes and document blobs
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Backend name for logs and /health
    fn name(&self) -> &'static str;

    /// Read a scope; `None` when it was never written
    async fn load(&self, scope: Scope) -> Result<Option<ScopeSnapshot>, StoreError>;

    /// Apply all writes atomically; returns the new version of each written scope
    async fn commit(&self, writes: Vec<ScopeWrite>) -> Result<Vec<(Scope, i64)>, StoreError>;

    async fn put_blob(&self, blob: StoredBlob) -> Result<(), StoreError>;

    async fn get_blob(&self, case_id: &str, document_id: &str) -> Result<Option<StoredBlob>, StoreError>;

    /// Returns whether a blob was removed
    async fn delete_blob(&self, case_id: &str, document_id: &str) -> Result<bool, StoreError>;

    /// Remove every blob of a case; returns how many were removed
    async fn delete_case_blobs(&self, case_id: &str) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
