use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{ScopeSnapshot, ScopeStore, ScopeWrite, StoreError, StoredBlob};
use crate::types::Scope;

/// Process-local store used for development and tests. Data is lost on restart.
#[derive(Default)]
pub struct MemoryScopeStore {
    scopes: RwLock<HashMap<Scope, ScopeSnapshot>>,
    blobs: RwLock<HashMap<(String, String), StoredBlob>>,
}

impl MemoryScopeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScopeStore for MemoryScopeStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, scope: Scope) -> Result<Option<ScopeSnapshot>, StoreError> {
        Ok(self.scopes.read().await.get(&scope).cloned())
    }

    async fn commit(&self, writes: Vec<ScopeWrite>) -> Result<Vec<(Scope, i64)>, StoreError> {
        let mut scopes = self.scopes.write().await;

        // Check every version before touching anything
        for write in &writes {
            let actual = scopes.get(&write.scope).map(|s| s.version).unwrap_or(0);
            if let Some(expected) = write.expected_version {
                if expected != actual {
                    return Err(StoreError::Conflict { scope: write.scope, expected, actual });
                }
            }
        }

        let mut versions = Vec::with_capacity(writes.len());
        for write in writes {
            let snapshot = scopes.entry(write.scope).or_default();
            write.delta.apply_to(&mut snapshot.records);
            snapshot.version += 1;
            versions.push((write.scope, snapshot.version));
        }
        Ok(versions)
    }

    async fn put_blob(&self, blob: StoredBlob) -> Result<(), StoreError> {
        let key = (blob.case_id.clone(), blob.document_id.clone());
        self.blobs.write().await.insert(key, blob);
        Ok(())
    }

    async fn get_blob(&self, case_id: &str, document_id: &str) -> Result<Option<StoredBlob>, StoreError> {
        let key = (case_id.to_string(), document_id.to_string());
        Ok(self.blobs.read().await.get(&key).cloned())
    }

    async fn delete_blob(&self, case_id: &str, document_id: &str) -> Result<bool, StoreError> {
        let key = (case_id.to_string(), document_id.to_string());
        Ok(self.blobs.write().await.remove(&key).is_some())
    }

    async fn delete_case_blobs(&self, case_id: &str) -> Result<u64, StoreError> {
        let mut blobs = self.blobs.write().await;
        let before = blobs.len();
        blobs.retain(|(case, _), _| case != case_id);
        Ok((before - blobs.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
