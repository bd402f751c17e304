use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::database::models::{Case, Client, Financials, ScopeData, Settings};
use crate::database::store::{RecordDelta, ScopeStore, ScopeWrite, StoreError, StoredRecord};
use crate::types::{Scope, ScopeVersions};

const FEE_PREFIX: &str = "fee:";
const EXPENSE_PREFIX: &str = "expense:";

/// Seeding races with another writer are retried this many times
const SEED_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to encode {scope}: {source}")]
    Encode { scope: Scope, source: serde_json::Error },

    #[error("Failed to decode {scope}: {source}")]
    Decode { scope: Scope, source: serde_json::Error },

    #[error("Could not initialize {0}")]
    SeedFailed(Scope),
}

/// A scope as read from the store
#[derive(Debug, Clone)]
pub struct LoadedScope {
    pub version: i64,
    pub records: Vec<StoredRecord>,
    pub data: ScopeData,
}

/// A scope value after a successful commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedScope {
    pub version: i64,
    pub data: ScopeData,
}

/// Typed access to the four scopes on top of a `ScopeStore`
#[derive(Clone)]
pub struct ScopeRepository {
    store: Arc<dyn ScopeStore>,
}

impl ScopeRepository {
    pub fn new(store: Arc<dyn ScopeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ScopeStore> {
        &self.store
    }

    /// Load a scope, creating and persisting its defaults on first access
    pub async fn load(&self, scope: Scope) -> Result<LoadedScope, RepositoryError> {
        for _ in 0..SEED_ATTEMPTS {
            if let Some(snapshot) = self.store.load(scope).await? {
                let data = decode_records(scope, &snapshot.records)?;
                return Ok(LoadedScope { version: snapshot.version, records: snapshot.records, data });
            }

            let data = ScopeData::default_for(scope);
            let records = encode_records(&data)?;
            let write = ScopeWrite {
                scope,
                expected_version: Some(0),
                delta: RecordDelta { upserts: records.clone(), removals: Vec::new() },
            };
            match self.store.commit(vec![write]).await {
                Ok(versions) => {
                    let version = versions.first().map(|(_, v)| *v).unwrap_or(1);
                    info!("Seeded default {} (version {})", scope, version);
                    return Ok(LoadedScope { version, records, data });
                }
                // Another request seeded it first; read theirs
                Err(StoreError::Conflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(RepositoryError::SeedFailed(scope))
    }

    pub fn session(&self) -> ScopeSession<'_> {
        ScopeSession {
            repo: self,
            expected: ScopeVersions::default(),
            loaded: BTreeMap::new(),
            staged: BTreeMap::new(),
        }
    }
}

/// Read-modify-write unit over one or more scopes. Nothing is persisted
/// until `commit`, and all staged scopes are written atomically.
pub struct ScopeSession<'a> {
    repo: &'a ScopeRepository,
    expected: ScopeVersions,
    loaded: BTreeMap<Scope, LoadedScope>,
    staged: BTreeMap<Scope, ScopeData>,
}

impl<'a> ScopeSession<'a> {
    /// Require the given versions when writing those scopes
    pub fn expect_versions(mut self, expected: ScopeVersions) -> Self {
        self.expected = expected;
        self
    }

    /// Current value of a scope: staged if already modified in this session
    pub async fn current(&mut self, scope: Scope) -> Result<ScopeData, RepositoryError> {
        if let Some(staged) = self.staged.get(&scope) {
            return Ok(staged.clone());
        }
        Ok(self.ensure_loaded(scope).await?.data.clone())
    }

    pub async fn clients(&mut self) -> Result<Vec<Client>, RepositoryError> {
        match self.current(Scope::Clients).await? {
            ScopeData::Clients(clients) => Ok(clients),
            _ => Err(RepositoryError::SeedFailed(Scope::Clients)),
        }
    }

    pub async fn cases(&mut self) -> Result<Vec<Case>, RepositoryError> {
        match self.current(Scope::Cases).await? {
            ScopeData::Cases(cases) => Ok(cases),
            _ => Err(RepositoryError::SeedFailed(Scope::Cases)),
        }
    }

    pub async fn financials(&mut self) -> Result<Financials, RepositoryError> {
        match self.current(Scope::Financials).await? {
            ScopeData::Financials(financials) => Ok(financials),
            _ => Err(RepositoryError::SeedFailed(Scope::Financials)),
        }
    }

    pub async fn settings(&mut self) -> Result<Settings, RepositoryError> {
        match self.current(Scope::Settings).await? {
            ScopeData::Settings(settings) => Ok(settings),
            _ => Err(RepositoryError::SeedFailed(Scope::Settings)),
        }
    }

    /// Replace the value of a scope for this session
    pub fn stage(&mut self, data: ScopeData) {
        self.staged.insert(data.scope(), data);
    }

    async fn ensure_loaded(&mut self, scope: Scope) -> Result<&LoadedScope, RepositoryError> {
        if !self.loaded.contains_key(&scope) {
            let loaded = self.repo.load(scope).await?;
            self.loaded.insert(scope, loaded);
        }
        self.loaded.get(&scope).ok_or(RepositoryError::SeedFailed(scope))
    }

    /// Persist every staged scope as record deltas in one store commit.
    /// Unchanged scopes are not written and keep their version.
    pub async fn commit(mut self) -> Result<Vec<CommittedScope>, RepositoryError> {
        let staged = std::mem::take(&mut self.staged);

        let mut writes = Vec::new();
        let mut versions: BTreeMap<Scope, i64> = BTreeMap::new();
        for (scope, data) in &staged {
            let loaded = self.ensure_loaded(*scope).await?;
            let after = encode_records(data)?;
            let delta = RecordDelta::between(&loaded.records, &after);
            versions.insert(*scope, loaded.version);
            if delta.is_empty() {
                debug!("{} unchanged, skipping write", scope);
                continue;
            }
            writes.push(ScopeWrite { scope: *scope, expected_version: self.expected.get(*scope), delta });
        }

        if !writes.is_empty() {
            for (scope, version) in self.repo.store.commit(writes).await? {
                versions.insert(scope, version);
            }
        }

        Ok(staged
            .into_iter()
            .map(|(scope, data)| CommittedScope { version: versions.get(&scope).copied().unwrap_or(0), data })
            .collect())
    }
}

/// Normalize a scope value into keyed records
pub fn encode_records(data: &ScopeData) -> Result<Vec<StoredRecord>, RepositoryError> {
    let scope = data.scope();
    let records: Result<Vec<StoredRecord>, serde_json::Error> = match data {
        ScopeData::Clients(clients) => clients
            .iter()
            .map(|c| serde_json::to_value(c).map(|doc| StoredRecord::new(c.id.clone(), doc)))
            .collect(),
        ScopeData::Cases(cases) => cases
            .iter()
            .map(|c| serde_json::to_value(c).map(|doc| StoredRecord::new(c.id.clone(), doc)))
            .collect(),
        ScopeData::Financials(financials) => {
            let fees = financials.fees.iter().map(|f| {
                serde_json::to_value(f).map(|doc| StoredRecord::new(format!("{}{}", FEE_PREFIX, f.id), doc))
            });
            let expenses = financials.expenses.iter().map(|e| {
                serde_json::to_value(e).map(|doc| StoredRecord::new(format!("{}{}", EXPENSE_PREFIX, e.id), doc))
            });
            fees.chain(expenses).collect()
        }
        ScopeData::Settings(settings) => serde_json::to_value(settings).map(|value| match value {
            Value::Object(sections) => sections.into_iter().map(|(k, v)| StoredRecord::new(k, v)).collect(),
            _ => Vec::new(),
        }),
    };
    records.map_err(|source| RepositoryError::Encode { scope, source })
}

/// Rebuild a scope value from its records
pub fn decode_records(scope: Scope, records: &[StoredRecord]) -> Result<ScopeData, RepositoryError> {
    let decoded = match scope {
        Scope::Clients => decode_list(records).map(ScopeData::Clients),
        Scope::Cases => decode_list(records).map(ScopeData::Cases),
        Scope::Financials => {
            let fees: Vec<&StoredRecord> = records.iter().filter(|r| r.key.starts_with(FEE_PREFIX)).collect();
            let expenses: Vec<&StoredRecord> =
                records.iter().filter(|r| r.key.starts_with(EXPENSE_PREFIX)).collect();
            decode_list(fees.into_iter()).and_then(|fees| {
                decode_list(expenses.into_iter()).map(|expenses| ScopeData::Financials(Financials { fees, expenses }))
            })
        }
        Scope::Settings => {
            let sections: Map<String, Value> = records.iter().map(|r| (r.key.clone(), r.doc.clone())).collect();
            serde_json::from_value(Value::Object(sections)).map(ScopeData::Settings)
        }
    };
    decoded.map_err(|source| RepositoryError::Decode { scope, source })
}

fn decode_list<'r, T, I>(records: I) -> Result<Vec<T>, serde_json::Error>
where
    T: serde::de::DeserializeOwned,
    I: IntoIterator<Item = &'r StoredRecord>,
{
    records.into_iter().map(|r| serde_json::from_value(r.doc.clone())).collect()
}
