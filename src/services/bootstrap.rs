use tracing::debug;

use crate::database::models::Bootstrap;
use crate::database::repository::{RepositoryError, ScopeRepository};
use crate::types::{Scope, ScopeVersions};

/// Bootstrap body plus the version of each scope it was read at
#[derive(Debug, Clone)]
pub struct BootstrapSnapshot {
    pub data: Bootstrap,
    pub versions: ScopeVersions,
}

#[derive(Clone)]
pub struct BootstrapService {
    repo: ScopeRepository,
}

impl BootstrapService {
    pub fn new(repo: ScopeRepository) -> Self {
        Self { repo }
    }

    /// Read all four scopes concurrently, seeding defaults on first access
    pub async fn read(&self) -> Result<BootstrapSnapshot, RepositoryError> {
        let (clients, cases, financials, settings) = futures::try_join!(
            self.repo.load(Scope::Clients),
            self.repo.load(Scope::Cases),
            self.repo.load(Scope::Financials),
            self.repo.load(Scope::Settings),
        )?;

        let mut versions = ScopeVersions::default();
        let mut scopes = Vec::with_capacity(4);
        for loaded in [clients, cases, financials, settings] {
            versions.set(loaded.data.scope(), loaded.version);
            scopes.push(loaded.data);
        }
        debug!("Bootstrap read at {}", versions.to_header_value());

        Ok(BootstrapSnapshot { data: Bootstrap::from_scopes(scopes), versions })
    }
}
