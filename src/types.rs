/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The four persisted scopes. Each one is stored as a set of keyed records
/// plus a monotonically increasing version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Clients,
    Cases,
    Financials,
    Settings,
}

impl Scope {
    pub const ALL: [Scope; 4] = [Scope::Clients, Scope::Cases, Scope::Financials, Scope::Settings];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Clients => "clients",
            Scope::Cases => "cases",
            Scope::Financials => "financials",
            Scope::Settings => "settings",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clients" => Ok(Scope::Clients),
            "cases" => Ok(Scope::Cases),
            "financials" => Ok(Scope::Financials),
            "settings" => Ok(Scope::Settings),
            other => Err(format!("unknown scope: {}", other)),
        }
    }
}

/// Header carrying the current version of every scope a response reflects
pub const SCOPE_VERSIONS_HEADER: &str = "x-scope-versions";

/// Version per scope, encoded on the wire as `clients=3,cases=7`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeVersions(pub BTreeMap<Scope, i64>);

impl ScopeVersions {
    pub fn get(&self, scope: Scope) -> Option<i64> {
        self.0.get(&scope).copied()
    }

    pub fn set(&mut self, scope: Scope, version: i64) {
        self.0.insert(scope, version);
    }

    pub fn merge(&mut self, other: &ScopeVersions) {
        for (scope, version) in &other.0 {
            self.0.insert(*scope, *version);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_header_value(&self) -> String {
        self.0
            .iter()
            .map(|(scope, version)| format!("{}={}", scope, version))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Lenient parse: malformed pairs are skipped
    pub fn parse_header(value: &str) -> Self {
        let mut versions = ScopeVersions::default();
        for pair in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((scope, version)) = pair.split_once('=') {
                if let (Ok(scope), Ok(version)) = (scope.trim().parse::<Scope>(), version.trim().parse::<i64>()) {
                    versions.set(scope, version);
                }
            }
        }
        versions
    }
}
