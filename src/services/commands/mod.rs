//! `POST /api/commands`: one resource/action switch over the scope documents.
//!
//! Every command loads the scopes it needs through a `ScopeSession`, mutates
//! them in memory and commits all touched scopes in one store transaction.
//! Nothing is written when a handler returns an error.

mod cases;
mod clients;
mod financials;
mod settings;

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::database::models::{new_id, Entity, ScopeData};
use crate::database::repository::{CommittedScope, RepositoryError, ScopeRepository, ScopeSession};
use crate::types::{Scope, ScopeVersions};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub resource: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Versions the caller last saw; a write to a scope that moved on is rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_versions: Option<ScopeVersions>,
}

impl CommandRequest {
    pub fn new(resource: impl Into<String>, action: impl Into<String>, payload: Option<Value>) -> Self {
        Self { resource: resource.into(), action: action.into(), payload, expected_versions: None }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("ação desconhecida: recurso '{0}'")]
    UnknownResource(String),

    #[error("ação desconhecida: {resource}.{action}")]
    UnknownAction { resource: Scope, action: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Payload inválido: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CommandError {
    fn missing(field: &str) -> Self {
        CommandError::Validation(format!("{} não informado", field))
    }

    fn unknown_action(resource: Scope, action: &str) -> Self {
        CommandError::UnknownAction { resource, action: action.to_string() }
    }
}

/// The optional JSON object sent with a command
#[derive(Debug, Clone, Default)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new(value: Option<Value>) -> Result<Self, CommandError> {
        match value {
            None | Some(Value::Null) => Ok(Payload::default()),
            Some(Value::Object(map)) => Ok(Payload(map)),
            Some(_) => Err(CommandError::Validation("payload deve ser um objeto".into())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string field, or a 400 naming it
    pub fn require_str(&self, key: &str) -> Result<String, CommandError> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(CommandError::missing(key)),
        }
    }

    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, CommandError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Err(CommandError::missing(key)),
            Some(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }

    /// Entity fields: the object under `nested` when present, otherwise the
    /// payload itself minus the addressing keys in `routing`
    pub fn fields(&self, nested: &str, routing: &[&str]) -> Map<String, Value> {
        if let Some(Value::Object(inner)) = self.0.get(nested) {
            return inner.clone();
        }
        self.0
            .iter()
            .filter(|(k, _)| k.as_str() != nested && !routing.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Side effects to run once the commit succeeded
#[derive(Debug, Default)]
pub struct CommandEffects {
    pub removed_cases: Vec<String>,
}

impl CommandEffects {
    fn none() -> Self {
        Self::default()
    }

    fn removed(case_ids: Vec<String>) -> Self {
        Self { removed_cases: case_ids }
    }
}

/// Result of a successful command: every scope the command staged
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub resource: Scope,
    pub scopes: Vec<CommittedScope>,
}

impl CommandOutcome {
    /// Response body: the bare scope value for single-scope commands,
    /// a composite object when the command touched several scopes
    pub fn body(&self) -> Result<Value, serde_json::Error> {
        match self.scopes.as_slice() {
            [only] if only.data.scope() == self.resource => only.data.to_wire(),
            scopes => {
                let mut out = Map::new();
                for scope in scopes {
                    scope.data.write_composite(&mut out)?;
                }
                Ok(Value::Object(out))
            }
        }
    }

    pub fn versions(&self) -> ScopeVersions {
        let mut versions = ScopeVersions::default();
        for scope in &self.scopes {
            versions.set(scope.data.scope(), scope.version);
        }
        versions
    }
}

#[derive(Clone)]
pub struct CommandService {
    repo: ScopeRepository,
}

impl CommandService {
    pub fn new(repo: ScopeRepository) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, request: CommandRequest) -> Result<CommandOutcome, CommandError> {
        let resource: Scope = request
            .resource
            .parse()
            .map_err(|_| CommandError::UnknownResource(request.resource.clone()))?;
        let payload = Payload::new(request.payload)?;

        let mut session = self.repo.session();
        if let Some(expected) = request.expected_versions {
            session = session.expect_versions(expected);
        }

        let action = request.action.as_str();
        let effects = match resource {
            Scope::Clients => clients::apply(&mut session, action, &payload).await?,
            Scope::Cases => cases::apply(&mut session, action, &payload).await?,
            Scope::Financials => financials::apply(&mut session, action, &payload).await?,
            Scope::Settings => settings::apply(&mut session, action, &payload).await?,
        };

        let scopes = session.commit().await?;
        let outcome = CommandOutcome { resource, scopes };
        info!("Command {}.{} committed ({})", resource, action, outcome.versions().to_header_value());

        self.remove_case_blobs(&effects.removed_cases).await;
        Ok(outcome)
    }

    /// Best effort: metadata is already gone, orphaned blobs are only logged
    async fn remove_case_blobs(&self, case_ids: &[String]) {
        for case_id in case_ids {
            match self.repo.store().delete_case_blobs(case_id).await {
                Ok(0) => {}
                Ok(n) => info!("Removed {} stored file(s) of case {}", n, case_id),
                Err(e) => warn!("Failed to remove stored files of case {}: {}", case_id, e),
            }
        }
    }
}

// Helpers shared by the per-resource handlers

fn find_mut<'a, T: Entity>(items: &'a mut [T], id: &str) -> Result<&'a mut T, CommandError> {
    items
        .iter_mut()
        .find(|item| item.id() == id)
        .ok_or_else(|| CommandError::NotFound(T::NOT_FOUND.to_string()))
}

fn remove_by_id<T: Entity>(items: &mut Vec<T>, id: &str) -> Result<T, CommandError> {
    let index = items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| CommandError::NotFound(T::NOT_FOUND.to_string()))?;
    Ok(items.remove(index))
}

/// Build a new entity from payload fields with a fresh id and, when
/// `stamp` names a field, the creation time
fn build_entity<T: DeserializeOwned>(mut fields: Map<String, Value>, stamp: Option<&str>) -> Result<T, CommandError> {
    fields.insert("id".into(), Value::String(new_id()));
    if let Some(field) = stamp {
        fields.insert(field.into(), Value::String(Utc::now().to_rfc3339()));
    }
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Remove the matching cases and every fee/expense attached to them.
/// Stages both scopes and returns the removed case ids.
async fn remove_cases_where<F>(session: &mut ScopeSession<'_>, predicate: F) -> Result<Vec<String>, CommandError>
where
    F: Fn(&crate::database::models::Case) -> bool,
{
    let mut cases = session.cases().await?;
    let removed: Vec<String> = cases.iter().filter(|c| predicate(c)).map(|c| c.id.clone()).collect();
    cases.retain(|c| !predicate(c));

    let mut financials = session.financials().await?;
    financials.remove_by_case_ids(&removed);

    session.stage(ScopeData::Cases(cases));
    session.stage(ScopeData::Financials(financials));
    Ok(removed)
}
