pub mod case;
pub mod client;
pub mod financial;
pub mod money;
pub mod settings;
pub mod snapshot;

pub use case::{Case, CaseDocument, LegalDocument, Task};
pub use client::Client;
pub use financial::{Expense, Fee, FeeStatus, Financials, Installment, InstallmentStatus, INSTALLMENT_FEE_TYPE};
pub use money::Money;
pub use settings::{BrandingSettings, DocumentTemplate, FirmInfo, NotificationSettings, Settings};
pub use snapshot::Bootstrap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::Scope;

/// Anything stored in a collection and addressed by id
pub trait Entity {
    /// Message returned when a lookup by id fails
    const NOT_FOUND: &'static str;

    fn id(&self) -> &str;
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Shallow merge of `patch` over the serialized form of `current`.
/// Keys listed in `immutable` keep their stored value.
pub fn merge_patch<T>(current: &T, patch: &Map<String, Value>, immutable: &[&str]) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = match serde_json::to_value(current)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in patch {
        if immutable.contains(&key.as_str()) {
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(merged))
}

/// The full value of one scope
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeData {
    Clients(Vec<Client>),
    Cases(Vec<Case>),
    Financials(Financials),
    Settings(Settings),
}

impl ScopeData {
    pub fn scope(&self) -> Scope {
        match self {
            ScopeData::Clients(_) => Scope::Clients,
            ScopeData::Cases(_) => Scope::Cases,
            ScopeData::Financials(_) => Scope::Financials,
            ScopeData::Settings(_) => Scope::Settings,
        }
    }

    /// Deterministic default value, also what `reset` restores
    pub fn default_for(scope: Scope) -> Self {
        match scope {
            Scope::Clients => ScopeData::Clients(Vec::new()),
            Scope::Cases => ScopeData::Cases(Vec::new()),
            Scope::Financials => ScopeData::Financials(Financials::default()),
            Scope::Settings => ScopeData::Settings(Settings::default()),
        }
    }

    /// Value as returned by a single-scope command
    pub fn to_wire(&self) -> Result<Value, serde_json::Error> {
        match self {
            ScopeData::Clients(clients) => serde_json::to_value(clients),
            ScopeData::Cases(cases) => serde_json::to_value(cases),
            ScopeData::Financials(financials) => serde_json::to_value(financials),
            ScopeData::Settings(settings) => serde_json::to_value(settings),
        }
    }

    /// Insert this scope's keys into a composite snapshot
    /// (`clients`, `cases`, `fees` + `expenses`, `settings`)
    pub fn write_composite(&self, out: &mut Map<String, Value>) -> Result<(), serde_json::Error> {
        match self {
            ScopeData::Clients(clients) => {
                out.insert("clients".into(), serde_json::to_value(clients)?);
            }
            ScopeData::Cases(cases) => {
                out.insert("cases".into(), serde_json::to_value(cases)?);
            }
            ScopeData::Financials(financials) => {
                out.insert("fees".into(), serde_json::to_value(&financials.fees)?);
                out.insert("expenses".into(), serde_json::to_value(&financials.expenses)?);
            }
            ScopeData::Settings(settings) => {
                out.insert("settings".into(), serde_json::to_value(settings)?);
            }
        }
        Ok(())
    }

    /// Split a command result back into per-scope values. `resource` tells
    /// plain arrays and bare settings objects apart from composites.
    pub fn decode_result(resource: Scope, body: Value) -> Result<Vec<ScopeData>, serde_json::Error> {
        match body {
            Value::Array(_) => Ok(vec![Self::decode_single(resource, body)?]),
            Value::Object(map) => {
                if resource == Scope::Settings && !map.contains_key("settings") {
                    return Ok(vec![ScopeData::Settings(serde_json::from_value(Value::Object(map))?)]);
                }
                Self::decode_composite(map)
            }
            other => Err(serde::de::Error::custom(format!(
                "unexpected command result for {}: {}",
                resource, other
            ))),
        }
    }

    /// Decode a composite snapshot such as the bootstrap body
    pub fn decode_composite(mut map: Map<String, Value>) -> Result<Vec<ScopeData>, serde_json::Error> {
        let mut out = Vec::new();
        if let Some(clients) = map.remove("clients") {
            out.push(ScopeData::Clients(serde_json::from_value(clients)?));
        }
        if let Some(cases) = map.remove("cases") {
            out.push(ScopeData::Cases(serde_json::from_value(cases)?));
        }
        let fees = map.remove("fees");
        let expenses = map.remove("expenses");
        if fees.is_some() || expenses.is_some() {
            out.push(ScopeData::Financials(Financials {
                fees: fees.map(serde_json::from_value).transpose()?.unwrap_or_default(),
                expenses: expenses.map(serde_json::from_value).transpose()?.unwrap_or_default(),
            }));
        }
        if let Some(settings) = map.remove("settings") {
            out.push(ScopeData::Settings(serde_json::from_value(settings)?));
        }
        Ok(out)
    }

    fn decode_single(scope: Scope, value: Value) -> Result<ScopeData, serde_json::Error> {
        Ok(match scope {
            Scope::Clients => ScopeData::Clients(serde_json::from_value(value)?),
            Scope::Cases => ScopeData::Cases(serde_json::from_value(value)?),
            Scope::Financials => ScopeData::Financials(serde_json::from_value(value)?),
            Scope::Settings => ScopeData::Settings(serde_json::from_value(value)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_patch_keeps_immutable_keys() {
        let client: Client = serde_json::from_value(json!({
            "id": "c1", "name": "Maria", "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let patch = json!({"id": "other", "name": "Maria Silva", "createdAt": "2030-01-01T00:00:00Z", "phone": "123"});
        let merged = merge_patch(&client, patch.as_object().unwrap(), &["id", "createdAt"]).unwrap();
        assert_eq!(merged.id, "c1");
        assert_eq!(merged.name, "Maria Silva");
        assert_eq!(merged.phone.as_deref(), Some("123"));
        assert_eq!(merged.created_at, client.created_at);
    }

    #[test]
    fn decode_result_handles_arrays_composites_and_settings() {
        let updates = ScopeData::decode_result(Scope::Clients, json!([])).unwrap();
        assert_eq!(updates, vec![ScopeData::Clients(vec![])]);

        let updates =
            ScopeData::decode_result(Scope::Clients, json!({"clients": [], "cases": [], "fees": [], "expenses": []}))
                .unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2], ScopeData::Financials(Financials::default()));

        let settings = serde_json::to_value(Settings::default()).unwrap();
        let updates = ScopeData::decode_result(Scope::Settings, settings).unwrap();
        assert_eq!(updates, vec![ScopeData::Settings(Settings::default())]);

        assert!(ScopeData::decode_result(Scope::Cases, json!("nope")).is_err());
    }
}
