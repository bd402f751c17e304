use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Entity;

/// A legal case (processo) belonging to one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub documents: Vec<CaseDocument>,
    #[serde(default)]
    pub legal_documents: Vec<LegalDocument>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Case {
    pub fn touch(&mut self) {
        self.last_update = Some(Utc::now());
    }
}

impl Entity for Case {
    const NOT_FOUND: &'static str = "Processo não encontrado";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Task {
    const NOT_FOUND: &'static str = "Tarefa não encontrada";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Metadata of an uploaded file; the bytes live in the blob store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDocument {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    /// sha256 of the stored bytes, lowercase hex
    pub checksum: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for CaseDocument {
    const NOT_FOUND: &'static str = "Arquivo não encontrado";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A petition or other text generated from a document template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalDocument {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for LegalDocument {
    const NOT_FOUND: &'static str = "Documento não encontrado";

    fn id(&self) -> &str {
        &self.id
    }
}
