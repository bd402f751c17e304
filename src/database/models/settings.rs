use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::Entity;

/// Firm-wide configuration edited from the settings screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub document_templates: Vec<DocumentTemplate>,
    #[serde(default)]
    pub benefit_types: Vec<String>,
    #[serde(default)]
    pub case_statuses: Vec<String>,
    /// Benefit type -> documents the client must bring
    #[serde(default)]
    pub document_checklist_config: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub firm_info: FirmInfo,
    #[serde(default)]
    pub branding_settings: BrandingSettings,
    #[serde(default)]
    pub notification_settings: NotificationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for DocumentTemplate {
    const NOT_FOUND: &'static str = "Modelo não encontrado";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingSettings {
    #[serde(default)]
    pub primary_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for BrandingSettings {
    fn default() -> Self {
        Self {
            primary_color: "#1e3a8a".to_string(),
            logo_url: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    /// Incomplete tasks due within this many days count as urgent
    #[serde(default = "default_urgent_threshold")]
    pub urgent_task_threshold_days: u32,
    #[serde(default)]
    pub email_notifications: bool,
    #[serde(default = "default_true")]
    pub show_overdue_alerts: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_urgent_threshold() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            urgent_task_threshold_days: default_urgent_threshold(),
            email_notifications: false,
            show_overdue_alerts: true,
            extra: Map::new(),
        }
    }
}

const DEFAULT_BENEFIT_TYPES: &[&str] = &[
    "Aposentadoria por Idade",
    "Aposentadoria por Tempo de Contribuição",
    "Aposentadoria por Invalidez",
    "Auxílio-Doença",
    "BPC/LOAS",
    "Pensão por Morte",
    "Salário-Maternidade",
];

const DEFAULT_CASE_STATUSES: &[&str] = &[
    "Em Andamento",
    "Aguardando Documentos",
    "Protocolado",
    "Em Análise",
    "Concluído",
    "Arquivado",
];

const BASE_CHECKLIST: &[&str] = &["RG", "CPF", "Comprovante de Residência"];

fn checklist_extras(benefit: &str) -> &'static [&'static str] {
    match benefit {
        "Aposentadoria por Idade" | "Aposentadoria por Tempo de Contribuição" => {
            &["CNIS", "Carteira de Trabalho"]
        }
        "Aposentadoria por Invalidez" | "Auxílio-Doença" => &["Laudos Médicos", "CNIS"],
        "BPC/LOAS" => &["CadÚnico", "Laudos Médicos"],
        "Pensão por Morte" => &["Certidão de Óbito", "Certidão de Casamento"],
        "Salário-Maternidade" => &["Certidão de Nascimento"],
        _ => &[],
    }
}

impl Default for Settings {
    fn default() -> Self {
        let document_checklist_config: BTreeMap<String, Vec<String>> = DEFAULT_BENEFIT_TYPES
            .iter()
            .map(|benefit| {
                let docs: Vec<String> = BASE_CHECKLIST
                    .iter()
                    .chain(checklist_extras(benefit).iter())
                    .map(|s| s.to_string())
                    .collect();
                (benefit.to_string(), docs)
            })
            .collect();

        Self {
            document_templates: vec![DocumentTemplate {
                id: "template-procuracao".to_string(),
                name: "Procuração".to_string(),
                content: "Eu, {{client.name}}, CPF {{client.cpf}}, nomeio e constituo {{firm.name}} meu bastante procurador.".to_string(),
                extra: Map::new(),
            }],
            benefit_types: DEFAULT_BENEFIT_TYPES.iter().map(|s| s.to_string()).collect(),
            case_statuses: DEFAULT_CASE_STATUSES.iter().map(|s| s.to_string()).collect(),
            document_checklist_config,
            firm_info: FirmInfo {
                name: "Escritório de Advocacia".to_string(),
                ..FirmInfo::default()
            },
            branding_settings: BrandingSettings::default(),
            notification_settings: NotificationSettings::default(),
        }
    }
}
