use chrono::{NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::api::{ApiClient, ClientError, DownloadedFile};
use super::stores::{CasesStore, ClientsStore, FinancialStore, SettingsStore};
use crate::aggregates::UrgentTask;
use crate::database::models::{Case, CaseDocument, InstallmentStatus, ScopeData};
use crate::services::CommandRequest;
use crate::types::{Scope, ScopeVersions};

/// Client-side view of the whole CRM. Every write goes through the API and
/// the stores are replaced with what the server answered.
pub struct Workspace {
    api: ApiClient,
    pub clients: ClientsStore,
    pub cases: CasesStore,
    pub financials: FinancialStore,
    pub settings: SettingsStore,
    versions: ScopeVersions,
    strict: bool,
}

impl Workspace {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            clients: ClientsStore::default(),
            cases: CasesStore::default(),
            financials: FinancialStore::default(),
            settings: SettingsStore::default(),
            versions: ScopeVersions::default(),
            strict: false,
        }
    }

    /// Send the last seen versions with every command so concurrent edits
    /// are rejected instead of overwritten
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn versions(&self) -> &ScopeVersions {
        &self.versions
    }

    /// Load every scope from the server, bypassing the bootstrap cache
    pub async fn hydrate(&mut self) -> Result<(), ClientError> {
        let snapshot = self.api.fetch_bootstrap(true).await?;
        self.apply(snapshot.data.into_scopes());
        self.versions = snapshot.versions;
        debug!("Workspace hydrated at {}", self.versions.to_header_value());
        Ok(())
    }

    /// Replace local stores with server state
    pub fn apply(&mut self, scopes: Vec<ScopeData>) {
        for data in scopes {
            match data {
                ScopeData::Clients(clients) => self.clients.replace(clients),
                ScopeData::Cases(cases) => self.cases.replace(cases),
                ScopeData::Financials(financials) => self.financials.replace(financials),
                ScopeData::Settings(settings) => self.settings.replace(settings),
            }
        }
    }

    /// Run one command and apply its result. Local state is untouched on error.
    pub async fn command(&mut self, resource: Scope, action: &str, payload: Value) -> Result<(), ClientError> {
        let mut request = CommandRequest::new(resource.as_str(), action, Some(payload));
        if self.strict && !self.versions.is_empty() {
            request.expected_versions = Some(self.versions.clone());
        }

        let result = match self.api.execute_command(&request).await {
            Ok(result) => result,
            Err(err) => {
                if err.is_conflict() {
                    warn!("{}.{} rejected: scope changed on the server", resource, action);
                }
                return Err(err);
            }
        };

        let scopes = ScopeData::decode_result(resource, result.data)?;
        self.apply(scopes);
        self.versions.merge(&result.versions);
        Ok(())
    }

    /// Restore one scope to its defaults. Resetting cases also drops their
    /// fees, expenses and files.
    pub async fn reset(&mut self, scope: Scope) -> Result<(), ClientError> {
        self.command(scope, "reset", json!({})).await
    }

    // Clients

    pub async fn create_client(&mut self, client: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Clients, "create", Value::Object(client)).await
    }

    pub async fn update_client(&mut self, id: &str, updates: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Clients, "update", json!({ "id": id, "updates": updates })).await
    }

    /// Also removes the client's cases, their fees, expenses and files
    pub async fn delete_client(&mut self, id: &str) -> Result<(), ClientError> {
        self.command(Scope::Clients, "delete", json!({ "id": id })).await
    }

    // Cases

    pub async fn create_case(&mut self, case: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Cases, "create", Value::Object(case)).await
    }

    pub async fn update_case(&mut self, id: &str, updates: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Cases, "update", json!({ "id": id, "updates": updates })).await
    }

    pub async fn delete_case(&mut self, id: &str) -> Result<(), ClientError> {
        self.command(Scope::Cases, "delete", json!({ "id": id })).await
    }

    /// Removes every case of the client along with its fees, expenses and files
    pub async fn remove_cases_by_client(&mut self, client_id: &str) -> Result<(), ClientError> {
        self.command(Scope::Cases, "removeByClient", json!({ "clientId": client_id })).await
    }

    pub async fn add_task(
        &mut self,
        case_id: &str,
        description: &str,
        due_date: NaiveDate,
    ) -> Result<(), ClientError> {
        let payload = json!({
            "caseId": case_id,
            "task": { "description": description, "dueDate": due_date },
        });
        self.command(Scope::Cases, "addTask", payload).await
    }

    pub async fn update_task(
        &mut self,
        case_id: &str,
        task_id: &str,
        updates: Map<String, Value>,
    ) -> Result<(), ClientError> {
        let payload = json!({ "caseId": case_id, "taskId": task_id, "updates": updates });
        self.command(Scope::Cases, "updateTask", payload).await
    }

    pub async fn toggle_task(&mut self, case_id: &str, task_id: &str) -> Result<(), ClientError> {
        self.command(Scope::Cases, "toggleTask", json!({ "caseId": case_id, "taskId": task_id })).await
    }

    pub async fn delete_task(&mut self, case_id: &str, task_id: &str) -> Result<(), ClientError> {
        self.command(Scope::Cases, "deleteTask", json!({ "caseId": case_id, "taskId": task_id })).await
    }

    pub async fn add_legal_document(&mut self, case_id: &str, document: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Cases, "addLegalDocument", json!({ "caseId": case_id, "document": document })).await
    }

    pub async fn update_legal_document(
        &mut self,
        case_id: &str,
        document_id: &str,
        updates: Map<String, Value>,
    ) -> Result<(), ClientError> {
        let payload = json!({ "caseId": case_id, "documentId": document_id, "updates": updates });
        self.command(Scope::Cases, "updateLegalDocument", payload).await
    }

    pub async fn delete_legal_document(&mut self, case_id: &str, document_id: &str) -> Result<(), ClientError> {
        let payload = json!({ "caseId": case_id, "documentId": document_id });
        self.command(Scope::Cases, "deleteLegalDocument", payload).await
    }

    // Financials

    /// `installment_count` only matters for `Parcelado` fees without explicit installments
    pub async fn add_fee(&mut self, fee: Map<String, Value>, installment_count: Option<u32>) -> Result<(), ClientError> {
        let mut fee = fee;
        if let Some(count) = installment_count {
            fee.insert("installmentCount".into(), json!(count));
        }
        self.command(Scope::Financials, "addFee", Value::Object(fee)).await
    }

    pub async fn update_fee(&mut self, id: &str, updates: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Financials, "updateFee", json!({ "id": id, "updates": updates })).await
    }

    pub async fn delete_fee(&mut self, id: &str) -> Result<(), ClientError> {
        self.command(Scope::Financials, "deleteFee", json!({ "id": id })).await
    }

    pub async fn add_expense(&mut self, expense: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Financials, "addExpense", Value::Object(expense)).await
    }

    pub async fn update_expense(&mut self, id: &str, updates: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Financials, "updateExpense", json!({ "id": id, "updates": updates })).await
    }

    pub async fn delete_expense(&mut self, id: &str) -> Result<(), ClientError> {
        self.command(Scope::Financials, "deleteExpense", json!({ "id": id })).await
    }

    pub async fn update_installment_status(
        &mut self,
        fee_id: &str,
        installment_id: &str,
        status: InstallmentStatus,
        paid_date: Option<NaiveDate>,
    ) -> Result<(), ClientError> {
        let mut payload = json!({ "feeId": fee_id, "installmentId": installment_id, "status": status });
        if let Some(date) = paid_date {
            payload["paidDate"] = json!(date);
        }
        self.command(Scope::Financials, "updateInstallmentStatus", payload).await
    }

    // Settings

    pub async fn update_settings(&mut self, changes: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Settings, "update", json!({ "settings": changes })).await
    }

    pub async fn add_benefit_type(&mut self, name: &str) -> Result<(), ClientError> {
        self.command(Scope::Settings, "addBenefitType", json!({ "name": name })).await
    }

    pub async fn remove_benefit_type(&mut self, name: &str) -> Result<(), ClientError> {
        self.command(Scope::Settings, "removeBenefitType", json!({ "name": name })).await
    }

    pub async fn add_case_status(&mut self, name: &str) -> Result<(), ClientError> {
        self.command(Scope::Settings, "addCaseStatus", json!({ "name": name })).await
    }

    pub async fn remove_case_status(&mut self, name: &str) -> Result<(), ClientError> {
        self.command(Scope::Settings, "removeCaseStatus", json!({ "name": name })).await
    }

    pub async fn update_document_checklist(&mut self, benefit_type: &str, documents: Vec<String>) -> Result<(), ClientError> {
        let payload = json!({ "benefitType": benefit_type, "documents": documents });
        self.command(Scope::Settings, "updateDocumentChecklist", payload).await
    }

    pub async fn update_firm_info(&mut self, changes: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Settings, "updateFirmInfo", json!({ "firmInfo": changes })).await
    }

    pub async fn update_branding(&mut self, changes: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Settings, "updateBranding", json!({ "brandingSettings": changes })).await
    }

    pub async fn update_notification_settings(&mut self, changes: Map<String, Value>) -> Result<(), ClientError> {
        let payload = json!({ "notificationSettings": changes });
        self.command(Scope::Settings, "updateNotificationSettings", payload).await
    }

    pub async fn add_document_template(&mut self, template: Map<String, Value>) -> Result<(), ClientError> {
        self.command(Scope::Settings, "addDocumentTemplate", json!({ "template": template })).await
    }

    pub async fn update_document_template(&mut self, id: &str, updates: Map<String, Value>) -> Result<(), ClientError> {
        let payload = json!({ "id": id, "updates": updates });
        self.command(Scope::Settings, "updateDocumentTemplate", payload).await
    }

    pub async fn delete_document_template(&mut self, id: &str) -> Result<(), ClientError> {
        self.command(Scope::Settings, "deleteDocumentTemplate", json!({ "id": id })).await
    }

    // Case files

    /// Upload a file and replace the case with the server's copy
    pub async fn upload_document(
        &mut self,
        case_id: &str,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<CaseDocument, ClientError> {
        let uploaded = self.api.upload_document(case_id, file_name, content_type, bytes).await?;
        self.replace_case(uploaded.data.case, &uploaded.versions);
        Ok(uploaded.data.document)
    }

    pub async fn delete_document(&mut self, case_id: &str, document_id: &str) -> Result<(), ClientError> {
        let removed = self.api.delete_document(case_id, document_id).await?;
        self.replace_case(removed.data.case, &removed.versions);
        Ok(())
    }

    pub async fn download_document(&self, case_id: &str, document_id: &str) -> Result<DownloadedFile, ClientError> {
        self.api.download_document(case_id, document_id).await
    }

    // Queries

    pub fn urgent_tasks(&self) -> Vec<UrgentTask> {
        let threshold = self.settings.urgent_task_threshold_days();
        self.cases.get_urgent_tasks(Utc::now().date_naive(), threshold)
    }

    fn replace_case(&mut self, case: Case, versions: &ScopeVersions) {
        let mut cases = self.cases.all().to_vec();
        match cases.iter_mut().find(|c| c.id == case.id) {
            Some(slot) => *slot = case,
            None => cases.push(case),
        }
        self.cases.replace(cases);
        self.versions.merge(versions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::database::models::{Bootstrap, Client};

    fn workspace() -> Workspace {
        let config = ClientConfig::default().with_base_url("http://127.0.0.1:9");
        Workspace::new(ApiClient::new(config).unwrap())
    }

    #[test]
    fn apply_replaces_only_returned_scopes() {
        let mut ws = workspace();
        let snapshot: Bootstrap = serde_json::from_value(json!({
            "clients": [{"id": "c1", "name": "Ana", "createdAt": "2024-01-01T00:00:00Z"}],
            "cases": [{"id": "k1", "clientId": "c1", "createdAt": "2024-01-01T00:00:00Z"}],
            "fees": [{"id": "f1", "caseId": "k1", "amount": 100, "dueDate": "2024-01-01"}]
        }))
        .unwrap();
        ws.apply(snapshot.into_scopes());
        assert_eq!(ws.financials.get_financials_by_case_id("k1").fees.len(), 1);

        let clients: Vec<Client> = Vec::new();
        ws.apply(vec![ScopeData::Clients(clients)]);
        assert!(ws.clients.get_client_by_id("c1").is_none());
        assert!(ws.cases.get_case_by_id("k1").is_some());
        assert_eq!(ws.financials.fees().len(), 1);
    }

    #[tokio::test]
    async fn failed_command_leaves_state_alone() {
        let mut ws = workspace();
        ws.apply(vec![ScopeData::Clients(
            serde_json::from_value(json!([{"id": "c1", "name": "Ana", "createdAt": "2024-01-01T00:00:00Z"}])).unwrap(),
        )]);
        // Nothing listens on port 9
        assert!(ws.delete_client("c1").await.is_err());
        assert!(ws.clients.get_client_by_id("c1").is_some());
    }
}
