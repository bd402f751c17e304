mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use lexcrm_api::client::{ApiClient, ClientConfig, Toast, ToastKind, Workspace};
use lexcrm_api::database::models::{FeeStatus, InstallmentStatus};
use lexcrm_api::types::Scope;
use serde_json::{json, Map, Value};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

async fn workspace(server: &common::TestServer) -> Result<Workspace> {
    let api = ApiClient::new(ClientConfig::default().with_base_url(server.base_url.clone()))?;
    let mut workspace = Workspace::new(api);
    workspace.hydrate().await?;
    Ok(workspace)
}

#[tokio::test]
async fn workspace_mirrors_server_state() -> Result<()> {
    let server = common::spawn_server().await?;
    let mut ws = workspace(&server).await?;
    assert!(ws.clients.all().is_empty());
    assert_eq!(ws.settings.urgent_task_threshold_days(), 7);

    ws.create_client(object(json!({"name": "Maria", "cpf": "000.000.000-00"}))).await?;
    let client_id = ws.clients.all()[0].id.clone();
    ws.create_case(object(json!({"clientId": client_id, "title": "Aposentadoria"}))).await?;
    let case_id = ws.cases.all()[0].id.clone();

    let due = Utc::now().date_naive() + Duration::days(2);
    ws.add_task(&case_id, "Protocolar recurso", due).await?;
    ws.add_fee(
        object(json!({"caseId": case_id, "amount": 900, "dueDate": "2024-01-31", "type": "Parcelado"})),
        Some(3),
    )
    .await?;

    let fee = ws.financials.fees()[0].clone();
    assert_eq!(fee.installments.len(), 3);
    ws.update_installment_status(&fee.id, &fee.installments[0].id, InstallmentStatus::Pago, None)
        .await?;
    assert_eq!(ws.financials.fees()[0].status, FeeStatus::ParcialmentePago);

    let urgent = ws.urgent_tasks();
    assert_eq!(urgent.len(), 1);
    assert_eq!(urgent[0].days_remaining, 2);

    let totals = ws.financials.get_financials_by_client_id(&client_id, &ws.cases).totals();
    assert_eq!(totals.fee_count, 1);

    // A fresh workspace sees the same thing
    let other = workspace(&server).await?;
    assert_eq!(other.cases.all(), ws.cases.all());
    assert_eq!(other.financials.fees(), ws.financials.fees());
    Ok(())
}

#[tokio::test]
async fn client_delete_result_is_applied_to_every_store() -> Result<()> {
    let server = common::spawn_server().await?;
    let mut ws = workspace(&server).await?;

    ws.create_client(object(json!({"name": "Maria"}))).await?;
    let client_id = ws.clients.all()[0].id.clone();
    ws.create_case(object(json!({"clientId": client_id}))).await?;
    let case_id = ws.cases.all()[0].id.clone();
    ws.add_expense(object(json!({"caseId": case_id, "amount": 12, "date": "2024-03-01"}))).await?;

    ws.delete_client(&client_id).await?;
    assert!(ws.clients.get_client_by_id(&client_id).is_none());
    assert!(ws.cases.get_case_by_id(&case_id).is_none());
    assert!(ws.financials.get_financials_by_case_id(&case_id).expenses.is_empty());
    Ok(())
}

#[tokio::test]
async fn strict_workspace_detects_concurrent_writes() -> Result<()> {
    let server = common::spawn_server().await?;
    let mut first = workspace(&server).await?.strict(true);
    let mut second = workspace(&server).await?.strict(true);

    first.create_client(object(json!({"name": "Maria"}))).await?;

    let result = second.create_client(object(json!({"name": "João"}))).await;
    let err = result.as_ref().err().map(|e| e.is_conflict());
    assert_eq!(err, Some(true));
    assert!(second.clients.all().is_empty());
    assert_eq!(Toast::from_result(&result, "Cliente criado").kind, ToastKind::Error);

    second.hydrate().await?;
    second.create_client(object(json!({"name": "João"}))).await?;
    assert_eq!(second.clients.all().len(), 2);
    Ok(())
}

#[tokio::test]
async fn documents_round_trip_through_workspace() -> Result<()> {
    let server = common::spawn_server().await?;
    let mut ws = workspace(&server).await?;
    ws.create_client(object(json!({"name": "Maria"}))).await?;
    let client_id = ws.clients.all()[0].id.clone();
    ws.create_case(object(json!({"clientId": client_id}))).await?;
    let case_id = ws.cases.all()[0].id.clone();

    let document = ws
        .upload_document(&case_id, "cnis.txt", Some("text/plain"), b"extrato".to_vec())
        .await?;
    assert_eq!(ws.cases.get_case_by_id(&case_id).map(|c| c.documents.len()), Some(1));

    let file = ws.download_document(&case_id, &document.id).await?;
    assert_eq!(file.bytes, b"extrato".to_vec());
    assert_eq!(file.content_type, "text/plain");

    ws.delete_document(&case_id, &document.id).await?;
    assert_eq!(ws.cases.get_case_by_id(&case_id).map(|c| c.documents.len()), Some(0));
    Ok(())
}

#[tokio::test]
async fn settings_sections_are_edited_through_workspace() -> Result<()> {
    let server = common::spawn_server().await?;
    let mut ws = workspace(&server).await?;

    ws.add_document_template(object(json!({"name": "Contrato", "content": "Contrato de {{client.name}}"})))
        .await?;
    let templates = &ws.settings.get().document_templates;
    assert_eq!(templates.len(), 2);
    let template_id = templates[1].id.clone();

    ws.update_document_template(&template_id, object(json!({"name": "Contrato de honorários"})))
        .await?;
    assert_eq!(ws.settings.get().document_templates[1].name, "Contrato de honorários");
    ws.delete_document_template(&template_id).await?;
    assert_eq!(ws.settings.get().document_templates.len(), 1);

    ws.update_branding(object(json!({"primaryColor": "#123456"}))).await?;
    assert_eq!(ws.settings.get().branding_settings.primary_color, "#123456");

    ws.update_notification_settings(object(json!({"urgentTaskThresholdDays": 3}))).await?;
    assert_eq!(ws.settings.urgent_task_threshold_days(), 3);

    ws.reset(Scope::Settings).await?;
    assert_eq!(ws.settings.urgent_task_threshold_days(), 7);
    Ok(())
}

#[tokio::test]
async fn case_removal_wrappers_clear_financials() -> Result<()> {
    let server = common::spawn_server().await?;
    let mut ws = workspace(&server).await?;

    ws.create_client(object(json!({"name": "Maria"}))).await?;
    let client_id = ws.clients.all()[0].id.clone();
    ws.create_case(object(json!({"clientId": client_id}))).await?;
    ws.create_case(object(json!({"clientId": client_id}))).await?;
    let first_case = ws.cases.all()[0].id.clone();
    ws.add_fee(object(json!({"caseId": first_case, "amount": 300, "dueDate": "2024-05-01"})), None)
        .await?;

    ws.remove_cases_by_client(&client_id).await?;
    assert!(ws.cases.all().is_empty());
    assert!(ws.financials.fees().is_empty());
    assert!(ws.clients.get_client_by_id(&client_id).is_some());

    ws.create_case(object(json!({"clientId": client_id}))).await?;
    let case_id = ws.cases.all()[0].id.clone();
    ws.add_expense(object(json!({"caseId": case_id, "amount": 40, "date": "2024-05-02"}))).await?;

    ws.reset(Scope::Cases).await?;
    assert!(ws.cases.all().is_empty());
    assert!(ws.financials.expenses().is_empty());

    // Server agrees after a fresh load
    let other = workspace(&server).await?;
    assert!(other.financials.fees().is_empty());
    assert!(other.financials.expenses().is_empty());
    Ok(())
}
