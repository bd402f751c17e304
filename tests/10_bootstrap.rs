mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn fresh_store_serves_defaults() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = server.client.get(server.url("/api/bootstrap")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let versions = res
        .headers()
        .get("x-scope-versions")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    for scope in ["clients", "cases", "financials", "settings"] {
        assert!(versions.contains(&format!("{}=", scope)), "missing {} in {}", scope, versions);
    }

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["clients"], json!([]));
    assert_eq!(body["cases"], json!([]));
    assert_eq!(body["fees"], json!([]));
    assert_eq!(body["expenses"], json!([]));
    let benefit_types = body["settings"]["benefitTypes"].as_array().cloned().unwrap_or_default();
    assert!(benefit_types.contains(&json!("Salário-Maternidade")), "{}", body["settings"]);
    assert_eq!(body["settings"]["notificationSettings"]["urgentTaskThresholdDays"], 7);
    Ok(())
}

#[tokio::test]
async fn bootstrap_reflects_committed_commands() -> Result<()> {
    let server = common::spawn_server().await?;
    let clients = server.ok("clients", "create", json!({"name": "Maria da Silva"})).await?;
    let client_id = common::last_id(&clients);
    let cases = server.ok("cases", "create", json!({"clientId": client_id, "title": "Aposentadoria"})).await?;
    let fees = server
        .ok(
            "financials",
            "addFee",
            json!({"caseId": common::last_id(&cases), "amount": 1500, "dueDate": "2024-09-10", "type": "Inicial"}),
        )
        .await?;
    let settings = server.ok("settings", "addCaseStatus", json!({"name": "Suspenso"})).await?;

    let body = server.bootstrap().await?;
    assert_eq!(body["clients"], clients);
    assert_eq!(body["cases"], cases);
    assert_eq!(body["fees"], fees["fees"]);
    assert_eq!(body["settings"], settings);
    Ok(())
}

#[tokio::test]
async fn health_and_root_describe_the_service() -> Result<()> {
    let server = common::spawn_server().await?;

    let health = server.client.get(server.url("/health")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);
    let health = health.json::<serde_json::Value>().await?;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["storage"], "memory");

    let root = server.client.get(server.url("/")).send().await?.json::<serde_json::Value>().await?;
    assert_eq!(root["name"], "LexCRM API");
    Ok(())
}
