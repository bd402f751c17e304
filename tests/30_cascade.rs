mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn references(entries: &Value, key: &str, id: &str) -> bool {
    entries.as_array().map_or(false, |items| items.iter().any(|e| e[key] == id))
}

#[tokio::test]
async fn delete_case_then_client_leaves_no_dangling_records() -> Result<()> {
    let server = common::spawn_server().await?;
    let clients = server.ok("clients", "create", json!({"name": "Maria"})).await?;
    let client_id = common::last_id(&clients);
    let cases = server.ok("cases", "create", json!({"clientId": client_id, "title": "BPC/LOAS"})).await?;
    let case_id = common::last_id(&cases);
    server
        .ok("financials", "addFee", json!({"caseId": case_id, "amount": 800, "dueDate": "2024-08-01", "type": "Inicial"}))
        .await?;
    server
        .ok("financials", "addExpense", json!({"caseId": case_id, "amount": 45.9, "date": "2024-07-02"}))
        .await?;

    let after_case = server.ok("cases", "delete", json!({"id": case_id})).await?;
    assert_eq!(after_case["cases"], json!([]));
    assert!(!references(&after_case["fees"], "caseId", &case_id));
    assert!(!references(&after_case["expenses"], "caseId", &case_id));

    server.ok("clients", "delete", json!({"id": client_id})).await?;

    let body = server.bootstrap().await?;
    assert_eq!(body["clients"], json!([]));
    assert!(!references(&body["cases"], "clientId", &client_id));
    assert_eq!(body["fees"], json!([]));
    assert_eq!(body["expenses"], json!([]));
    Ok(())
}

#[tokio::test]
async fn client_delete_spares_other_clients() -> Result<()> {
    let server = common::spawn_server().await?;
    let mut case_ids = Vec::new();
    let mut client_ids = Vec::new();
    for name in ["Maria", "João"] {
        let clients = server.ok("clients", "create", json!({"name": name})).await?;
        let client_id = common::last_id(&clients);
        for title in ["Aposentadoria", "Revisão"] {
            let cases = server.ok("cases", "create", json!({"clientId": client_id, "title": title})).await?;
            let case_id = common::last_id(&cases);
            server
                .ok("financials", "addFee", json!({"caseId": case_id, "amount": 100, "dueDate": "2024-08-01"}))
                .await?;
            case_ids.push(case_id);
        }
        client_ids.push(client_id);
    }

    let body = server.ok("clients", "delete", json!({"id": client_ids[0]})).await?;
    for key in ["clients", "cases", "fees", "expenses"] {
        assert!(body.get(key).is_some(), "composite result lacks {}", key);
    }

    let snapshot = server.bootstrap().await?;
    assert_eq!(snapshot["clients"].as_array().map(|c| c.len()), Some(1));
    let remaining: Vec<&str> = snapshot["cases"]
        .as_array()
        .map(|cases| cases.iter().filter_map(|c| c["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(remaining, vec![case_ids[2].as_str(), case_ids[3].as_str()]);
    for fee in snapshot["fees"].as_array().cloned().unwrap_or_default() {
        assert!(remaining.contains(&fee["caseId"].as_str().unwrap_or_default()));
    }
    Ok(())
}

#[tokio::test]
async fn removing_a_client_removes_its_files() -> Result<()> {
    let server = common::spawn_server().await?;
    let clients = server.ok("clients", "create", json!({"name": "Maria"})).await?;
    let client_id = common::last_id(&clients);
    let cases = server.ok("cases", "create", json!({"clientId": client_id})).await?;
    let case_id = common::last_id(&cases);

    let form = reqwest::multipart::Form::new().text("caseId", case_id.clone()).part(
        "file",
        reqwest::multipart::Part::bytes(b"laudo".to_vec()).file_name("laudo.txt").mime_str("text/plain")?,
    );
    let uploaded = server
        .client
        .post(server.url("/api/documents/upload"))
        .multipart(form)
        .send()
        .await?
        .json::<Value>()
        .await?;
    let document_id = uploaded["document"]["id"].as_str().unwrap_or_default().to_string();

    server.ok("clients", "delete", json!({"id": client_id})).await?;

    let res = server
        .client
        .get(server.url(&format!("/api/documents/{}/{}", case_id, document_id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
