mod common;

use anyhow::Result;
use lexcrm_api::config::AppConfig;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn case_for(server: &common::TestServer) -> Result<String> {
    let clients = server.ok("clients", "create", json!({"name": "Maria"})).await?;
    let cases = server.ok("cases", "create", json!({"clientId": common::last_id(&clients)})).await?;
    Ok(common::last_id(&cases))
}

fn form(case_id: &str, name: &str, content_type: &str, bytes: Vec<u8>) -> Result<Form> {
    let part = Part::bytes(bytes).file_name(name.to_string()).mime_str(content_type)?;
    Ok(Form::new().text("caseId", case_id.to_string()).part("file", part))
}

#[tokio::test]
async fn upload_then_download_returns_same_bytes() -> Result<()> {
    let server = common::spawn_server().await?;
    let case_id = case_for(&server).await?;
    let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

    let res = server
        .client
        .post(server.url("/api/documents/upload"))
        .multipart(form(&case_id, "rg.pdf", "application/pdf", bytes.clone())?)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-scope-versions").is_some());
    let body = res.json::<Value>().await?;
    let document = &body["document"];
    assert_eq!(document["name"], "rg.pdf");
    assert_eq!(document["size"], 4096);
    assert_eq!(body["case"]["documents"][0]["id"], document["id"]);

    let document_id = document["id"].as_str().unwrap_or_default().to_string();
    let res = server
        .client
        .get(server.url(&format!("/api/documents/{}/{}", case_id, document_id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/pdf")
    );
    assert_eq!(res.bytes().await?.to_vec(), bytes);

    let res = server
        .client
        .delete(server.url(&format!("/api/cases/{}/documents/{}", case_id, document_id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["documentId"], document_id.as_str());
    assert_eq!(body["case"]["documents"], json!([]));

    let res = server
        .client
        .get(server.url(&format!("/api/documents/{}/{}", case_id, document_id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn oversized_upload_is_rejected() -> Result<()> {
    let mut config = AppConfig::development();
    config.uploads.max_upload_mb = 1;
    let server = common::TestServer::spawn_with(config).await?;
    let case_id = case_for(&server).await?;

    let res = server
        .client
        .post(server.url("/api/documents/upload"))
        .multipart(form(&case_id, "big.bin", "application/octet-stream", vec![7u8; 1024 * 1024 + 16])?)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.json::<Value>().await?["code"], "PAYLOAD_TOO_LARGE");

    let snapshot = server.bootstrap().await?;
    assert_eq!(snapshot["cases"][0]["documents"], json!([]));
    Ok(())
}

#[tokio::test]
async fn upload_requires_known_case() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = server
        .client
        .post(server.url("/api/documents/upload"))
        .multipart(form("missing", "a.txt", "text/plain", b"x".to_vec())?)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .client
        .post(server.url("/api/documents/upload"))
        .multipart(Form::new().text("caseId", "whatever"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn cors_preflight_and_origin_echo() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/api/commands"))
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        res.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );

    let res = server.client.get(server.url("/api/bootstrap")).send().await?;
    assert_eq!(
        res.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let exposed = res
        .headers()
        .get("access-control-expose-headers")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    assert!(exposed.contains("x-scope-versions"), "{}", exposed);
    Ok(())
}

#[tokio::test]
async fn missing_file_is_rejected_but_empty_file_is_stored() -> Result<()> {
    let server = common::spawn_server().await?;
    let case_id = case_for(&server).await?;

    let res = server
        .client
        .post(server.url("/api/documents/upload"))
        .multipart(Form::new().text("caseId", case_id.clone()))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["message"], "file não informado");

    let res = server
        .client
        .post(server.url("/api/documents/upload"))
        .multipart(form(&case_id, "vazio.txt", "text/plain", Vec::new())?)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["document"]["size"], 0);
    Ok(())
}
