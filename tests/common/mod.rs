#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use lexcrm_api::config::AppConfig;
use lexcrm_api::database::MemoryScopeStore;
use lexcrm_api::{app, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Serve the router on a fresh in-memory store. The server task lives as
    /// long as the test's runtime.
    pub async fn spawn_with(config: AppConfig) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = AppState::new(Arc::new(MemoryScopeStore::new()), &config);
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let server = Self { port, base_url, client: reqwest::Client::new() };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /api/commands and return status plus JSON body
    pub async fn command(&self, resource: &str, action: &str, payload: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .post(self.url("/api/commands"))
            .json(&json!({ "resource": resource, "action": action, "payload": payload }))
            .send()
            .await?;
        let status = res.status();
        let body = res.json::<Value>().await?;
        Ok((status, body))
    }

    /// Command that must succeed
    pub async fn ok(&self, resource: &str, action: &str, payload: Value) -> Result<Value> {
        let (status, body) = self.command(resource, action, payload).await?;
        anyhow::ensure!(status == StatusCode::OK, "{}.{} failed with {}: {}", resource, action, status, body);
        Ok(body)
    }

    pub async fn bootstrap(&self) -> Result<Value> {
        let res = self.client.get(self.url("/api/bootstrap")).send().await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "bootstrap failed with {}", res.status());
        Ok(res.json::<Value>().await?)
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    TestServer::spawn_with(AppConfig::development()).await
}

/// id of the last element of an array body
pub fn last_id(items: &Value) -> String {
    items
        .as_array()
        .and_then(|a| a.last())
        .and_then(|v| v["id"].as_str())
        .unwrap_or_default()
        .to_string()
}
