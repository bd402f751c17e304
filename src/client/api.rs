use reqwest::{multipart, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::config::ClientConfig;
use crate::database::models::{Bootstrap, Case, CaseDocument};
use crate::services::CommandRequest;
use crate::types::{ScopeVersions, SCOPE_VERSIONS_HEADER};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Arquivo de {size} bytes excede o limite de {limit_mb} MB")]
    UploadTooLarge { size: u64, limit_mb: u64 },

    #[error("Falha de comunicação com o servidor: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resposta inesperada do servidor: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("URL inválida: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Another session wrote the scope first; reload and retry
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT.as_u16())
    }
}

/// A response body together with the scope versions it reflects
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub data: T,
    pub versions: ScopeVersions,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedDocument {
    pub document: CaseDocument,
    pub case: Case,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedDocument {
    pub case_id: String,
    pub document_id: String,
    pub case: Case,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedFile {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for the CRM API. The bootstrap snapshot is cached until the
/// next successful write.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
    cache: Mutex<Option<Versioned<Bootstrap>>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(&config.api_base_url)?;
        // Keep any path prefix when joining endpoint paths
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            config,
            cache: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn fetch_bootstrap(&self, force: bool) -> Result<Versioned<Bootstrap>, ClientError> {
        let mut cache = self.cache.lock().await;
        if !force {
            if let Some(cached) = cache.as_ref() {
                return Ok(cached.clone());
            }
        }
        let response = self.send(self.request(Method::GET, "/api/bootstrap")?).await?;
        let snapshot = decode_versioned::<Bootstrap>(response).await?;
        *cache = Some(snapshot.clone());
        Ok(snapshot)
    }

    pub async fn execute_command(&self, command: &CommandRequest) -> Result<Versioned<Value>, ClientError> {
        debug!("Sending command {}.{}", command.resource, command.action);
        let request = self.request(Method::POST, "/api/commands")?.json(command);
        let response = self.send(request).await?;
        self.invalidate().await;
        decode_versioned(response).await
    }

    pub async fn upload_document(
        &self,
        case_id: &str,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Versioned<UploadedDocument>, ClientError> {
        let size = bytes.len() as u64;
        if size > self.config.upload_limit_bytes() {
            return Err(ClientError::UploadTooLarge { size, limit_mb: self.config.upload_limit_mb });
        }

        let mut part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        if let Some(content_type) = content_type {
            part = part.mime_str(content_type)?;
        }
        let form = multipart::Form::new().text("caseId", case_id.to_string()).part("file", part);

        let request = self.request(Method::POST, "/api/documents/upload")?.multipart(form);
        let response = self.send(request).await?;
        self.invalidate().await;
        decode_versioned(response).await
    }

    pub async fn delete_document(
        &self,
        case_id: &str,
        document_id: &str,
    ) -> Result<Versioned<RemovedDocument>, ClientError> {
        let path = format!("/api/cases/{}/documents/{}", case_id, document_id);
        let response = self.send(self.request(Method::DELETE, &path)?).await?;
        self.invalidate().await;
        decode_versioned(response).await
    }

    pub async fn download_document(&self, case_id: &str, document_id: &str) -> Result<DownloadedFile, ClientError> {
        let path = format!("/api/documents/{}/{}", case_id, document_id);
        let response = self.send(self.request(Method::GET, &path)?).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok(DownloadedFile { content_type, bytes })
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        let response = self.send(self.request(Method::GET, "/health")?).await?;
        Ok(response.json().await?)
    }

    async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        Ok(self.http.request(method, url))
    }

    /// Send and turn non-2xx answers into `ClientError::Api` with the server's message
    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| if text.is_empty() { status.to_string() } else { text });
        Err(ClientError::Api { status: status.as_u16(), message })
    }
}

async fn decode_versioned<T: DeserializeOwned>(response: Response) -> Result<Versioned<T>, ClientError> {
    let versions = response
        .headers()
        .get(SCOPE_VERSIONS_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(ScopeVersions::parse_header)
        .unwrap_or_default();
    let bytes = response.bytes().await?;
    let data = serde_json::from_slice(&bytes)?;
    Ok(Versioned { data, versions })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oversized_upload_fails_before_any_request() {
        // Nothing listens on this port; the size check must trip first
        let config = ClientConfig { upload_limit_mb: 1, ..ClientConfig::default() }.with_base_url("http://127.0.0.1:9");
        let api = ApiClient::new(config).unwrap();
        let err = api
            .upload_document("case", "big.bin", None, vec![0u8; 1024 * 1024 + 1])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UploadTooLarge { limit_mb: 1, .. }));
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let config = ClientConfig::default().with_base_url("not a url");
        assert!(matches!(ApiClient::new(config), Err(ClientError::InvalidUrl(_))));
    }
}
