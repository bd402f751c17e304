//! Case file attachments: metadata lives on the case, bytes in the blob store.

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::database::models::{new_id, Case, CaseDocument, Entity, ScopeData};
use crate::database::repository::{CommittedScope, RepositoryError, ScopeRepository};
use crate::database::store::{StoreError, StoredBlob};
use crate::types::ScopeVersions;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{0}")]
    Validation(String),

    #[error("Arquivo excede o limite de {limit_mb} MB")]
    TooLarge { limit_mb: u64 },

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A file received from the upload form
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub case_id: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub document: CaseDocument,
    pub case: Case,
    pub versions: ScopeVersions,
}

#[derive(Debug, Clone)]
pub struct RemovalOutcome {
    pub case_id: String,
    pub document_id: String,
    pub case: Case,
    pub versions: ScopeVersions,
}

#[derive(Debug, Clone)]
pub struct DocumentDownload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct DocumentService {
    repo: ScopeRepository,
    max_upload_mb: u64,
}

impl DocumentService {
    pub fn new(repo: ScopeRepository, max_upload_mb: u64) -> Self {
        Self { repo, max_upload_mb }
    }

    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }

    pub fn check_size(&self, len: usize) -> Result<(), DocumentError> {
        if len > self.max_upload_bytes() {
            return Err(DocumentError::TooLarge { limit_mb: self.max_upload_mb });
        }
        Ok(())
    }

    pub async fn upload(&self, upload: DocumentUpload) -> Result<UploadOutcome, DocumentError> {
        if upload.case_id.trim().is_empty() {
            return Err(DocumentError::Validation("caseId não informado".into()));
        }
        self.check_size(upload.bytes.len())?;

        let mut session = self.repo.session();
        let mut cases = session.cases().await?;
        let case = cases
            .iter_mut()
            .find(|c| c.id == upload.case_id)
            .ok_or_else(|| DocumentError::NotFound(Case::NOT_FOUND.into()))?;

        let content_type = upload
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let document = CaseDocument {
            id: new_id(),
            name: upload.file_name.clone(),
            content_type: content_type.clone(),
            size: upload.bytes.len() as u64,
            uploaded_at: Utc::now(),
            checksum: format!("{:x}", Sha256::digest(&upload.bytes)),
            extra: Default::default(),
        };

        // Bytes first so metadata never points at a missing blob
        self.repo
            .store()
            .put_blob(StoredBlob {
                case_id: upload.case_id.clone(),
                document_id: document.id.clone(),
                content_type,
                file_name: upload.file_name,
                bytes: upload.bytes,
                created_at: document.uploaded_at,
            })
            .await?;

        case.documents.push(document.clone());
        case.touch();
        let case = case.clone();
        session.stage(ScopeData::Cases(cases));

        match session.commit().await {
            Ok(committed) => {
                info!("Stored {} ({} bytes) on case {}", document.name, document.size, case.id);
                Ok(UploadOutcome { document, case, versions: versions_of(&committed) })
            }
            Err(e) => {
                if let Err(cleanup) = self.repo.store().delete_blob(&case.id, &document.id).await {
                    warn!("Failed to remove orphaned file {}: {}", document.id, cleanup);
                }
                Err(e.into())
            }
        }
    }

    pub async fn delete(&self, case_id: &str, document_id: &str) -> Result<RemovalOutcome, DocumentError> {
        let mut session = self.repo.session();
        let mut cases = session.cases().await?;
        let case = cases
            .iter_mut()
            .find(|c| c.id == case_id)
            .ok_or_else(|| DocumentError::NotFound(Case::NOT_FOUND.into()))?;
        let index = case
            .documents
            .iter()
            .position(|d| d.id == document_id)
            .ok_or_else(|| DocumentError::NotFound(CaseDocument::NOT_FOUND.into()))?;
        case.documents.remove(index);
        case.touch();
        let case = case.clone();
        session.stage(ScopeData::Cases(cases));
        let committed = session.commit().await?;

        match self.repo.store().delete_blob(case_id, document_id).await {
            Ok(true) => {}
            Ok(false) => warn!("File {} of case {} had no stored bytes", document_id, case_id),
            Err(e) => warn!("Failed to remove stored file {}: {}", document_id, e),
        }

        Ok(RemovalOutcome {
            case_id: case_id.to_string(),
            document_id: document_id.to_string(),
            case,
            versions: versions_of(&committed),
        })
    }

    pub async fn download(&self, case_id: &str, document_id: &str) -> Result<DocumentDownload, DocumentError> {
        let blob = self
            .repo
            .store()
            .get_blob(case_id, document_id)
            .await?
            .ok_or_else(|| DocumentError::NotFound(CaseDocument::NOT_FOUND.into()))?;
        Ok(DocumentDownload { file_name: blob.file_name, content_type: blob.content_type, bytes: blob.bytes })
    }
}

fn versions_of(committed: &[CommittedScope]) -> ScopeVersions {
    let mut versions = ScopeVersions::default();
    for scope in committed {
        versions.set(scope.data.scope(), scope.version);
    }
    versions
}
