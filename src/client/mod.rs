//! Client side of the CRM: HTTP access to the API plus local stores that
//! mirror the server scopes.

pub mod api;
pub mod config;
pub mod feedback;
pub mod stores;
pub mod workspace;

pub use api::{ApiClient, ClientError, DownloadedFile, RemovedDocument, UploadedDocument, Versioned};
pub use config::ClientConfig;
pub use feedback::{Toast, ToastKind};
pub use stores::{CasesStore, ClientsStore, FinancialStore, FinancialView, SettingsStore};
pub use workspace::Workspace;
