pub mod bootstrap;
pub mod commands;
pub mod documents;

pub use bootstrap::{BootstrapService, BootstrapSnapshot};
pub use commands::{CommandError, CommandOutcome, CommandRequest, CommandService};
pub use documents::{DocumentDownload, DocumentError, DocumentService, DocumentUpload, RemovalOutcome, UploadOutcome};
