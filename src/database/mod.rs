pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

pub use manager::DatabaseManager;
pub use memory::MemoryScopeStore;
pub use postgres::PgScopeStore;
pub use repository::{CommittedScope, LoadedScope, RepositoryError, ScopeRepository, ScopeSession};
pub use store::{ScopeStore, StoreError, StoredBlob};
