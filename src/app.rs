use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseManager, MemoryScopeStore, PgScopeStore, ScopeRepository, ScopeStore, StoreError};
use crate::handlers;
use crate::middleware::cors_middleware;
use crate::services::{BootstrapService, CommandService, DocumentService};

/// Multipart framing on top of the file itself
const UPLOAD_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared services handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub repo: ScopeRepository,
    pub bootstrap: BootstrapService,
    pub commands: CommandService,
    pub documents: DocumentService,
    pub max_request_bytes: usize,
    pub request_logging: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn ScopeStore>, config: &AppConfig) -> Self {
        let repo = ScopeRepository::new(store);
        Self {
            bootstrap: BootstrapService::new(repo.clone()),
            commands: CommandService::new(repo.clone()),
            documents: DocumentService::new(repo.clone(), config.uploads.max_upload_mb),
            max_request_bytes: config.api.max_request_size_bytes,
            request_logging: config.api.enable_request_logging,
            repo,
        }
    }

    /// Open the configured storage backend
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn ScopeStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryScopeStore::new()),
            StorageBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.storage).await?;
                DatabaseManager::ensure_schema(&pool).await?;
                Arc::new(PgScopeStore::new(pool))
            }
        };
        info!("Using {} storage", store.name());
        Ok(Self::new(store, config))
    }
}

pub fn app(state: AppState) -> Router {
    let upload_limit = state.documents.max_upload_bytes().saturating_add(UPLOAD_OVERHEAD_BYTES);
    let request_limit = state.max_request_bytes;
    let request_logging = state.request_logging;

    let router = Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        // CRM API
        .merge(api_routes().layer(DefaultBodyLimit::max(request_limit)))
        .merge(document_routes(upload_limit))
        .with_state(state)
        // Global middleware
        .layer(axum::middleware::from_fn(cors_middleware));

    if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bootstrap", get(handlers::bootstrap::get))
        .route("/api/commands", post(handlers::commands::post))
}

fn document_routes(upload_limit: usize) -> Router<AppState> {
    use handlers::documents;

    Router::new()
        .route(
            "/api/documents/upload",
            post(documents::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/documents/:case_id/:document_id", get(documents::download))
        .route("/api/cases/:case_id/documents/:document_id", delete(documents::delete))
}

/// Logging setup shared by the server binary and `lexcrm serve`
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lexcrm_api=info,tower_http=info"));
    // A second call (tests, CLI after server) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(config).await?;
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    info!("LexCRM API listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(AppState::new(Arc::new(MemoryScopeStore::new()), &AppConfig::development()))
    }

    #[tokio::test]
    async fn preflight_is_answered_before_routing() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/not-a-route")
            .header("origin", "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["access-control-allow-origin"], "http://localhost:5173");
    }

    #[tokio::test]
    async fn command_response_carries_written_scope_version() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/commands")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"resource":"clients","action":"create","payload":{"name":"Maria"}}"#))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-scope-versions"], "clients=2");
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let request = Request::builder()
            .uri("/api/documents/case/doc")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
