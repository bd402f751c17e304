use lexcrm_api::{app, config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, LEXCRM_STORAGE, etc.
    let _ = dotenvy::dotenv();

    app::init_tracing();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting LexCRM API in {:?} mode", config.environment);

    app::serve(config).await
}
