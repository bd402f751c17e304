pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ClientConfig};

#[derive(Parser)]
#[command(name = "lexcrm")]
#[command(about = "LexCRM CLI - Serve and operate the legal-practice CRM API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "API base URL (overrides LEXCRM_API_BASE_URL)")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the API server with the configured storage")]
    Serve,

    #[command(about = "Print the full bootstrap snapshot or a single scope")]
    Bootstrap {
        #[arg(long, help = "Only this scope (clients, cases, financials, settings)")]
        scope: Option<String>,
    },

    #[command(about = "Send a resource/action command (payload as JSON argument or from stdin)")]
    Command {
        #[arg(help = "Resource: clients, cases, financials, settings")]
        resource: String,
        #[arg(help = "Action name, e.g. create, addFee, toggleTask")]
        action: String,
        #[arg(help = "JSON payload; '-' reads stdin")]
        payload: Option<String>,
        #[arg(long, help = "Send the current scope versions and fail on concurrent changes")]
        strict: bool,
    },

    #[command(about = "Upload a file to a case")]
    Upload {
        #[arg(help = "Case ID")]
        case_id: String,
        #[arg(help = "File to upload")]
        path: String,
        #[arg(long, help = "Content type (guessed from the extension otherwise)")]
        content_type: Option<String>,
    },

    #[command(about = "Download a case file")]
    Download {
        #[arg(help = "Case ID")]
        case_id: String,
        #[arg(help = "Document ID")]
        document_id: String,
        #[arg(long, short, help = "Output file path (stdout when omitted)")]
        output: Option<String>,
    },

    #[command(about = "Remove a file from a case")]
    RemoveDocument {
        #[arg(help = "Case ID")]
        case_id: String,
        #[arg(help = "Document ID")]
        document_id: String,
    },

    #[command(about = "Reports computed from the current server state")]
    Report {
        #[command(subcommand)]
        cmd: commands::report::ReportCommands,
    },

    #[command(about = "Show effective server and client configuration")]
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::from_env();
        match &self.api_url {
            Some(url) => config.with_base_url(url.trim_end_matches('/')),
            None => config,
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client_config = cli.client_config();

    match cli.command {
        Commands::Serve => commands::server::serve().await,
        Commands::Config => commands::server::show_config(&client_config, output_format),
        Commands::Bootstrap { scope } => {
            let api = ApiClient::new(client_config)?;
            commands::data::bootstrap(&api, scope.as_deref(), output_format).await
        }
        Commands::Command { resource, action, payload, strict } => {
            let api = ApiClient::new(client_config)?;
            commands::data::command(api, &resource, &action, payload.as_deref(), strict, output_format).await
        }
        Commands::Upload { case_id, path, content_type } => {
            let api = ApiClient::new(client_config)?;
            commands::documents::upload(&api, &case_id, &path, content_type.as_deref(), output_format).await
        }
        Commands::Download { case_id, document_id, output } => {
            let api = ApiClient::new(client_config)?;
            commands::documents::download(&api, &case_id, &document_id, output.as_deref(), output_format).await
        }
        Commands::RemoveDocument { case_id, document_id } => {
            let api = ApiClient::new(client_config)?;
            commands::documents::remove(&api, &case_id, &document_id, output_format).await
        }
        Commands::Report { cmd } => {
            let api = ApiClient::new(client_config)?;
            commands::report::handle(api, cmd, output_format).await
        }
    }
}
