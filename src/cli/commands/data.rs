use serde_json::{json, Value};

use crate::cli::utils::{output_success, output_value, read_payload};
use crate::cli::OutputFormat;
use crate::client::{ApiClient, Workspace};
use crate::database::models::ScopeData;
use crate::types::Scope;

/// `lexcrm bootstrap [--scope S]`
pub async fn bootstrap(api: &ApiClient, scope: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = api.fetch_bootstrap(true).await?;
    let versions = snapshot.versions.to_header_value();

    let body = match scope {
        None => serde_json::to_value(&snapshot.data)?,
        Some(name) => {
            let scope: Scope = name.parse().map_err(|_| anyhow::anyhow!("Unknown scope '{}'", name))?;
            let data = snapshot
                .data
                .into_scopes()
                .into_iter()
                .find(|d| d.scope() == scope)
                .unwrap_or_else(|| ScopeData::default_for(scope));
            data.to_wire()?
        }
    };

    output_value(&output_format, &format!("Snapshot ({})", versions), &body)
}

/// `lexcrm command <resource> <action> [payload]`
pub async fn command(
    api: ApiClient,
    resource: &str,
    action: &str,
    payload: Option<&str>,
    strict: bool,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let scope: Scope = resource
        .parse()
        .map_err(|_| anyhow::anyhow!("ação desconhecida: recurso '{}'", resource))?;
    let payload = read_payload(payload)?.unwrap_or_else(|| json!({}));

    let mut workspace = Workspace::new(api).strict(strict);
    if strict {
        workspace.hydrate().await?;
    }
    workspace.command(scope, action, payload).await?;

    let versions = workspace.versions().to_header_value();
    let body = current_scope(&workspace, scope)?;
    match output_format {
        OutputFormat::Json => output_value(&output_format, "", &json!({ "versions": versions, "data": body })),
        OutputFormat::Text => {
            output_success(&output_format, &format!("{}.{} applied ({})", scope, action, versions), None)?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
    }
}

fn current_scope(workspace: &Workspace, scope: Scope) -> anyhow::Result<Value> {
    let data = match scope {
        Scope::Clients => ScopeData::Clients(workspace.clients.all().to_vec()),
        Scope::Cases => ScopeData::Cases(workspace.cases.all().to_vec()),
        Scope::Financials => ScopeData::Financials(crate::database::models::Financials {
            fees: workspace.financials.fees().to_vec(),
            expenses: workspace.financials.expenses().to_vec(),
        }),
        Scope::Settings => ScopeData::Settings(workspace.settings.get().clone()),
    };
    Ok(data.to_wire()?)
}
