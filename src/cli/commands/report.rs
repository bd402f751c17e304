use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, output_value};
use crate::cli::OutputFormat;
use crate::client::{ApiClient, Toast, Workspace};

#[derive(Subcommand)]
pub enum ReportCommands {
    #[command(about = "Incomplete tasks due within the notification threshold, overdue included")]
    UrgentTasks {
        #[arg(long, help = "Threshold in days (defaults to the notification settings)")]
        days: Option<u32>,
    },

    #[command(about = "Cases and financial totals of one client")]
    Client {
        #[arg(help = "Client ID")]
        client_id: String,
    },
}

pub async fn handle(api: ApiClient, cmd: ReportCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut workspace = Workspace::new(api);
    workspace.hydrate().await?;

    match cmd {
        ReportCommands::UrgentTasks { days } => {
            let threshold = days.unwrap_or_else(|| workspace.settings.urgent_task_threshold_days());
            let tasks = workspace.cases.get_urgent_tasks(Utc::now().date_naive(), threshold);
            if tasks.is_empty() {
                return output_empty_collection(&output_format, "tasks", "No urgent tasks");
            }
            match output_format {
                OutputFormat::Json => output_value(&output_format, "", &json!({ "tasks": tasks })),
                OutputFormat::Text => {
                    for urgent in &tasks {
                        let when = if urgent.days_remaining < 0 {
                            format!("overdue {}d", -urgent.days_remaining)
                        } else {
                            format!("in {}d", urgent.days_remaining)
                        };
                        println!(
                            "{}  {:<12} case {}  {}",
                            urgent.task.due_date, when, urgent.case_id, urgent.task.description
                        );
                    }
                    let overdue = tasks.iter().filter(|u| u.days_remaining < 0).count();
                    if overdue > 0 {
                        println!("{}", Toast::warning(format!("{} tarefa(s) atrasada(s)", overdue)));
                    }
                    Ok(())
                }
            }
        }
        ReportCommands::Client { client_id } => {
            let client = workspace
                .clients
                .get_client_by_id(&client_id)
                .ok_or_else(|| anyhow::anyhow!("Cliente não encontrado"))?;
            let cases = workspace.cases.get_cases_by_client_id(&client_id);
            let totals = workspace
                .financials
                .get_financials_by_client_id(&client_id, &workspace.cases)
                .totals();

            let report = json!({
                "client": client,
                "cases": cases,
                "totals": totals,
            });
            output_value(&output_format, &format!("Client {} ({} cases)", client.name, cases.len()), &report)
        }
    }
}
