//! Model management handlers: list, pull, health

use super::display;
use crate::config::CrewConfig;
use crate::error::{CrewError, Result};
use crate::health::{HealthChecker, HealthStatus};
use colored::Colorize;
use llm::local::OllamaClient;
use llm::{ModelInfo, ProviderUtils};
use tabled::{Table, Tabled};

/// Model display row for table output
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Active")]
    active: String,
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn model_row(model: &ModelInfo, active: &str) -> ModelRow {
    ModelRow {
        name: model.id.clone(),
        size: model.size.map(human_size).unwrap_or_else(|| "-".to_string()),
        modified: model
            .modified_at
            .as_deref()
            .and_then(|m| m.get(..10))
            .unwrap_or("-")
            .to_string(),
        active: if model.matches(active) { "✓".green().to_string() } else { String::new() },
    }
}

/// Handle `crew models`
pub async fn handle_models(config: &CrewConfig, json: bool) -> Result<()> {
    let client = OllamaClient::new(config.llm_config())?;
    let models = client.fetch_models().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    if models.is_empty() {
        println!("{}", "No models installed".yellow());
        println!("  Run 'crew pull {}' to download the configured model.", config.llm.model);
        return Ok(());
    }

    let rows: Vec<ModelRow> = models
        .iter()
        .map(|m| model_row(m, client.current_model()))
        .collect();
    println!("{}", Table::new(rows));
    if !models.iter().any(|m| m.matches(&config.llm.model)) {
        println!(
            "{}",
            format!("⚠ Configured model '{}' is not installed", config.llm.model).yellow()
        );
    }
    Ok(())
}

/// Handle `crew pull <model>`
pub async fn handle_pull(config: &CrewConfig, model: &str) -> Result<()> {
    let client = OllamaClient::new(config.llm_config())?;
    let bar = display::download_bar();

    println!("Pulling {}...", model.bold());
    let pulled = client
        .pull_model(model, |progress| {
            bar.set_message(progress.status.clone());
            if let Some(total) = progress.total {
                bar.set_length(total);
            }
            if let Some(completed) = progress.completed {
                bar.set_position(completed);
            }
        })
        .await;
    bar.finish_and_clear();
    pulled?;

    println!("{}", format!("✓ Model '{}' is ready", model).green().bold());
    Ok(())
}

/// Handle `crew health`
pub async fn handle_health(config: &CrewConfig, format: &str) -> Result<()> {
    let report = HealthChecker::check_all(config).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_health_report(&report);
    }

    if report.status == HealthStatus::Unhealthy {
        return Err(CrewError::Other("health check failed".to_string()));
    }
    Ok(())
}
