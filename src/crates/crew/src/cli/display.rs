//! Terminal rendering shared by the command handlers

use crate::health::{HealthReport, HealthStatus};
use crate::task::{Task, TaskStatus};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tabled::{Table, Tabled};

/// Task display row for table output
#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "Priority")]
    priority: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Depends on")]
    dependencies: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Health check row
#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Time (ms)")]
    time_ms: u64,
    #[tabled(rename = "Message")]
    message: String,
}

/// Cut `text` to `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let kept: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

pub fn status_label(status: TaskStatus) -> String {
    match status {
        TaskStatus::Pending => status.as_str().dimmed().to_string(),
        TaskStatus::InProgress => status.as_str().yellow().bold().to_string(),
        TaskStatus::Completed => status.as_str().green().to_string(),
        TaskStatus::Blocked => status.as_str().red().to_string(),
    }
}

/// Print tasks as a table, dependencies shown as short ids.
pub fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("{}", "No tasks".yellow());
        return;
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| TaskRow {
            position: i + 1,
            id: short_id(&task.id),
            agent: task.agent_id.clone(),
            priority: task.priority,
            status: status_label(task.status),
            dependencies: if task.dependencies.is_empty() {
                "-".to_string()
            } else {
                task.dependencies
                    .iter()
                    .map(|d| short_id(d))
                    .collect::<Vec<_>>()
                    .join(", ")
            },
            description: truncate(&task.description, 60),
        })
        .collect();

    println!("{}", Table::new(rows));
}

/// Print each completed task's result and saved artifact.
pub fn print_results(tasks: &[Task]) {
    for task in tasks.iter().filter(|t| t.is_completed()) {
        println!();
        println!(
            "{} {} {}",
            "■".cyan(),
            task.agent_id.bold(),
            truncate(&task.description, 70)
        );
        if let Some(result) = &task.result {
            println!("{}", truncate(result, 400));
        }
        if let Some(path) = &task.output {
            println!("  {} {}", "saved:".dimmed(), path.display());
        }
    }
}

fn status_icon(status: HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "✓ healthy".green().to_string(),
        HealthStatus::Degraded => "⚠ degraded".yellow().to_string(),
        HealthStatus::Unhealthy => "✗ unhealthy".red().to_string(),
    }
}

pub fn print_health_report(report: &HealthReport) {
    println!("System Health Check");
    println!("===================");
    println!();
    println!("Overall Status: {}", status_icon(report.status));
    println!("Total Response Time: {}ms", report.total_response_time_ms);
    println!();

    let rows: Vec<CheckRow> = report
        .checks
        .iter()
        .map(|check| CheckRow {
            name: check.name.clone(),
            status: status_icon(check.status),
            time_ms: check.response_time_ms,
            message: check.message.clone().unwrap_or_else(|| "N/A".to_string()),
        })
        .collect();
    println!("{}", Table::new(rows));
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Percent bar for project progress.
pub fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}") {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    pb
}

/// Byte-count bar for model downloads.
pub fn download_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "{msg:20} {bar:40.green/white} {bytes}/{total_bytes} ({eta})",
    ) {
        pb.set_style(style);
    }
    pb
}
