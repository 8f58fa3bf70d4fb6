//! Project command handlers: plan and run

use super::display;
use crate::config::CrewConfig;
use crate::error::{CrewError, Result};
use crate::orchestrator::Orchestrator;
use crate::persona::Roster;
use crate::store::ProjectStatus;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Options of `crew run`
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub description: String,
    pub document: Option<PathBuf>,
    pub roster: Option<Roster>,
    pub json: bool,
}

/// Handle `crew plan`: decompose without executing.
pub async fn handle_plan(
    mut config: CrewConfig,
    description: String,
    roster: Option<Roster>,
    json: bool,
) -> Result<()> {
    if let Some(roster) = roster {
        config.agents.roster = roster;
    }
    let orchestrator = Orchestrator::from_config(&config)?;

    let spinner = (!json).then(|| display::spinner("Planning..."));
    let tasks = orchestrator.planner().plan(&description).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    println!("{} {}", "Project:".bold(), description);
    display::print_tasks(&tasks);
    println!("{} task(s) planned", tasks.len());
    Ok(())
}

/// Handle `crew run`: plan, execute until every task completes or Ctrl-C.
pub async fn handle_run(mut config: CrewConfig, options: RunOptions) -> Result<()> {
    if let Some(roster) = options.roster {
        config.agents.roster = roster;
    }
    let mut orchestrator = Orchestrator::from_config(&config)?;

    let spinner = (!options.json).then(|| display::spinner("Planning..."));
    let planned = orchestrator
        .start_project(&options.description, options.document.as_deref())
        .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let tasks = planned?;

    if !options.json {
        println!("{} {}", "Project:".bold(), options.description);
        display::print_tasks(&tasks);
        println!();
    }

    let shutdown = orchestrator
        .shutdown_handle()
        .ok_or_else(|| CrewError::Worker("worker did not start".to_string()))?;
    let signals = shutdown.install_signal_handlers();

    let bar = (!options.json).then(display::progress_bar);
    let finished = loop {
        let status = orchestrator.status();
        if let Some(bar) = &bar {
            bar.set_position(status.progress as u64);
            bar.set_message(current_task(&status));
        }
        if status.is_finished() {
            break true;
        }

        tokio::select! {
            _ = shutdown.wait_for_shutdown() => break false,
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    };

    if !finished {
        if let Some(bar) = &bar {
            bar.set_message("waiting for the current task to finish...");
        }
    }
    let reset = orchestrator.stop();
    orchestrator.join().await;
    signals.abort();

    let status = orchestrator.status();
    if let Some(bar) = bar {
        bar.set_position(status.progress as u64);
        bar.finish_and_clear();
    }
    info!(
        progress = status.progress,
        completed = status.counts.completed,
        total = status.counts.total,
        "Run finished"
    );

    if options.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    display::print_results(&status.tasks);
    println!();
    if finished {
        println!(
            "{}",
            format!("✓ All {} task(s) completed", status.counts.total)
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            format!(
                "⚠ Stopped at {}% ({} of {} completed, {} reset to pending)",
                status.progress, status.counts.completed, status.counts.total, reset
            )
            .yellow()
        );
    }
    Ok(())
}

fn current_task(status: &ProjectStatus) -> String {
    status
        .tasks
        .iter()
        .find(|t| t.status == crate::task::TaskStatus::InProgress)
        .map(|t| format!("{}: {}", t.agent_id, display::truncate(&t.description, 50)))
        .unwrap_or_default()
}
