//! Project lifecycle: planning fallback, stop, restart and clear

mod common;

use common::{orchestrator, wait_until_finished, ScriptedGenerator, SlowGenerator};
use crew::TaskStatus;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_unparsable_plan_yields_fallback_task() {
    let generator = ScriptedGenerator::new(&["Sure! Sounds like a fun project.", "<h1>Welcome</h1>"]);
    let mut orchestrator = orchestrator(generator, None);

    let tasks = orchestrator
        .start_project("Build a landing page", None)
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].description.contains("Build a landing page"));
    assert_eq!(tasks[0].agent_id, "ContentWriter");
    assert_eq!(tasks[0].priority, 3);

    let status = wait_until_finished(&orchestrator, WAIT).await;
    assert_eq!(status.description, "Build a landing page");
    assert!(status.start_time.is_some());

    orchestrator.stop();
    orchestrator.join().await;
}

#[tokio::test]
async fn test_stop_resets_in_progress_task() {
    let generator = Arc::new(SlowGenerator {
        delay: Duration::from_millis(300),
    });
    let mut orchestrator = orchestrator(generator, None);
    orchestrator.start_project("Write a poem", None).await.unwrap();
    assert!(orchestrator.is_running());

    // Wait until the worker has claimed the task.
    tokio::time::timeout(WAIT, async {
        while orchestrator.status().counts.in_progress == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let reset = orchestrator.stop();
    assert_eq!(reset, 1);
    let status = orchestrator.status();
    assert!(!status.running);
    assert_eq!(status.tasks[0].status, TaskStatus::Pending);
    assert!(status.tasks[0]
        .notes
        .iter()
        .any(|n| n.text == "Reset to pending after stop"));

    // A second stop is a no-op.
    assert_eq!(orchestrator.stop(), 0);

    // The in-flight call still finishes before the worker exits.
    orchestrator.join().await;
    assert_eq!(orchestrator.status().tasks[0].status, TaskStatus::Completed);

    let messages: Vec<String> = orchestrator
        .activity()
        .entries()
        .into_iter()
        .map(|e| e.message)
        .collect();
    assert!(messages
        .iter()
        .any(|m| m == "Project stopped (1 task(s) reset to pending)"));
}

#[tokio::test]
async fn test_restart_replaces_previous_generation() {
    let generator = ScriptedGenerator::new(&[
        r#"[{"description": "First A", "agent_id": "ContentWriter"},
            {"description": "Second A", "agent_id": "QATester"}]"#,
        "a1",
        "a2",
        r#"[{"description": "Only B", "agent_id": "BackendDev"}]"#,
        "b1",
    ]);
    let mut orchestrator = orchestrator(generator, None);

    orchestrator.start_project("Project A", None).await.unwrap();
    let first = wait_until_finished(&orchestrator, WAIT).await;
    assert_eq!(first.tasks.len(), 2);

    let tasks = orchestrator.start_project("Project B", None).await.unwrap();
    assert_eq!(tasks.len(), 1);

    let second = wait_until_finished(&orchestrator, WAIT).await;
    assert_eq!(second.description, "Project B");
    assert_eq!(second.tasks.len(), 1);
    assert_eq!(second.tasks[0].description, "Only B");
    assert_eq!(second.tasks[0].result.as_deref(), Some("b1"));
    assert!(first.tasks.iter().all(|t| t.id != second.tasks[0].id));

    orchestrator.stop();
    orchestrator.join().await;
}

#[tokio::test]
async fn test_clear_drops_all_tasks() {
    let generator = ScriptedGenerator::new(&[r#"[{"description": "Say hi", "agent_id": "ContentWriter"}]"#]);
    let mut orchestrator = orchestrator(generator, None);
    orchestrator.start_project("Greeting", None).await.unwrap();
    wait_until_finished(&orchestrator, WAIT).await;

    orchestrator.clear().await;
    let status = orchestrator.status();
    assert!(status.tasks.is_empty());
    assert_eq!(status.progress, 0);
    assert!(!status.running);
    assert!(orchestrator.shutdown_handle().is_none());
}

#[tokio::test]
async fn test_missing_document_fails_before_planning() {
    let generator = ScriptedGenerator::new(&[]);
    let mut orchestrator = orchestrator(generator.clone(), None);

    let result = orchestrator
        .start_project("Summarize", Some(std::path::Path::new("/nonexistent/brief.txt")))
        .await;
    assert!(result.is_err());
    assert_eq!(generator.call_count(), 0);
    assert!(orchestrator.status().tasks.is_empty());
}
