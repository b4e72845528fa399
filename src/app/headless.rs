//! Headless one-shot mode: transform a post (optionally with simulated
//! replies) and print the result as JSON. No TUI, no image, no publishing;
//! publishing always requires the interactive confirmation gate.

use crate::config::Config;
use crate::gateway::{Gateway, GraphqlGateway};
use crate::logging::StructuredLogger;
use crate::state::{Stage, WorkflowState};
use crate::state_machine::{StateCommand, StateSnapshot, WorkflowStateMachine};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

pub async fn run(config: Config, text: String, level: u8, with_replies: bool) -> Result<()> {
    let state = WorkflowState::new();
    let logger = match crate::config::app_dir() {
        Some(dir) => {
            let logs_dir = dir.join("logs").join(&state.session_id);
            StructuredLogger::new(&state.session_id, &logs_dir)
                .unwrap_or_else(|_| StructuredLogger::disabled(&state.session_id))
        }
        None => StructuredLogger::disabled(&state.session_id),
    };
    let logger = Arc::new(logger);

    // One settlement can take up to the full transport timeout.
    let op_deadline = Duration::from_secs(config.timeout_secs + 5);
    let gateway: Arc<dyn Gateway> =
        Arc::new(GraphqlGateway::new(&config.endpoint, config.timeout_secs));

    let (machine, mut snapshot_rx) = WorkflowStateMachine::new(state, logger);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let driver = tokio::spawn(super::driver::run(
        machine,
        gateway,
        command_rx,
        command_tx.clone(),
        shutdown_rx,
    ));

    command_tx
        .send(StateCommand::SetInput { text })
        .context("driver stopped unexpectedly")?;
    command_tx
        .send(StateCommand::SetLevel { level })
        .context("driver stopped unexpectedly")?;
    command_tx
        .send(StateCommand::SubmitTransform)
        .context("driver stopped unexpectedly")?;

    let snapshot = wait_until(&mut snapshot_rx, op_deadline, |s| {
        matches!(s.stage, Stage::Transformed | Stage::TransformFailed)
    })
    .await?;
    if snapshot.stage == Stage::TransformFailed {
        let reason = snapshot
            .last_error
            .unwrap_or_else(|| "transform failed".to_string());
        bail!("{reason}");
    }

    let snapshot = if with_replies {
        // Issuing bumps the epoch; settling leaves the pending stage. Watch
        // channels only keep the latest value, so gate on both rather than
        // trying to observe the intermediate pending snapshot.
        let pre_epoch = snapshot.epoch;
        command_tx
            .send(StateCommand::SubmitReplies)
            .context("driver stopped unexpectedly")?;
        let settled = wait_until(&mut snapshot_rx, op_deadline, |s| {
            s.epoch > pre_epoch && !s.stage.is_pending()
        })
        .await?;
        if settled.stage != Stage::RepliesReady {
            let reason = settled
                .last_error
                .unwrap_or_else(|| "reply generation failed".to_string());
            bail!("{reason}");
        }
        settled
    } else {
        snapshot
    };

    let transformed = snapshot
        .transformed
        .as_ref()
        .context("transform result missing after success")?;
    let output = serde_json::json!({
        "originalText": transformed.original_text,
        "level": snapshot.escalation_level,
        "rewrittenText": transformed.rewritten_text,
        "explanation": transformed.explanation,
        "replies": snapshot.replies,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    let _ = shutdown_tx.send(());
    let _ = driver.await;
    Ok(())
}

/// Waits for the first snapshot matching `pred`, or errors at `deadline`.
async fn wait_until(
    rx: &mut watch::Receiver<StateSnapshot>,
    deadline: Duration,
    pred: impl Fn(&StateSnapshot) -> bool,
) -> Result<StateSnapshot> {
    tokio::time::timeout(deadline, async {
        loop {
            if pred(&rx.borrow()) {
                return Ok(rx.borrow().clone());
            }
            rx.changed().await.context("workflow stopped")?;
        }
    })
    .await
    .context("timed out waiting for the service")?
}
