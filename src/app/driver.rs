//! Async sequencing glue between the state machine and the gateway.
//!
//! The driver owns the machine. UI code sends [`StateCommand`]s over an mpsc
//! channel; whenever applying one emits a `*Started` event, the driver spawns
//! a task that performs the gateway call and sends the matching `*Settled`
//! command back through the same channel, stamped with the epoch the
//! operation was issued under. The machine discards settlements whose epoch
//! is no longer current, so a stale response can never be applied.

use crate::gateway::types::{AspectRatio, ImageStyle, PublishTicket, Transformed};
use crate::gateway::{Delivered, Gateway, GatewayError};
use crate::state_machine::{Settlement, StateCommand, StateEvent, WorkflowStateMachine};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

fn settle<T>(result: Result<Delivered<T>, GatewayError>) -> Settlement<T> {
    match result {
        Ok(delivered) => Settlement::Success {
            payload: delivered.payload,
            notice: delivered.notice,
        },
        Err(err) => Settlement::failure(err.to_string()),
    }
}

/// Runs the workflow until `shutdown` fires or every command sender is gone.
pub async fn run(
    mut machine: WorkflowStateMachine,
    gateway: Arc<dyn Gateway>,
    mut command_rx: mpsc::UnboundedReceiver<StateCommand>,
    command_tx: mpsc::UnboundedSender<StateCommand>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            maybe_command = command_rx.recv() => {
                let Some(command) = maybe_command else { break };
                match machine.apply(command) {
                    Ok(events) => {
                        for event in events {
                            launch(event, &gateway, &command_tx);
                        }
                    }
                    Err(err) => {
                        // Illegal command in the current stage; state is
                        // unchanged and the UI control stays as it was.
                        tracing::debug!(stage = ?machine.state().stage, "command rejected: {err:#}");
                    }
                }
            }
            _ = &mut shutdown => break,
        }
    }
}

/// Spawns the remote operation a `*Started` event asks for. All other
/// events are log-only.
fn launch(
    event: StateEvent,
    gateway: &Arc<dyn Gateway>,
    command_tx: &mpsc::UnboundedSender<StateCommand>,
) {
    match event {
        StateEvent::TransformStarted { epoch, text, level } => {
            spawn_transform(gateway.clone(), command_tx.clone(), epoch, text, level);
        }
        StateEvent::RepliesStarted { epoch, text } => {
            let gateway = gateway.clone();
            let tx = command_tx.clone();
            tokio::spawn(async move {
                let outcome = settle(gateway.generate_replies(&text).await);
                let _ = tx.send(StateCommand::RepliesSettled { epoch, outcome });
            });
        }
        StateEvent::ImageStarted {
            epoch,
            text,
            style,
            aspect_ratio,
        } => {
            spawn_image(gateway.clone(), command_tx.clone(), epoch, text, style, aspect_ratio);
        }
        StateEvent::PublishStarted { epoch, ticket } => {
            spawn_publish(gateway.clone(), command_tx.clone(), epoch, ticket);
        }
        _ => {}
    }
}

fn spawn_transform(
    gateway: Arc<dyn Gateway>,
    tx: mpsc::UnboundedSender<StateCommand>,
    epoch: u64,
    text: String,
    level: u8,
) {
    tokio::spawn(async move {
        let outcome = match gateway.transform_text(&text, level).await {
            Ok(delivered) => Settlement::Success {
                payload: Transformed {
                    original_text: text,
                    rewritten_text: delivered.payload.rewritten_text,
                    explanation: delivered.payload.explanation,
                },
                notice: delivered.notice,
            },
            Err(err) => Settlement::failure(err.to_string()),
        };
        let _ = tx.send(StateCommand::TransformSettled { epoch, outcome });
    });
}

fn spawn_image(
    gateway: Arc<dyn Gateway>,
    tx: mpsc::UnboundedSender<StateCommand>,
    epoch: u64,
    text: String,
    style: ImageStyle,
    aspect_ratio: AspectRatio,
) {
    tokio::spawn(async move {
        let outcome = settle(gateway.generate_image(&text, style, aspect_ratio).await);
        let _ = tx.send(StateCommand::ImageSettled { epoch, outcome });
    });
}

fn spawn_publish(
    gateway: Arc<dyn Gateway>,
    tx: mpsc::UnboundedSender<StateCommand>,
    epoch: u64,
    ticket: PublishTicket,
) {
    tokio::spawn(async move {
        let outcome = settle(gateway.publish_post(&ticket).await);
        let _ = tx.send(StateCommand::PublishSettled { epoch, outcome });
    });
}
