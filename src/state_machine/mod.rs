//! Centralized state machine for the flame-war workflow.
//!
//! This module is the ONLY place where workflow state transitions happen.
//! The machine owns the state, validates commands, emits events, and
//! broadcasts read-only snapshots to subscribers via a watch channel. The
//! driver turns `*Started` events into gateway calls and feeds the results
//! back as settlement commands.

mod commands;
mod events;
mod snapshot;

pub use commands::{Settlement, StateCommand};
pub use events::{OperationKind, StateEvent};
pub use snapshot::StateSnapshot;

use crate::gateway::types::{PublishOutcome, PublishTicket};
use crate::logging::StructuredLogger;
use crate::state::{
    ResetReason, Stage, WorkflowState, DEFAULT_LEVEL, MAX_INPUT_CHARS, MAX_LEVEL, MIN_LEVEL,
};
use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::watch;

/// Shown when a publish fails without a remote-supplied reason.
const GENERIC_PUBLISH_FAILURE: &str = "the post was not published";

/// The single writer of [`WorkflowState`].
pub struct WorkflowStateMachine {
    state: WorkflowState,
    snapshot_tx: watch::Sender<StateSnapshot>,
    logger: Arc<StructuredLogger>,
}

impl WorkflowStateMachine {
    /// Creates a new machine around the given initial state.
    ///
    /// Returns the machine and a watch receiver for state snapshots; the UI
    /// renders from that receiver and never holds the state itself.
    pub fn new(
        initial_state: WorkflowState,
        logger: Arc<StructuredLogger>,
    ) -> (Self, watch::Receiver<StateSnapshot>) {
        let snapshot = StateSnapshot::from(&initial_state);
        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot);
        let machine = Self {
            state: initial_state,
            snapshot_tx,
            logger,
        };
        (machine, snapshot_rx)
    }

    /// All mutations go through this single method.
    ///
    /// Returns the emitted events (the driver launches remote operations off
    /// the `*Started` variants); broadcasts a fresh snapshot afterwards.
    /// An `Err` means the command was illegal in the current stage and the
    /// state is unchanged.
    pub fn apply(&mut self, command: StateCommand) -> Result<Vec<StateEvent>> {
        self.logger.log_command(&command);

        let events = self.apply_internal(command)?;

        for event in &events {
            self.logger.log_event(event);
        }

        let _ = self.snapshot_tx.send(StateSnapshot::from(&self.state));
        Ok(events)
    }

    /// Returns immutable reference to current state.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    fn apply_internal(&mut self, command: StateCommand) -> Result<Vec<StateEvent>> {
        use StateCommand::*;

        match command {
            SetInput { text } => {
                if text.chars().count() > MAX_INPUT_CHARS {
                    bail!("input exceeds {MAX_INPUT_CHARS} characters");
                }
                if text == self.state.input_text {
                    return Ok(vec![]);
                }
                self.state.input_text = text;
                Ok(self.reset_if_derived(ResetReason::InputEdited))
            }

            SetLevel { level } => {
                if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
                    bail!("escalation level must be between {MIN_LEVEL} and {MAX_LEVEL}");
                }
                if level == self.state.escalation_level {
                    return Ok(vec![]);
                }
                self.state.escalation_level = level;
                Ok(self.reset_if_derived(ResetReason::LevelChanged))
            }

            SubmitTransform => {
                if self.state.stage.is_pending() {
                    bail!("an operation is already in flight");
                }
                if self.state.stage == Stage::PublishConfirming {
                    bail!("close the publish confirmation first");
                }
                if self.state.input_text.trim().is_empty() {
                    bail!("input text is empty");
                }
                self.state.epoch += 1;
                let mut events = self.enter(Stage::Transforming);
                events.push(StateEvent::TransformStarted {
                    epoch: self.state.epoch,
                    text: self.state.input_text.clone(),
                    level: self.state.escalation_level,
                });
                Ok(events)
            }

            TransformSettled { epoch, outcome } => {
                if self.state.stage != Stage::Transforming || epoch != self.state.epoch {
                    return Ok(vec![StateEvent::StaleSettlementDiscarded {
                        op: OperationKind::Transform,
                        epoch,
                    }]);
                }
                match outcome {
                    Settlement::Success { payload, notice } => {
                        self.state.transformed = Some(payload);
                        self.state.replies.clear();
                        self.state.image = None;
                        self.state.publish_outcome = None;
                        self.state.pending_publish = None;
                        self.state.last_error = notice;
                        Ok(self.enter(Stage::Transformed))
                    }
                    Settlement::Failure { reason } => {
                        self.state.transformed = None;
                        self.state.replies.clear();
                        self.state.image = None;
                        self.state.publish_outcome = None;
                        self.state.last_error = Some(reason.clone());
                        let mut events = vec![StateEvent::OperationFailed {
                            op: OperationKind::Transform,
                            error: reason,
                        }];
                        events.extend(self.enter(Stage::TransformFailed));
                        Ok(events)
                    }
                }
            }

            SubmitReplies => {
                let rewritten = self.require_stable_result("generate replies")?;
                self.state.epoch += 1;
                self.state.return_stage = self.state.stage;
                let epoch = self.state.epoch;
                let mut events = self.enter(Stage::RepliesPending);
                events.push(StateEvent::RepliesStarted {
                    epoch,
                    text: rewritten,
                });
                Ok(events)
            }

            RepliesSettled { epoch, outcome } => {
                if self.state.stage != Stage::RepliesPending || epoch != self.state.epoch {
                    return Ok(vec![StateEvent::StaleSettlementDiscarded {
                        op: OperationKind::Replies,
                        epoch,
                    }]);
                }
                match outcome {
                    Settlement::Success { payload, notice } => {
                        self.state.replies = payload;
                        self.state.last_error = notice;
                        Ok(self.enter(Stage::RepliesReady))
                    }
                    Settlement::Failure { reason } => self.revert_failed(OperationKind::Replies, reason),
                }
            }

            SubmitImage {
                style,
                aspect_ratio,
            } => {
                let rewritten = self.require_stable_result("generate an image")?;
                self.state.epoch += 1;
                self.state.return_stage = self.state.stage;
                let epoch = self.state.epoch;
                let mut events = self.enter(Stage::ImagePending);
                events.push(StateEvent::ImageStarted {
                    epoch,
                    text: rewritten,
                    style,
                    aspect_ratio,
                });
                Ok(events)
            }

            ImageSettled { epoch, outcome } => {
                if self.state.stage != Stage::ImagePending || epoch != self.state.epoch {
                    return Ok(vec![StateEvent::StaleSettlementDiscarded {
                        op: OperationKind::Image,
                        epoch,
                    }]);
                }
                match outcome {
                    Settlement::Success { payload, notice } => {
                        self.state.image = Some(payload);
                        self.state.last_error = notice;
                        Ok(self.enter(Stage::ImageReady))
                    }
                    Settlement::Failure { reason } => self.revert_failed(OperationKind::Image, reason),
                }
            }

            RequestPublish {
                add_hashtag,
                add_disclaimer,
            } => {
                if self.state.stage != Stage::PublishFailed {
                    let _ = self.require_stable_result("publish")?;
                    self.state.return_stage = self.state.stage;
                }
                let Some(transformed) = self.state.transformed.as_ref() else {
                    bail!("nothing to publish yet");
                };
                let ticket = PublishTicket {
                    text: transformed.rewritten_text.clone(),
                    image_url: self.state.image.as_ref().map(|i| i.url.clone()),
                    add_hashtag,
                    add_disclaimer,
                };
                self.state.pending_publish = Some(ticket.clone());
                let mut events = vec![StateEvent::PublishTicketOpened { ticket }];
                events.extend(self.enter(Stage::PublishConfirming));
                Ok(events)
            }

            ConfirmPublish => {
                if self.state.stage != Stage::PublishConfirming {
                    bail!("no publish awaiting confirmation");
                }
                let Some(ticket) = self.state.pending_publish.clone() else {
                    bail!("confirmation gate has no frozen payload");
                };
                self.state.epoch += 1;
                let epoch = self.state.epoch;
                let mut events = self.enter(Stage::Publishing);
                events.push(StateEvent::PublishStarted { epoch, ticket });
                Ok(events)
            }

            CancelPublish => {
                if self.state.stage != Stage::PublishConfirming {
                    bail!("no publish awaiting confirmation");
                }
                self.state.pending_publish = None;
                let mut events = vec![StateEvent::PublishCancelled];
                events.extend(self.enter(self.state.return_stage));
                Ok(events)
            }

            PublishSettled { epoch, outcome } => {
                if self.state.stage != Stage::Publishing || epoch != self.state.epoch {
                    return Ok(vec![StateEvent::StaleSettlementDiscarded {
                        op: OperationKind::Publish,
                        epoch,
                    }]);
                }
                self.state.pending_publish = None;
                match outcome {
                    Settlement::Success { payload, notice } if payload.success => {
                        self.state.publish_outcome = Some(payload);
                        self.state.last_error = notice;
                        Ok(self.enter(Stage::Published))
                    }
                    Settlement::Success { payload, .. } => {
                        let reason = payload
                            .error_reason
                            .clone()
                            .unwrap_or_else(|| GENERIC_PUBLISH_FAILURE.to_string());
                        self.state.publish_outcome = Some(payload);
                        self.state.last_error = Some(reason.clone());
                        let mut events = vec![StateEvent::OperationFailed {
                            op: OperationKind::Publish,
                            error: reason,
                        }];
                        events.extend(self.enter(Stage::PublishFailed));
                        Ok(events)
                    }
                    Settlement::Failure { reason } => {
                        self.state.publish_outcome = Some(PublishOutcome {
                            success: false,
                            remote_id: None,
                            remote_url: None,
                            error_reason: Some(reason.clone()),
                        });
                        self.state.last_error = Some(reason.clone());
                        let mut events = vec![StateEvent::OperationFailed {
                            op: OperationKind::Publish,
                            error: reason,
                        }];
                        events.extend(self.enter(Stage::PublishFailed));
                        Ok(events)
                    }
                }
            }

            ResetSession => {
                let from = self.state.stage;
                self.state.input_text.clear();
                self.state.escalation_level = DEFAULT_LEVEL;
                self.state.discard_derived();
                let mut events = vec![StateEvent::SessionReset {
                    reason: ResetReason::UserReset,
                }];
                if from != Stage::Idle {
                    events.push(StateEvent::StageChanged {
                        from,
                        to: Stage::Idle,
                    });
                }
                Ok(events)
            }
        }
    }

    /// Moves to `to`, emitting a `StageChanged` event when the stage
    /// actually changes.
    fn enter(&mut self, to: Stage) -> Vec<StateEvent> {
        let from = self.state.stage;
        if from == to {
            return vec![];
        }
        self.state.stage = to;
        vec![StateEvent::StageChanged { from, to }]
    }

    /// Edits outside `Idle`/`TransformFailed` discard everything derived
    /// from the previous input. The epoch bump inside `discard_derived`
    /// invalidates any settlement still in flight.
    fn reset_if_derived(&mut self, reason: ResetReason) -> Vec<StateEvent> {
        let from = self.state.stage;
        if matches!(from, Stage::Idle | Stage::TransformFailed) {
            return vec![];
        }
        self.state.discard_derived();
        vec![
            StateEvent::SessionReset { reason },
            StateEvent::StageChanged {
                from,
                to: Stage::Idle,
            },
        ]
    }

    /// Guards actions that need a completed transform and no operation in
    /// flight. Returns the rewritten text the action operates on.
    fn require_stable_result(&self, action: &str) -> Result<String> {
        if self.state.stage.is_pending() {
            bail!("an operation is already in flight");
        }
        if !self.state.stage.is_stable_result() {
            bail!("cannot {action} before a successful transform");
        }
        match self.state.transformed.as_ref() {
            Some(t) => Ok(t.rewritten_text.clone()),
            None => bail!("cannot {action} before a successful transform"),
        }
    }

    /// Common failure path for replies/image: show the error, return to the
    /// stage the operation was started from.
    fn revert_failed(&mut self, op: OperationKind, reason: String) -> Result<Vec<StateEvent>> {
        self.state.last_error = Some(reason.clone());
        let mut events = vec![StateEvent::OperationFailed { op, error: reason }];
        events.extend(self.enter(self.state.return_stage));
        Ok(events)
    }
}

#[cfg(test)]
mod tests;
