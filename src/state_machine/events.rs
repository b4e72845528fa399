//! Events emitted by the state machine after processing commands.
//!
//! The driver uses the `*Started` variants to launch remote operations; the
//! rest exist for the JSONL log. The TUI never consumes events; it renders
//! from the watch channel's snapshot.

use crate::gateway::types::{AspectRatio, ImageStyle, PublishTicket};
use crate::state::{ResetReason, Stage};
use serde::Serialize;

/// Which remote operation an event refers to.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Transform,
    Replies,
    Image,
    Publish,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum StateEvent {
    /// The workflow moved to a new stage.
    StageChanged { from: Stage, to: Stage },
    /// A transform was issued; the driver must call the gateway.
    TransformStarted { epoch: u64, text: String, level: u8 },
    /// A reply simulation was issued.
    RepliesStarted { epoch: u64, text: String },
    /// An image render was issued.
    ImageStarted {
        epoch: u64,
        text: String,
        style: ImageStyle,
        aspect_ratio: AspectRatio,
    },
    /// The user confirmed; the driver must publish the frozen ticket.
    PublishStarted { epoch: u64, ticket: PublishTicket },
    /// The confirmation gate opened with a frozen payload.
    PublishTicketOpened { ticket: PublishTicket },
    /// The user closed the gate without publishing.
    PublishCancelled,
    /// A remote operation settled as a failure.
    OperationFailed { op: OperationKind, error: String },
    /// A settlement arrived for an epoch that is no longer current and was
    /// dropped on the floor.
    StaleSettlementDiscarded { op: OperationKind, epoch: u64 },
    /// Derived artifacts were discarded.
    SessionReset { reason: ResetReason },
}
