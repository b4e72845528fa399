//! Read-only snapshot of workflow state for display.
//!
//! The TUI never mutates this; it receives new snapshots via watch channel
//! and projects them through `view::ViewState`.

use crate::gateway::types::{GeneratedImage, PublishOutcome, PublishTicket, Reply, Transformed};
use crate::state::{Stage, WorkflowState};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub session_id: String,
    pub input_text: String,
    pub escalation_level: u8,
    pub stage: Stage,
    pub transformed: Option<Transformed>,
    pub replies: Vec<Reply>,
    pub image: Option<GeneratedImage>,
    pub publish_outcome: Option<PublishOutcome>,
    pub last_error: Option<String>,
    pub pending_publish: Option<PublishTicket>,
    pub epoch: u64,
}

impl From<&WorkflowState> for StateSnapshot {
    fn from(state: &WorkflowState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            input_text: state.input_text.clone(),
            escalation_level: state.escalation_level,
            stage: state.stage,
            transformed: state.transformed.clone(),
            replies: state.replies.clone(),
            image: state.image.clone(),
            publish_outcome: state.publish_outcome.clone(),
            last_error: state.last_error.clone(),
            pending_publish: state.pending_publish.clone(),
            epoch: state.epoch,
        }
    }
}
