//! The workflow aggregate: single source of truth for one user session.
//!
//! Owned exclusively by the state machine; everything else reads snapshots.
//! Lifecycle is one session; nothing here is persisted.

use crate::gateway::types::{GeneratedImage, PublishOutcome, PublishTicket, Reply, Transformed};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of the source post, in characters.
pub const MAX_INPUT_CHARS: usize = 500;
/// Escalation level bounds and default.
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;
pub const DEFAULT_LEVEL: u8 = 3;

/// Current position in the workflow. Exactly one value is active at a time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Transforming,
    TransformFailed,
    Transformed,
    RepliesPending,
    RepliesReady,
    ImagePending,
    ImageReady,
    PublishConfirming,
    Publishing,
    Published,
    PublishFailed,
}

impl Stage {
    /// A remote operation is in flight. Pending stages block every other
    /// action's control and are always left on settlement, success or not.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Stage::Transforming | Stage::RepliesPending | Stage::ImagePending | Stage::Publishing
        )
    }

    /// Stable stages a pending operation can revert to on failure and that
    /// a publish confirmation can be requested from.
    pub fn is_stable_result(&self) -> bool {
        matches!(
            self,
            Stage::Transformed | Stage::RepliesReady | Stage::ImageReady
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Idle => "Idle",
            Stage::Transforming => "Transforming…",
            Stage::TransformFailed => "Transform failed",
            Stage::Transformed => "Transformed",
            Stage::RepliesPending => "Generating replies…",
            Stage::RepliesReady => "Replies ready",
            Stage::ImagePending => "Generating image…",
            Stage::ImageReady => "Image ready",
            Stage::PublishConfirming => "Awaiting confirmation",
            Stage::Publishing => "Publishing…",
            Stage::Published => "Published",
            Stage::PublishFailed => "Publish failed",
        }
    }
}

/// Why derived artifacts were discarded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    InputEdited,
    LevelChanged,
    UserReset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: String,
    pub input_text: String,
    pub escalation_level: u8,
    pub stage: Stage,
    pub transformed: Option<Transformed>,
    pub replies: Vec<Reply>,
    pub image: Option<GeneratedImage>,
    pub publish_outcome: Option<PublishOutcome>,
    pub last_error: Option<String>,

    /// Snapshot epoch: bumped on every operation issue and every reset.
    /// A settlement applies only if its stamped epoch is still current,
    /// which is how stale responses are detected and discarded.
    pub epoch: u64,

    /// Stable stage to return to when a pending operation fails or a
    /// publish confirmation is cancelled.
    pub return_stage: Stage,

    /// Payload frozen by the confirmation gate. Present from the moment the
    /// gate opens until the publish settles or is cancelled.
    pub pending_publish: Option<PublishTicket>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            input_text: String::new(),
            escalation_level: DEFAULT_LEVEL,
            stage: Stage::Idle,
            transformed: None,
            replies: Vec::new(),
            image: None,
            publish_outcome: None,
            last_error: None,
            epoch: 0,
            return_stage: Stage::Idle,
            pending_publish: None,
        }
    }

    /// Discards every artifact derived from the current input and returns
    /// the workflow to `Idle`. Downstream content must never survive an
    /// input or level change it was not generated from.
    pub fn discard_derived(&mut self) {
        self.stage = Stage::Idle;
        self.transformed = None;
        self.replies.clear();
        self.image = None;
        self.publish_outcome = None;
        self.pending_publish = None;
        self.last_error = None;
        self.return_stage = Stage::Idle;
        self.epoch += 1;
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}
