//! Commands that can mutate workflow state.
//!
//! All state changes MUST go through the state machine's `apply()` method.
//! The UI sends the user-action commands, the driver sends the settlement
//! commands when remote operations complete.

use crate::gateway::types::{
    AspectRatio, GeneratedImage, ImageStyle, PublishOutcome, Reply, Transformed,
};
use serde::Serialize;

/// Uniform outcome shape a remote operation settles with. `notice` carries a
/// partial-response error message when the service delivered data alongside
/// errors.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Settlement<T> {
    Success { payload: T, notice: Option<String> },
    Failure { reason: String },
}

impl<T> Settlement<T> {
    pub fn failure(reason: impl Into<String>) -> Self {
        Settlement::Failure {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum StateCommand {
    // User actions
    /// Replace the source post text. Outside `Idle`/`TransformFailed` this
    /// discards all derived artifacts.
    SetInput { text: String },
    /// Change the escalation level (1..=5). Same discard rule as `SetInput`.
    SetLevel { level: u8 },
    /// Ask the service to rewrite the current input.
    SubmitTransform,
    /// Ask the service to simulate replies to the rewritten text.
    SubmitReplies,
    /// Ask the service to render an illustration for the rewritten text.
    SubmitImage {
        style: ImageStyle,
        aspect_ratio: AspectRatio,
    },
    /// Open the confirmation gate with a frozen snapshot of the payload.
    /// No network call happens here.
    RequestPublish {
        add_hashtag: bool,
        add_disclaimer: bool,
    },
    /// Execute the frozen publish ticket. Only legal while confirming.
    ConfirmPublish,
    /// Close the confirmation gate with zero side effects.
    CancelPublish,
    /// Wipe the session back to a pristine state.
    ResetSession,

    // Settlements delivered by the driver, stamped with the epoch the
    // operation was issued under.
    TransformSettled {
        epoch: u64,
        outcome: Settlement<Transformed>,
    },
    RepliesSettled {
        epoch: u64,
        outcome: Settlement<Vec<Reply>>,
    },
    ImageSettled {
        epoch: u64,
        outcome: Settlement<GeneratedImage>,
    },
    PublishSettled {
        epoch: u64,
        outcome: Settlement<PublishOutcome>,
    },
}
