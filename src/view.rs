//! Presentation adapter: pure projection of a state snapshot into
//! render-ready view state.
//!
//! No independent state, no network access; recomputed on every snapshot.
//! The TUI reads these flags instead of reasoning about stages itself.

use crate::state::{Stage, MAX_INPUT_CHARS};
use crate::state_machine::StateSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// A remote operation is in flight; the triggering control is disabled
    /// but the rest of the interface stays responsive.
    pub is_busy: bool,
    pub can_submit_transform: bool,
    pub can_generate_replies: bool,
    pub can_generate_image: bool,
    pub can_request_publish: bool,
    /// The confirmation overlay is open and accepting confirm/cancel.
    pub confirming: bool,
    pub input_chars_used: usize,
    pub input_chars_remaining: usize,
    pub status_line: String,
    pub error_line: Option<String>,
}

impl ViewState {
    pub fn derive(snapshot: &StateSnapshot) -> Self {
        let stage = snapshot.stage;
        let is_busy = stage.is_pending();
        let has_result = snapshot.transformed.is_some();
        let input_chars_used = snapshot.input_text.chars().count();
        let input_nonblank = !snapshot.input_text.trim().is_empty();
        let confirming = stage == Stage::PublishConfirming;

        Self {
            is_busy,
            can_submit_transform: input_nonblank && !is_busy && !confirming,
            can_generate_replies: has_result && stage.is_stable_result(),
            can_generate_image: has_result && stage.is_stable_result(),
            can_request_publish: has_result
                && (stage.is_stable_result() || stage == Stage::PublishFailed),
            confirming,
            input_chars_used,
            input_chars_remaining: MAX_INPUT_CHARS.saturating_sub(input_chars_used),
            status_line: format!(
                "{}  ·  level {}",
                stage.label(),
                snapshot.escalation_level
            ),
            error_line: snapshot.last_error.clone(),
        }
    }
}
