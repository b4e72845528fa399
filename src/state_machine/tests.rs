//! Tests for the workflow state machine.

use super::*;
use crate::gateway::types::{
    AspectRatio, GeneratedImage, ImageStyle, PublishOutcome, Reply, ReplyCategory, Transformed,
};
use crate::logging::StructuredLogger;
use crate::state::{Stage, WorkflowState};
use chrono::Utc;
use proptest::prelude::*;

fn create_machine() -> (WorkflowStateMachine, watch::Receiver<StateSnapshot>) {
    let logger = Arc::new(StructuredLogger::disabled("test-session"));
    WorkflowStateMachine::new(WorkflowState::new(), logger)
}

/// Extracts the issue epoch from the single `*Started` event in `events`.
fn issued_epoch(events: &[StateEvent]) -> u64 {
    events
        .iter()
        .find_map(|e| match e {
            StateEvent::TransformStarted { epoch, .. }
            | StateEvent::RepliesStarted { epoch, .. }
            | StateEvent::ImageStarted { epoch, .. }
            | StateEvent::PublishStarted { epoch, .. } => Some(*epoch),
            _ => None,
        })
        .expect("expected a *Started event")
}

fn ok<T>(payload: T) -> Settlement<T> {
    Settlement::Success {
        payload,
        notice: None,
    }
}

fn sample_transformed(original: &str) -> Transformed {
    Transformed {
        original_text: original.to_string(),
        rewritten_text: "炎上化されたテキスト".to_string(),
        explanation: Some("説明文".to_string()),
    }
}

fn sample_image() -> GeneratedImage {
    GeneratedImage {
        url: "data:image/png;base64,abc".to_string(),
        prompt: "a post on fire".to_string(),
        generated_at: Utc::now(),
    }
}

fn four_replies() -> Vec<Reply> {
    [
        ReplyCategory::LogicalCriticism,
        ReplyCategory::Nitpicking,
        ReplyCategory::OffTarget,
        ReplyCategory::ExcessiveDefense,
    ]
    .iter()
    .enumerate()
    .map(|(i, category)| Reply {
        id: format!("r{i}"),
        category: *category,
        content: format!("reply {i}"),
    })
    .collect()
}

/// Drives a fresh machine to `Transformed` with the Japanese sample text.
fn transformed_machine() -> (WorkflowStateMachine, watch::Receiver<StateSnapshot>) {
    let (mut machine, rx) = create_machine();
    machine
        .apply(StateCommand::SetInput {
            text: "テスト投稿".to_string(),
        })
        .unwrap();
    let events = machine.apply(StateCommand::SubmitTransform).unwrap();
    let epoch = issued_epoch(&events);
    machine
        .apply(StateCommand::TransformSettled {
            epoch,
            outcome: ok(sample_transformed("テスト投稿")),
        })
        .unwrap();
    assert_eq!(machine.state().stage, Stage::Transformed);
    (machine, rx)
}

#[test]
fn blank_input_cannot_enter_transforming() {
    let (mut machine, _rx) = create_machine();
    machine
        .apply(StateCommand::SetInput {
            text: "   ".to_string(),
        })
        .unwrap();

    let err = machine.apply(StateCommand::SubmitTransform);
    assert!(err.is_err());
    assert_eq!(machine.state().stage, Stage::Idle);
}

#[test]
fn input_over_limit_is_rejected() {
    let (mut machine, _rx) = create_machine();
    let long = "あ".repeat(501);
    assert!(machine.apply(StateCommand::SetInput { text: long }).is_err());
    assert!(machine.state().input_text.is_empty());

    let exactly_max = "x".repeat(500);
    assert!(machine
        .apply(StateCommand::SetInput { text: exactly_max })
        .is_ok());
}

#[test]
fn transform_success_scenario() {
    let (mut machine, rx) = create_machine();
    machine
        .apply(StateCommand::SetInput {
            text: "テスト投稿".to_string(),
        })
        .unwrap();
    machine.apply(StateCommand::SetLevel { level: 3 }).unwrap();

    let events = machine.apply(StateCommand::SubmitTransform).unwrap();
    assert_eq!(machine.state().stage, Stage::Transforming);
    let epoch = issued_epoch(&events);

    machine
        .apply(StateCommand::TransformSettled {
            epoch,
            outcome: ok(sample_transformed("テスト投稿")),
        })
        .unwrap();

    let state = machine.state();
    assert_eq!(state.stage, Stage::Transformed);
    assert!(state.last_error.is_none());
    let transformed = state.transformed.as_ref().expect("result stored");
    assert_eq!(transformed.rewritten_text, "炎上化されたテキスト");
    assert_eq!(transformed.explanation.as_deref(), Some("説明文"));

    let snapshot = rx.borrow();
    assert_eq!(snapshot.stage, Stage::Transformed);
}

#[test]
fn transform_failure_scenario() {
    let (mut machine, _rx) = create_machine();
    machine
        .apply(StateCommand::SetInput {
            text: "テスト投稿".to_string(),
        })
        .unwrap();
    let events = machine.apply(StateCommand::SubmitTransform).unwrap();
    let epoch = issued_epoch(&events);

    let events = machine
        .apply(StateCommand::TransformSettled {
            epoch,
            outcome: Settlement::failure("request failed: connection refused"),
        })
        .unwrap();

    assert_eq!(machine.state().stage, Stage::TransformFailed);
    assert!(machine.state().last_error.is_some());
    assert!(machine.state().transformed.is_none());
    assert!(events
        .iter()
        .any(|e| matches!(e, StateEvent::OperationFailed { op: OperationKind::Transform, .. })));

    // TransformFailed permits re-submission.
    assert!(machine.apply(StateCommand::SubmitTransform).is_ok());
    assert_eq!(machine.state().stage, Stage::Transforming);
}

#[test]
fn transform_success_clears_prior_replies_and_image() {
    let (mut machine, _rx) = transformed_machine();

    let events = machine.apply(StateCommand::SubmitReplies).unwrap();
    machine
        .apply(StateCommand::RepliesSettled {
            epoch: issued_epoch(&events),
            outcome: ok(four_replies()),
        })
        .unwrap();
    let events = machine
        .apply(StateCommand::SubmitImage {
            style: ImageStyle::Meme,
            aspect_ratio: AspectRatio::Square,
        })
        .unwrap();
    machine
        .apply(StateCommand::ImageSettled {
            epoch: issued_epoch(&events),
            outcome: ok(sample_image()),
        })
        .unwrap();
    assert!(!machine.state().replies.is_empty());
    assert!(machine.state().image.is_some());

    // Re-transform the same input; the fresh result must stand alone.
    let events = machine.apply(StateCommand::SubmitTransform).unwrap();
    machine
        .apply(StateCommand::TransformSettled {
            epoch: issued_epoch(&events),
            outcome: ok(sample_transformed("テスト投稿")),
        })
        .unwrap();

    assert_eq!(machine.state().stage, Stage::Transformed);
    assert!(machine.state().replies.is_empty());
    assert!(machine.state().image.is_none());
}

#[test]
fn editing_input_after_transform_resets_everything() {
    let (mut machine, _rx) = transformed_machine();

    machine
        .apply(StateCommand::SetInput {
            text: "別のテキスト".to_string(),
        })
        .unwrap();

    let state = machine.state();
    assert_eq!(state.stage, Stage::Idle);
    assert!(state.transformed.is_none());
    assert!(state.replies.is_empty());
    assert!(state.image.is_none());
    assert!(state.publish_outcome.is_none());
}

#[test]
fn changing_level_after_transform_resets_everything() {
    let (mut machine, _rx) = transformed_machine();

    machine.apply(StateCommand::SetLevel { level: 5 }).unwrap();

    assert_eq!(machine.state().stage, Stage::Idle);
    assert!(machine.state().transformed.is_none());
}

#[test]
fn editing_in_transform_failed_keeps_stage() {
    let (mut machine, _rx) = create_machine();
    machine
        .apply(StateCommand::SetInput {
            text: "text".to_string(),
        })
        .unwrap();
    let events = machine.apply(StateCommand::SubmitTransform).unwrap();
    machine
        .apply(StateCommand::TransformSettled {
            epoch: issued_epoch(&events),
            outcome: Settlement::failure("boom"),
        })
        .unwrap();

    machine
        .apply(StateCommand::SetInput {
            text: "revised text".to_string(),
        })
        .unwrap();
    assert_eq!(machine.state().stage, Stage::TransformFailed);
    assert!(machine.state().last_error.is_some());
}

#[test]
fn replies_success_stores_all_four_categories() {
    let (mut machine, _rx) = transformed_machine();

    let events = machine.apply(StateCommand::SubmitReplies).unwrap();
    assert_eq!(machine.state().stage, Stage::RepliesPending);
    // Replies are generated against the rewritten text, not the input.
    assert!(events.iter().any(|e| matches!(
        e,
        StateEvent::RepliesStarted { text, .. } if text == "炎上化されたテキスト"
    )));

    machine
        .apply(StateCommand::RepliesSettled {
            epoch: issued_epoch(&events),
            outcome: ok(four_replies()),
        })
        .unwrap();

    let state = machine.state();
    assert_eq!(state.stage, Stage::RepliesReady);
    assert_eq!(state.replies.len(), 4);
    let categories: std::collections::HashSet<_> =
        state.replies.iter().map(|r| r.category).collect();
    assert_eq!(categories.len(), 4);
    assert!(state.last_error.is_none());
}

#[test]
fn replies_failure_reverts_to_transformed() {
    let (mut machine, _rx) = transformed_machine();

    let events = machine.apply(StateCommand::SubmitReplies).unwrap();
    machine
        .apply(StateCommand::RepliesSettled {
            epoch: issued_epoch(&events),
            outcome: Settlement::failure("service error: overloaded"),
        })
        .unwrap();

    let state = machine.state();
    assert_eq!(state.stage, Stage::Transformed);
    assert!(state.replies.is_empty());
    assert_eq!(state.last_error.as_deref(), Some("service error: overloaded"));

    // Retry is a fresh explicit action and must be permitted.
    assert!(machine.apply(StateCommand::SubmitReplies).is_ok());
}

#[test]
fn image_failure_reverts_to_the_stage_it_started_from() {
    let (mut machine, _rx) = transformed_machine();
    let events = machine.apply(StateCommand::SubmitReplies).unwrap();
    machine
        .apply(StateCommand::RepliesSettled {
            epoch: issued_epoch(&events),
            outcome: ok(four_replies()),
        })
        .unwrap();

    let events = machine
        .apply(StateCommand::SubmitImage {
            style: ImageStyle::Dramatic,
            aspect_ratio: AspectRatio::Landscape,
        })
        .unwrap();
    machine
        .apply(StateCommand::ImageSettled {
            epoch: issued_epoch(&events),
            outcome: Settlement::failure("render timed out"),
        })
        .unwrap();

    assert_eq!(machine.state().stage, Stage::RepliesReady);
    assert!(machine.state().image.is_none());
    assert!(!machine.state().replies.is_empty());
}

#[test]
fn request_publish_freezes_ticket_without_network() {
    let (mut machine, _rx) = transformed_machine();

    let events = machine
        .apply(StateCommand::RequestPublish {
            add_hashtag: true,
            add_disclaimer: false,
        })
        .unwrap();

    assert_eq!(machine.state().stage, Stage::PublishConfirming);
    // Opening the gate must not start a publish.
    assert!(!events
        .iter()
        .any(|e| matches!(e, StateEvent::PublishStarted { .. })));
    let ticket = machine
        .state()
        .pending_publish
        .as_ref()
        .expect("frozen ticket");
    assert_eq!(ticket.text, "炎上化されたテキスト");
    assert!(ticket.add_hashtag);
    assert!(!ticket.add_disclaimer);
}

#[test]
fn cancel_publish_has_zero_side_effects() {
    let (mut machine, _rx) = transformed_machine();
    machine
        .apply(StateCommand::RequestPublish {
            add_hashtag: true,
            add_disclaimer: true,
        })
        .unwrap();

    let events = machine.apply(StateCommand::CancelPublish).unwrap();

    assert_eq!(machine.state().stage, Stage::Transformed);
    assert!(machine.state().pending_publish.is_none());
    assert!(machine.state().publish_outcome.is_none());
    assert!(!events
        .iter()
        .any(|e| matches!(e, StateEvent::PublishStarted { .. })));
}

#[test]
fn confirm_publish_sends_the_frozen_ticket() {
    let (mut machine, _rx) = transformed_machine();
    machine
        .apply(StateCommand::RequestPublish {
            add_hashtag: true,
            add_disclaimer: true,
        })
        .unwrap();

    let events = machine.apply(StateCommand::ConfirmPublish).unwrap();
    assert_eq!(machine.state().stage, Stage::Publishing);
    let started = events
        .iter()
        .find_map(|e| match e {
            StateEvent::PublishStarted { ticket, .. } => Some(ticket.clone()),
            _ => None,
        })
        .expect("publish started");
    assert_eq!(started.text, "炎上化されたテキスト");
}

#[test]
fn second_confirm_while_publishing_is_rejected() {
    let (mut machine, _rx) = transformed_machine();
    machine
        .apply(StateCommand::RequestPublish {
            add_hashtag: true,
            add_disclaimer: true,
        })
        .unwrap();
    machine.apply(StateCommand::ConfirmPublish).unwrap();

    // Rapid double-confirm: the gate must reject the second press.
    assert!(machine.apply(StateCommand::ConfirmPublish).is_err());
    assert_eq!(machine.state().stage, Stage::Publishing);
}

#[test]
fn publish_domain_failure_shows_remote_reason() {
    let (mut machine, _rx) = transformed_machine();
    machine
        .apply(StateCommand::RequestPublish {
            add_hashtag: true,
            add_disclaimer: true,
        })
        .unwrap();
    let events = machine.apply(StateCommand::ConfirmPublish).unwrap();

    machine
        .apply(StateCommand::PublishSettled {
            epoch: issued_epoch(&events),
            outcome: ok(PublishOutcome {
                success: false,
                remote_id: None,
                remote_url: None,
                error_reason: Some("投稿に失敗しました".to_string()),
            }),
        })
        .unwrap();

    assert_eq!(machine.state().stage, Stage::PublishFailed);
    assert_eq!(
        machine.state().last_error.as_deref(),
        Some("投稿に失敗しました")
    );

    // The user may re-open the confirmation gate after a failure.
    assert!(machine
        .apply(StateCommand::RequestPublish {
            add_hashtag: true,
            add_disclaimer: true,
        })
        .is_ok());
    assert_eq!(machine.state().stage, Stage::PublishConfirming);
}

#[test]
fn publish_transport_failure_synthesizes_outcome() {
    let (mut machine, _rx) = transformed_machine();
    machine
        .apply(StateCommand::RequestPublish {
            add_hashtag: true,
            add_disclaimer: true,
        })
        .unwrap();
    let events = machine.apply(StateCommand::ConfirmPublish).unwrap();

    machine
        .apply(StateCommand::PublishSettled {
            epoch: issued_epoch(&events),
            outcome: Settlement::failure("request failed: timeout"),
        })
        .unwrap();

    let state = machine.state();
    assert_eq!(state.stage, Stage::PublishFailed);
    let outcome = state.publish_outcome.as_ref().expect("outcome recorded");
    assert!(!outcome.success);
    assert_eq!(outcome.error_reason.as_deref(), Some("request failed: timeout"));
}

#[test]
fn publish_success_reaches_published() {
    let (mut machine, rx) = transformed_machine();
    machine
        .apply(StateCommand::RequestPublish {
            add_hashtag: true,
            add_disclaimer: true,
        })
        .unwrap();
    let events = machine.apply(StateCommand::ConfirmPublish).unwrap();

    machine
        .apply(StateCommand::PublishSettled {
            epoch: issued_epoch(&events),
            outcome: ok(PublishOutcome {
                success: true,
                remote_id: Some("12345".to_string()),
                remote_url: Some("https://example.com/status/12345".to_string()),
                error_reason: None,
            }),
        })
        .unwrap();

    assert_eq!(machine.state().stage, Stage::Published);
    assert!(machine.state().last_error.is_none());
    assert_eq!(rx.borrow().stage, Stage::Published);
}

#[test]
fn stale_replies_settlement_is_discarded_after_reset() {
    let (mut machine, _rx) = transformed_machine();
    let events = machine.apply(StateCommand::SubmitReplies).unwrap();
    let stale_epoch = issued_epoch(&events);

    // User edits while the request is still in flight; workflow resets.
    machine
        .apply(StateCommand::SetInput {
            text: "edited mid-flight".to_string(),
        })
        .unwrap();
    assert_eq!(machine.state().stage, Stage::Idle);

    let events = machine
        .apply(StateCommand::RepliesSettled {
            epoch: stale_epoch,
            outcome: ok(four_replies()),
        })
        .unwrap();

    assert!(machine.state().replies.is_empty());
    assert_eq!(machine.state().stage, Stage::Idle);
    assert!(events.iter().any(|e| matches!(
        e,
        StateEvent::StaleSettlementDiscarded { op: OperationKind::Replies, .. }
    )));
}

#[test]
fn no_overlapping_operations_of_any_kind() {
    let (mut machine, _rx) = create_machine();
    machine
        .apply(StateCommand::SetInput {
            text: "text".to_string(),
        })
        .unwrap();
    machine.apply(StateCommand::SubmitTransform).unwrap();

    assert!(machine.apply(StateCommand::SubmitTransform).is_err());
    assert!(machine.apply(StateCommand::SubmitReplies).is_err());
    assert!(machine
        .apply(StateCommand::SubmitImage {
            style: ImageStyle::Meme,
            aspect_ratio: AspectRatio::Square,
        })
        .is_err());
    assert!(machine
        .apply(StateCommand::RequestPublish {
            add_hashtag: true,
            add_disclaimer: true,
        })
        .is_err());
}

#[test]
fn partial_response_notice_is_surfaced_with_the_data() {
    let (mut machine, _rx) = create_machine();
    machine
        .apply(StateCommand::SetInput {
            text: "text".to_string(),
        })
        .unwrap();
    let events = machine.apply(StateCommand::SubmitTransform).unwrap();

    machine
        .apply(StateCommand::TransformSettled {
            epoch: issued_epoch(&events),
            outcome: Settlement::Success {
                payload: sample_transformed("text"),
                notice: Some("explanation degraded".to_string()),
            },
        })
        .unwrap();

    assert_eq!(machine.state().stage, Stage::Transformed);
    assert!(machine.state().transformed.is_some());
    assert_eq!(
        machine.state().last_error.as_deref(),
        Some("explanation degraded")
    );
}

#[test]
fn reset_session_returns_to_pristine_state() {
    let (mut machine, _rx) = transformed_machine();
    machine.apply(StateCommand::ResetSession).unwrap();

    let state = machine.state();
    assert_eq!(state.stage, Stage::Idle);
    assert!(state.input_text.is_empty());
    assert_eq!(state.escalation_level, crate::state::DEFAULT_LEVEL);
    assert!(state.transformed.is_none());
}

proptest! {
    /// Any real edit after a successful transform discards every derived
    /// artifact and returns to Idle, whatever the new text is.
    #[test]
    fn any_edit_after_transform_resets(new_text in ".{1,100}") {
        prop_assume!(new_text != "テスト投稿");
        let (mut machine, _rx) = transformed_machine();

        machine
            .apply(StateCommand::SetInput { text: new_text })
            .unwrap();

        prop_assert_eq!(machine.state().stage, Stage::Idle);
        prop_assert!(machine.state().transformed.is_none());
        prop_assert!(machine.state().replies.is_empty());
        prop_assert!(machine.state().image.is_none());
        prop_assert!(machine.state().publish_outcome.is_none());
    }

    /// Any level change away from the current value resets as well.
    #[test]
    fn any_level_change_after_transform_resets(level in 1u8..=5) {
        let (mut machine, _rx) = transformed_machine();
        prop_assume!(level != machine.state().escalation_level);

        machine.apply(StateCommand::SetLevel { level }).unwrap();

        prop_assert_eq!(machine.state().stage, Stage::Idle);
        prop_assert!(machine.state().transformed.is_none());
    }
}
