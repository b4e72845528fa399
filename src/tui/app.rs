//! TUI application state: local input editing plus the latest workflow
//! snapshot. All workflow mutation goes out as commands; this struct never
//! touches `WorkflowState` directly.

use crate::gateway::types::{AspectRatio, ImageStyle};
use crate::logging::StructuredLogger;
use crate::state::{Stage, MAX_INPUT_CHARS, MAX_LEVEL, MIN_LEVEL};
use crate::state_machine::{StateCommand, StateSnapshot};
use crate::view::ViewState;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    /// Local echo of the post being typed. Synced to the machine on every
    /// keystroke so the edit-resets rule fires on the exact keystroke.
    pub input: String,
    /// Cursor position in characters, not bytes.
    pub cursor: usize,
    pub input_mode: InputMode,
    pub image_style: ImageStyle,
    pub add_hashtag: bool,
    pub add_disclaimer: bool,
    pub snapshot: StateSnapshot,
    pub view: ViewState,
    pub should_quit: bool,
    command_tx: mpsc::UnboundedSender<StateCommand>,
    logger: Arc<StructuredLogger>,
}

impl App {
    pub fn new(
        snapshot: StateSnapshot,
        command_tx: mpsc::UnboundedSender<StateCommand>,
        logger: Arc<StructuredLogger>,
    ) -> Self {
        let view = ViewState::derive(&snapshot);
        Self {
            input: snapshot.input_text.clone(),
            cursor: snapshot.input_text.chars().count(),
            input_mode: InputMode::Editing,
            image_style: ImageStyle::default(),
            add_hashtag: true,
            add_disclaimer: true,
            snapshot,
            view,
            should_quit: false,
            command_tx,
            logger,
        }
    }

    /// Installs a fresh snapshot and recomputes derived view state.
    pub fn on_snapshot(&mut self, snapshot: StateSnapshot) {
        self.view = ViewState::derive(&snapshot);
        self.snapshot = snapshot;
    }

    fn send(&self, command: StateCommand) {
        let _ = self.command_tx.send(command);
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        // The confirmation overlay is modal; it swallows every key.
        if self.view.confirming {
            self.on_confirm_key(key);
            return;
        }
        if self.snapshot.stage == Stage::Publishing {
            // Nothing to press while the post is on the wire.
            return;
        }

        match self.input_mode {
            InputMode::Editing => self.on_editing_key(key),
            InputMode::Normal => self.on_normal_key(key),
        }
    }

    fn on_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.logger.log_user_input("y", "confirm_publish");
                self.send(StateCommand::ConfirmPublish);
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.logger.log_user_input("n", "cancel_publish");
                self.send(StateCommand::CancelPublish);
            }
            _ => {}
        }
    }

    fn on_editing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Enter => self.insert_char('\n'),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.input.chars().count());
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.chars().count(),
            _ => {}
        }
    }

    fn on_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('i') | KeyCode::Char('e') => self.input_mode = InputMode::Editing,
            KeyCode::Left | KeyCode::Char('-') => self.adjust_level(-1),
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_level(1),
            KeyCode::Enter | KeyCode::Char('t') => {
                if self.view.can_submit_transform {
                    self.logger.log_user_input("t", "submit_transform");
                    self.send(StateCommand::SubmitTransform);
                }
            }
            KeyCode::Char('r') => {
                if self.view.can_generate_replies {
                    self.logger.log_user_input("r", "submit_replies");
                    self.send(StateCommand::SubmitReplies);
                }
            }
            KeyCode::Char('s') => self.image_style = self.image_style.next(),
            KeyCode::Char('g') => {
                if self.view.can_generate_image {
                    self.logger.log_user_input("g", "submit_image");
                    self.send(StateCommand::SubmitImage {
                        style: self.image_style,
                        aspect_ratio: AspectRatio::Square,
                    });
                }
            }
            KeyCode::Char('h') => self.add_hashtag = !self.add_hashtag,
            KeyCode::Char('d') => self.add_disclaimer = !self.add_disclaimer,
            KeyCode::Char('p') => {
                if self.view.can_request_publish {
                    self.logger.log_user_input("p", "request_publish");
                    self.send(StateCommand::RequestPublish {
                        add_hashtag: self.add_hashtag,
                        add_disclaimer: self.add_disclaimer,
                    });
                }
            }
            KeyCode::Char('R') => {
                self.logger.log_user_input("R", "reset_session");
                self.input.clear();
                self.cursor = 0;
                self.send(StateCommand::ResetSession);
            }
            _ => {}
        }
    }

    fn adjust_level(&mut self, delta: i8) {
        let level = self
            .snapshot
            .escalation_level
            .saturating_add_signed(delta)
            .clamp(MIN_LEVEL, MAX_LEVEL);
        if level != self.snapshot.escalation_level {
            self.send(StateCommand::SetLevel { level });
        }
    }

    fn insert_char(&mut self, c: char) {
        if self.input.chars().count() >= MAX_INPUT_CHARS {
            return;
        }
        let byte_idx = char_to_byte_idx(&self.input, self.cursor);
        self.input.insert(byte_idx, c);
        self.cursor += 1;
        self.send(StateCommand::SetInput {
            text: self.input.clone(),
        });
    }

    fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let byte_idx = char_to_byte_idx(&self.input, self.cursor - 1);
        self.input.remove(byte_idx);
        self.cursor -= 1;
        self.send(StateCommand::SetInput {
            text: self.input.clone(),
        });
    }

    pub fn paste(&mut self, text: &str) {
        for c in text.chars() {
            if self.input.chars().count() >= MAX_INPUT_CHARS {
                break;
            }
            let byte_idx = char_to_byte_idx(&self.input, self.cursor);
            self.input.insert(byte_idx, c);
            self.cursor += 1;
        }
        self.send(StateCommand::SetInput {
            text: self.input.clone(),
        });
    }
}

fn char_to_byte_idx(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
