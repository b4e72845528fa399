//! Terminal front end: raw-mode setup, the event/snapshot select loop, and
//! teardown. Key handling lives in `app`, drawing in `ui`.

mod app;
mod ui;

pub use app::App;

use crate::logging::StructuredLogger;
use crate::state_machine::{StateCommand, StateSnapshot};
use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, KeyEventKind};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub async fn run(
    command_tx: mpsc::UnboundedSender<StateCommand>,
    mut snapshot_rx: watch::Receiver<StateSnapshot>,
    logger: Arc<StructuredLogger>,
) -> Result<()> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableBracketedPaste
    )?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let initial = snapshot_rx.borrow().clone();
    let mut application = App::new(initial, command_tx, logger);

    let result = event_loop(&mut terminal, &mut application, &mut snapshot_rx).await;

    restore_terminal(&mut terminal);
    result
}

async fn event_loop(
    terminal: &mut ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
    application: &mut App,
    snapshot_rx: &mut watch::Receiver<StateSnapshot>,
) -> Result<()> {
    let mut event_stream = crossterm::event::EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(100));

    loop {
        terminal.draw(|frame| ui::render(frame, application))?;

        tokio::select! {
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(CrosstermEvent::Key(key))) => {
                        if key.kind == KeyEventKind::Press {
                            application.on_key(key);
                        }
                    }
                    Some(Ok(CrosstermEvent::Paste(text))) => application.paste(&text),
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            changed = snapshot_rx.changed() => {
                if changed.is_err() {
                    // Driver is gone; nothing left to render against.
                    break;
                }
                let snapshot = snapshot_rx.borrow_and_update().clone();
                application.on_snapshot(snapshot);
            }
            _ = tick.tick() => {}
        }

        if application.should_quit {
            break;
        }
    }
    Ok(())
}

fn restore_terminal(
    terminal: &mut ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
) {
    let _ = crossterm::terminal::disable_raw_mode();
    let _ = crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableBracketedPaste
    );
    let _ = terminal.show_cursor();
}
