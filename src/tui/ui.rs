//! Rendering. Everything here is a pure function of `App`; all workflow
//! semantics live behind the `ViewState` flags.

use crate::state::Stage;
use crate::tui::app::{App, InputMode};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

pub fn render(frame: &mut Frame, app: &App) {
    let [header, input, level, body, error, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(6),
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(2),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, app, header);
    render_input(frame, app, input);
    render_level(frame, app, level);
    render_body(frame, app, body);
    render_error(frame, app, error);
    render_footer(frame, app, footer);

    if app.view.confirming || app.snapshot.stage == Stage::Publishing {
        render_confirm_overlay(frame, app);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "🔥 flamesim",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  ·  "),
        Span::raw(app.view.status_line.clone()),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let title = format!(
        " Your post ({}/{} chars){} ",
        app.view.input_chars_used,
        app.view.input_chars_used + app.view.input_chars_remaining,
        if editing { ", Esc to finish" } else { "" },
    );
    let border_style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let widget = Paragraph::new(app.input.as_str())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        );
    frame.render_widget(widget, area);

    if editing {
        // Cursor math only handles the single-line case exactly; for wrapped
        // text it pins to the last line, which is good enough for a preview.
        let before_cursor: String = app.input.chars().take(app.cursor).collect();
        let last_line = before_cursor.rsplit('\n').next().unwrap_or("");
        let x = area.x + 1 + (last_line.width() as u16).min(area.width.saturating_sub(2));
        let y = area.y
            + 1
            + (before_cursor.matches('\n').count() as u16).min(area.height.saturating_sub(3));
        frame.set_cursor_position((x, y));
    }
}

fn render_level(frame: &mut Frame, app: &App, area: Rect) {
    let level = app.snapshot.escalation_level;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Escalation level {level}/5 (←/→ adjusts) ")),
        )
        .gauge_style(Style::default().fg(Color::Red))
        .ratio(f64::from(level) / 5.0)
        .label(format!("{level}"));
    frame.render_widget(gauge, area);
}

fn render_body(frame: &mut Frame, app: &App, area: Rect) {
    let [result_area, replies_area] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(area);

    render_result(frame, app, result_area);
    render_replies(frame, app, replies_area);
}

fn render_result(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    match &app.snapshot.transformed {
        Some(t) => {
            lines.push(Line::styled(
                t.rewritten_text.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            if let Some(explanation) = &t.explanation {
                lines.push(Line::raw(""));
                lines.push(Line::styled(
                    format!("Why this burns: {explanation}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        None => {
            let hint = if app.view.is_busy {
                "working…"
            } else {
                "no rewrite yet, press Enter to escalate your post"
            };
            lines.push(Line::styled(hint, Style::default().fg(Color::DarkGray)));
        }
    }

    if let Some(image) = &app.snapshot.image {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            format!("Image [{}]: {}", shorten(&image.url, 40), image.prompt),
            Style::default().fg(Color::Cyan),
        ));
    }
    if let Some(outcome) = &app.snapshot.publish_outcome {
        lines.push(Line::raw(""));
        if outcome.success {
            let url = outcome.remote_url.as_deref().unwrap_or("(no url)");
            lines.push(Line::styled(
                format!("Published: {url}"),
                Style::default().fg(Color::Green),
            ));
        } else {
            lines.push(Line::styled(
                "Publish did not happen.",
                Style::default().fg(Color::Red),
            ));
        }
    }

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Rewrite "));
    frame.render_widget(widget, area);
}

fn render_replies(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = if app.snapshot.replies.is_empty() {
        let hint = if app.snapshot.stage == Stage::RepliesPending {
            "simulating strangers…"
        } else {
            "no replies yet, press r after a rewrite"
        };
        vec![ListItem::new(Line::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        app.snapshot
            .replies
            .iter()
            .map(|reply| {
                ListItem::new(vec![
                    Line::styled(
                        format!("[{}]", reply.category.label()),
                        Style::default().fg(Color::Yellow),
                    ),
                    Line::raw(reply.content.clone()),
                    Line::raw(""),
                ])
            })
            .collect()
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Simulated replies ({}) ", app.snapshot.replies.len())),
    );
    frame.render_widget(list, area);
}

fn render_error(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.view.error_line {
        Some(error) => Line::styled(format!("⚠ {error}"), Style::default().fg(Color::Red)),
        None => Line::raw(""),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let help = match app.input_mode {
        InputMode::Editing => "type your post · Esc done · Ctrl-C quit".to_string(),
        InputMode::Normal => format!(
            "i edit · Enter transform · r replies · g image (s style: {}) · p publish [#{} ⚠{}] · R reset · q quit",
            app.image_style.label(),
            on_off(app.add_hashtag),
            on_off(app.add_disclaimer),
        ),
    };
    frame.render_widget(
        Paragraph::new(Line::styled(help, Style::default().fg(Color::DarkGray))),
        area,
    );
}

/// The confirmation gate: shows the literal frozen payload, never a
/// placeholder, and offers exactly confirm or cancel.
fn render_confirm_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 50, frame.area());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = Vec::new();
    if let Some(ticket) = &app.snapshot.pending_publish {
        lines.push(Line::styled(
            "About to publish:",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::raw(""));
        lines.push(Line::raw(ticket.text.clone()));
        lines.push(Line::raw(""));
        if let Some(url) = &ticket.image_url {
            lines.push(Line::raw(format!("with image: {}", shorten(url, 50))));
        }
        lines.push(Line::raw(format!(
            "hashtag: {} · disclaimer: {}",
            on_off(ticket.add_hashtag),
            on_off(ticket.add_disclaimer),
        )));
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            "This text was generated by a flame-war simulator. Posting it is on you.",
            Style::default().fg(Color::Yellow),
        ));
        lines.push(Line::raw(""));
    }
    lines.push(match app.snapshot.stage {
        Stage::Publishing => Line::styled("publishing…", Style::default().fg(Color::DarkGray)),
        _ => Line::styled(
            "y: publish   n: cancel",
            Style::default().add_modifier(Modifier::BOLD),
        ),
    });

    let widget = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Confirm publish "),
    );
    frame.render_widget(widget, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, horizontal, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vertical);
    horizontal
}

fn shorten(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}…")
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
