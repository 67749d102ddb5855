use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::App;
use crate::app::probe::ProbeState;
use crate::ui::constants::MODAL_WIDTH_PERCENT;
use crate::ui::helpers::{centered_rect_by_height, draw_popup_frame, key_hint, modal_height};

pub(crate) fn draw_retry_modal(frame: &mut Frame<'_>, app: &App) {
    let Some(prober) = &app.prober else {
        return;
    };
    let ProbeState::Failed(err) = &prober.state else {
        return;
    };
    let height = modal_height(3, 2);
    let area = centered_rect_by_height(MODAL_WIDTH_PERCENT, height, frame.area());
    let inner = draw_popup_frame(
        frame,
        area,
        "Connection failed",
        Style::default().fg(Color::Red),
    );
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(2)].as_ref())
        .split(inner);

    let message = Paragraph::new(format!("{}: {err}", prober.host())).wrap(Wrap { trim: true });
    frame.render_widget(message, layout[0]);

    let mut footer = key_hint("R", "to retry,");
    footer.push(Span::raw(" "));
    footer.extend(key_hint("E", "or"));
    footer.push(Span::raw(" "));
    footer.extend(key_hint("Enter", "to edit the details"));
    frame.render_widget(
        Paragraph::new(Line::from(footer))
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::TOP)),
        layout[1],
    );
}

pub(crate) fn draw_pick_another_modal(frame: &mut Frame<'_>, app: &App) {
    let Some(browser) = &app.browser else {
        return;
    };
    let height = modal_height(1, 2);
    let area = centered_rect_by_height(50, height, frame.area());
    let inner = draw_popup_frame(
        frame,
        area,
        "Pick another?",
        Style::default().fg(Color::Yellow),
    );
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)].as_ref())
        .split(inner);

    let count = browser.selection.len();
    let noun = if count == 1 { "item" } else { "items" };
    frame.render_widget(
        Paragraph::new(format!("{count} {noun} selected. Pick another one?"))
            .wrap(Wrap { trim: true }),
        layout[0],
    );

    let mut footer = key_hint("Y", "to keep browsing,");
    footer.push(Span::raw(" "));
    footer.extend(key_hint("N", "to start the backup"));
    frame.render_widget(
        Paragraph::new(Line::from(footer))
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::TOP)),
        layout[1],
    );
}

pub(crate) fn draw_summary_modal(frame: &mut Frame<'_>, app: &App) {
    let summary = app.summary_lines();
    let failed = app
        .archive_outcome
        .iter()
        .chain(app.upload_outcome.iter())
        .any(|outcome| !outcome.is_success());
    let (title, style) = if failed {
        ("Backup finished with errors", Style::default().fg(Color::Red))
    } else {
        ("Backup complete", Style::default().fg(Color::Green))
    };
    let height = modal_height(summary.len().max(1), 2);
    let area = centered_rect_by_height(MODAL_WIDTH_PERCENT, height, frame.area());
    let inner = draw_popup_frame(frame, area, title, style);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)].as_ref())
        .split(inner);

    let lines: Vec<Line> = summary.into_iter().map(Line::from).collect();
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), layout[0]);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw("Press "),
            Span::styled("any key", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" to exit."),
        ]))
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::TOP)),
        layout[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BatchOutcome, ItemError, Stage};
    use crate::ui::tests::{buffer_text, render};

    #[test]
    fn summary_modal_lists_errors() {
        let mut app = App::for_test();
        app.stage = Stage::Delete;
        app.archive_outcome = Some(BatchOutcome {
            succeeded: 2,
            errors: Vec::new(),
        });
        app.upload_outcome = Some(BatchOutcome {
            succeeded: 1,
            errors: vec![ItemError {
                item: "b-backup.zip".to_string(),
                message: "permission denied".to_string(),
            }],
        });
        let terminal = render(80, 16, |frame| draw_summary_modal(frame, &app));
        let content = buffer_text(&terminal);
        assert!(content.contains("Backup finished with errors"));
        assert!(content.contains("Archives: 2 succeeded"));
        assert!(content.contains("b-backup.zip: permission denied"));
    }
}
