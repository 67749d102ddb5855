use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs, Wrap};

use crate::app::App;
use crate::model::Stage;
use crate::ui::constants::{APP_TITLE, stage_help};

pub(crate) fn draw_app_header(frame: &mut Frame<'_>, area: Rect) {
    let title = Paragraph::new(APP_TITLE)
        .style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

/// One tab per stage; finished stages are dimmed, the current one is bold.
pub(crate) fn draw_stage_bar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let titles: Vec<Line> = Stage::ALL
        .iter()
        .map(|stage| {
            let style = if *stage < app.stage {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::from(Span::styled(stage.label(), style))
        })
        .collect();
    let selected = Stage::ALL
        .iter()
        .position(|stage| *stage == app.stage)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

pub(crate) fn draw_help_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let help = Paragraph::new(stage_help(app.stage))
        .block(
            Block::default()
                .title(Line::from(Span::styled(
                    "Help",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true });
    frame.render_widget(help, area);
}

pub(crate) fn draw_logs(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let mut log_lines = app
        .log_lines
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .cloned()
        .collect::<Vec<_>>();
    log_lines.reverse();
    let file_name = app
        .log_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let logs = Paragraph::new(log_lines.join("\n"))
        .block(
            Block::default()
                .title(Line::from(Span::styled(
                    format!("Logs ({file_name})"),
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                )))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true });
    frame.render_widget(logs, area);
}

pub(crate) fn draw_status_line(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", app.stage.label()),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::raw(app.status.clone()),
    ]));
    frame.render_widget(status, area);
}
