use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::model::{Field, ParamsFormState};
use crate::ui::constants::{LABEL_WIDTH, POPUP_MIN_HEIGHT, POPUP_MIN_WIDTH};

pub(crate) fn field_line(
    label: &str,
    value: &str,
    active: bool,
    mask: bool,
    label_width: usize,
    max_value_width: usize,
) -> Line<'static> {
    let display = if mask && !value.is_empty() {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let mut spans = labelled(label, active, label_width);
    spans.push(Span::raw(truncate_text(&display, max_value_width)));
    Line::from(spans)
}

pub(crate) fn switch_line(label: &str, on: bool, active: bool, label_width: usize) -> Line<'static> {
    let (mark, style) = if on {
        ("[x] on", Style::default().fg(Color::Green))
    } else {
        ("[ ] off", Style::default().fg(Color::Gray))
    };
    let mut spans = labelled(label, active, label_width);
    spans.push(Span::styled(mark, style));
    Line::from(spans)
}

pub(crate) fn action_line(label: &str, active: bool) -> Line<'static> {
    Line::from(vec![
        cursor_mark(active),
        Span::styled(label.to_string(), Style::default().add_modifier(Modifier::BOLD)),
    ])
}

/// Cursor mark plus the padded bold label shared by every form row.
fn labelled(label: &str, active: bool, label_width: usize) -> Vec<Span<'static>> {
    vec![
        cursor_mark(active),
        Span::styled(
            format!("{label:<label_width$}: "),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]
}

fn cursor_mark(active: bool) -> Span<'static> {
    let mark = if active { "> " } else { "  " };
    Span::styled(mark, Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
}

pub(crate) fn key_hint(key: &str, action: &str) -> Vec<Span<'static>> {
    vec![
        Span::styled(key.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {action}")),
    ]
}

pub(crate) fn truncate_text(value: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    let count = value.chars().count();
    if count <= max_width {
        return value.to_string();
    }
    if max_width <= 3 {
        return value.chars().take(max_width).collect();
    }
    let mut trimmed: String = value.chars().take(max_width - 3).collect();
    trimmed.push_str("...");
    trimmed
}

/// Keeps the tail of a path, which is the part that tells entries apart.
pub(crate) fn truncate_path(value: &str, max_width: usize) -> String {
    let count = value.chars().count();
    if count <= max_width {
        return value.to_string();
    }
    if max_width <= 3 {
        return value.chars().skip(count - max_width).collect();
    }
    let tail: String = value.chars().skip(count - (max_width - 3)).collect();
    format!("...{tail}")
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0usize;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Places the terminal cursor after the text of the active form field.
pub(crate) fn render_form_cursor(frame: &mut Frame<'_>, form: &ParamsFormState, area: Rect) {
    let (row, col) = match form.active_field {
        Field::User => (0u16, form.user.chars().count()),
        Field::Host => (1, form.host.chars().count()),
        Field::Password => (2, form.password.chars().count()),
        _ => return,
    };
    if row >= area.height {
        return;
    }
    let indicator_len = 2u16;
    let label_len = LABEL_WIDTH as u16 + 2;
    let cursor_x = area.x + indicator_len + label_len + col as u16;
    frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), area.y + row));
}

pub(crate) fn centered_rect_by_height(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = (area.width * percent_x / 100).min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    centered_rect_abs(width, height, area)
}

pub(crate) fn centered_rect_abs(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.max(POPUP_MIN_WIDTH).min(area.width);
    let height = height.max(POPUP_MIN_HEIGHT).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width,
        height,
    }
}

pub(crate) fn padded_rect(area: Rect, pad: u16) -> Rect {
    Rect {
        x: area.x + pad,
        y: area.y + pad,
        width: area.width.saturating_sub(pad * 2),
        height: area.height.saturating_sub(pad * 2),
    }
}

pub(crate) fn modal_height(content_lines: usize, footer_lines: usize) -> u16 {
    let total = content_lines + footer_lines;
    (total as u16).saturating_add(2 + 2)
}

pub(crate) fn draw_popup_frame(frame: &mut Frame<'_>, area: Rect, title: &str, style: Style) -> Rect {
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).border_style(style);
    frame.render_widget(block, area);
    let inner = padded_rect(area, 1);
    if inner.height < 2 {
        return inner;
    }
    let title_line = Paragraph::new(title.to_string())
        .alignment(Alignment::Center)
        .style(style.add_modifier(Modifier::BOLD));
    frame.render_widget(title_line, Rect { height: 1, ..inner });
    let separator = Paragraph::new("-".repeat(inner.width as usize)).style(style);
    frame.render_widget(
        separator,
        Rect {
            y: inner.y + 1,
            height: 1,
            ..inner
        },
    );
    Rect {
        y: inner.y + 2,
        height: inner.height.saturating_sub(2),
        ..inner
    }
}

pub(crate) fn list_state(selected: usize, len: usize) -> ratatui::widgets::ListState {
    let mut state = ratatui::widgets::ListState::default();
    if len == 0 {
        state.select(None);
    } else {
        state.select(Some(selected.min(len.saturating_sub(1))));
    }
    state
}
