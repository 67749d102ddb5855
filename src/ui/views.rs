use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap};

use crate::app::App;
use crate::app::probe::ProbeState;
use crate::model::{Field, JobState, Stage};
use crate::ui::constants::{FORM_WIDTH, LABEL_WIDTH};
use crate::ui::helpers::{
    action_line, centered_rect_abs, draw_popup_frame, field_line, format_bytes, key_hint,
    list_state, modal_height, render_form_cursor, switch_line, truncate_path,
};

pub(crate) fn draw_form(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let form = &app.form;
    let value_width = FORM_WIDTH.saturating_sub(6 + LABEL_WIDTH as u16 + 2) as usize;
    let mut lines = vec![
        field_line(
            "User",
            &form.user,
            form.active_field == Field::User,
            false,
            LABEL_WIDTH,
            value_width,
        ),
        field_line(
            "Host",
            &form.host,
            form.active_field == Field::Host,
            false,
            LABEL_WIDTH,
            value_width,
        ),
        field_line(
            "Password",
            &form.password,
            form.active_field == Field::Password,
            true,
            LABEL_WIDTH,
            value_width,
        ),
        switch_line(
            "Debug",
            form.flags.debug,
            form.active_field == Field::Debug,
            LABEL_WIDTH,
        ),
        switch_line(
            "Print commands",
            form.flags.show_commands,
            form.active_field == Field::ShowCommands,
            LABEL_WIDTH,
        ),
        switch_line(
            "Show progress",
            form.flags.show_progress,
            form.active_field == Field::ShowProgress,
            LABEL_WIDTH,
        ),
        Line::from(""),
        action_line("Start", form.active_field == Field::ActionStart),
    ];
    if let Some(message) = &form.feedback {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let height = modal_height(lines.len(), 2);
    let popup = centered_rect_abs(FORM_WIDTH, height, area);
    let inner = draw_popup_frame(
        frame,
        popup,
        "Backup target",
        Style::default().fg(Color::Yellow),
    );
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)].as_ref())
        .split(inner);
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }),
        layout[0],
    );
    render_form_cursor(frame, form, layout[0]);

    let mut footer = key_hint("Tab", "to move,");
    footer.push(Span::raw(" "));
    footer.extend(key_hint("Space", "to toggle,"));
    footer.push(Span::raw(" "));
    footer.extend(key_hint("Enter", "on Start to begin"));
    frame.render_widget(
        Paragraph::new(Line::from(footer))
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::TOP)),
        layout[1],
    );
}

pub(crate) fn draw_check(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(prober) = &app.prober else {
        return;
    };
    let (text, style) = match &prober.state {
        ProbeState::Running => (
            format!(
                "Checking {} (attempt {})...",
                prober.host(),
                prober.attempts
            ),
            Style::default().fg(Color::Yellow),
        ),
        ProbeState::Connected => (
            format!("Connected to {}", prober.host()),
            Style::default().fg(Color::Green),
        ),
        ProbeState::Failed(err) => (
            format!(
                "Could not reach {} (attempt {}): {err}",
                prober.host(),
                prober.attempts
            ),
            Style::default().fg(Color::Red),
        ),
    };
    let paragraph = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Server check"))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

pub(crate) fn draw_browser(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(browser) = &app.browser else {
        return;
    };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(columns[0]);

    let width = left[0].width as usize;
    let header = Paragraph::new(vec![
        Line::from(format!(
            "Dir: {}",
            truncate_path(&browser.cwd.display().to_string(), width.saturating_sub(5))
        )),
        Line::from(vec![
            Span::styled("Filter: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(browser.query.clone()),
        ]),
    ])
    .style(Style::default().fg(Color::Gray));
    frame.render_widget(header, left[0]);

    let items: Vec<ListItem> = if browser.view.is_empty() {
        vec![ListItem::new("No matching entries")]
    } else {
        browser
            .view
            .iter()
            .map(|entry| {
                let suffix = if entry.is_dir { "/" } else { "" };
                let style = if browser.selection.contains(&entry.path) {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };
                ListItem::new(Span::styled(format!("{}{suffix}", entry.name), style))
            })
            .collect()
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Pick files"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol(Span::styled("> ", Style::default().fg(Color::White)));
    frame.render_stateful_widget(
        list,
        left[1],
        &mut list_state(browser.selected, browser.view.len()),
    );

    if let Some(message) = &browser.feedback {
        frame.render_widget(
            Paragraph::new(message.clone()).style(Style::default().fg(Color::Red)),
            left[2],
        );
    }

    let selected_width = columns[1].width.saturating_sub(2) as usize;
    let selected: Vec<ListItem> = browser
        .selection
        .iter()
        .map(|path| ListItem::new(truncate_path(&path.display().to_string(), selected_width)))
        .collect();
    let title = format!("Selected ({})", browser.selection.len());
    frame.render_widget(
        List::new(selected).block(Block::default().borders(Borders::ALL).title(title)),
        columns[1],
    );
}

/// Create and Upload share one view: a job list plus an overall gauge.
pub(crate) fn draw_batch(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let (title, rows, progress, finished, failures) = match app.stage {
        Stage::Create => {
            let Some(archiver) = &app.archiver else {
                return;
            };
            let rows: Vec<(String, JobState)> = archiver
                .jobs
                .iter()
                .map(|job| (job.source.display().to_string(), job.state))
                .collect();
            (
                "Creating archives",
                rows,
                archiver.progress(),
                archiver.is_finished(),
                archiver.failures(),
            )
        }
        Stage::Upload => {
            let Some(uploader) = &app.uploader else {
                return;
            };
            let rows: Vec<(String, JobState)> = uploader
                .jobs
                .iter()
                .map(|job| {
                    let label = if job.state == JobState::Running && job.bytes > 0 {
                        format!("{} ({})", job.name, format_bytes(job.bytes))
                    } else {
                        job.name.clone()
                    };
                    (label, job.state)
                })
                .collect();
            (
                "Uploading archives",
                rows,
                uploader.progress(),
                uploader.is_finished(),
                uploader.failures(),
            )
        }
        _ => return,
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
            ]
            .as_ref(),
        )
        .split(area);

    let (current, total) = progress;
    let mut label = if finished {
        "Finishing...".to_string()
    } else {
        format!("Processing item {current} of {total}")
    };
    if finished && failures > 0 {
        label.push_str(&format!(" ({failures} failed)"));
    }
    frame.render_widget(
        Paragraph::new(label).style(Style::default().add_modifier(Modifier::BOLD)),
        layout[0],
    );

    let done = rows
        .iter()
        .filter(|(_, state)| matches!(state, JobState::Succeeded | JobState::Failed))
        .count();
    let ratio = if total == 0 {
        1.0
    } else {
        done as f64 / total as f64
    };
    frame.render_widget(
        Gauge::default()
            .ratio(ratio)
            .label(format!("{done} / {total}"))
            .gauge_style(Style::default().fg(Color::Green)),
        layout[1],
    );

    let width = layout[2].width.saturating_sub(6) as usize;
    let items: Vec<ListItem> = rows
        .into_iter()
        .map(|(label, state)| {
            let (mark, style) = match state {
                JobState::Pending => ("  ", Style::default().fg(Color::Gray)),
                JobState::Running => ("..", Style::default().fg(Color::Yellow)),
                JobState::Succeeded => ("ok", Style::default().fg(Color::Green)),
                JobState::Failed => ("!!", Style::default().fg(Color::Red)),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{mark} "), style),
                Span::raw(truncate_path(&label, width)),
            ]))
        })
        .collect();
    frame.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title(title)),
        layout[2],
    );
}
