use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::app::browser::BrowserMode;
use crate::app::probe::ProbeState;
use crate::app::{App, HeaderMode};
use crate::model::Stage;
use crate::ui::constants::{HEADER_HEIGHT, STATUS_HEIGHT, compact_columns};
use crate::ui::modals::{draw_pick_another_modal, draw_retry_modal, draw_summary_modal};
use crate::ui::panels::{
    draw_app_header, draw_help_header, draw_logs, draw_stage_bar, draw_status_line,
};
use crate::ui::views::{draw_batch, draw_browser, draw_check, draw_form};

pub(crate) mod constants;
pub(crate) mod helpers;
mod modals;
mod panels;
mod views;

pub(crate) fn draw_ui(frame: &mut Frame<'_>, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(1),
                Constraint::Length(STATUS_HEIGHT),
            ]
            .as_ref(),
        )
        .split(frame.area());
    draw_header(frame, app, rows[0]);
    draw_status_line(frame, app, rows[2]);

    let show_logs = app.header_mode == HeaderMode::Logs
        || app.params.as_ref().is_some_and(|params| params.flags.debug);
    let body = if show_logs {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(compact_columns().as_ref())
            .split(rows[1]);
        draw_logs(frame, app, columns[1]);
        columns[0]
    } else {
        rows[1]
    };
    draw_stage_body(frame, app, body);

    match app.stage {
        Stage::Check
            if app
                .prober
                .as_ref()
                .is_some_and(|prober| matches!(prober.state, ProbeState::Failed(_))) =>
        {
            draw_retry_modal(frame, app);
        }
        Stage::Files
            if app
                .browser
                .as_ref()
                .is_some_and(|browser| browser.mode == BrowserMode::PickAnother) =>
        {
            draw_pick_another_modal(frame, app);
        }
        Stage::Delete => draw_summary_modal(frame, app),
        _ => {}
    }
}

fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(20),
                Constraint::Percentage(50),
                Constraint::Percentage(30),
            ]
            .as_ref(),
        )
        .split(area);
    draw_app_header(frame, columns[0]);
    if app.header_mode == HeaderMode::Help {
        draw_stage_bar(frame, app, columns[1]);
        draw_help_header(frame, app, columns[2]);
    } else {
        let stage_area = Rect {
            width: columns[1].width.saturating_add(columns[2].width),
            ..columns[1]
        };
        draw_stage_bar(frame, app, stage_area);
    }
}

fn draw_stage_body(frame: &mut Frame<'_>, app: &App, area: Rect) {
    match app.stage {
        Stage::Input => draw_form(frame, app, area),
        Stage::Check => draw_check(frame, app, area),
        Stage::Files => draw_browser(frame, app, area),
        Stage::Create | Stage::Upload => draw_batch(frame, app, area),
        Stage::Delete => {}
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;

    pub(crate) fn render(
        width: u16,
        height: u16,
        draw: impl FnOnce(&mut Frame<'_>),
    ) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(draw).unwrap();
        terminal
    }

    pub(crate) fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn draw_ui_renders_each_stage() {
        let mut app = App::for_test();
        for stage in Stage::ALL {
            app.stage = stage;
            let terminal = render(120, 30, |frame| draw_ui(frame, &app));
            let content = buffer_text(&terminal);
            assert!(content.contains("BACKUP-TUI"));
            assert!(content.contains(stage.label()));
        }
    }

    #[test]
    fn logs_panel_follows_header_mode() {
        let mut app = App::for_test();
        app.set_status("visible in logs");
        let hidden = buffer_text(&render(120, 30, |frame| draw_ui(frame, &app)));
        assert!(!hidden.contains("Logs"));

        app.header_mode = HeaderMode::Logs;
        let shown = buffer_text(&render(120, 30, |frame| draw_ui(frame, &app)));
        assert!(shown.contains("Logs"));
        assert!(shown.contains("visible in logs"));
    }
}
