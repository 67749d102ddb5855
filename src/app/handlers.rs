use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::browser::BrowserMode;
use crate::app::form::EditAction;
use crate::app::probe::ProbeState;
use crate::app::{App, HeaderMode, SessionEnd};
use crate::model::{Field, Stage, StageMessage};

impl App {
    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.dispatch(StageMessage::Interrupt);
            return;
        }
        if key.code == KeyCode::F(2) {
            self.cycle_header_mode();
            return;
        }
        match self.stage {
            Stage::Input => self.handle_form_key(key),
            Stage::Check => self.handle_check_key(key),
            Stage::Files => self.handle_browser_key(key),
            Stage::Create | Stage::Upload => {}
            Stage::Delete => self.end_session(SessionEnd::Completed),
        }
    }

    fn cycle_header_mode(&mut self) {
        self.header_mode = match self.header_mode {
            HeaderMode::Help => HeaderMode::Logs,
            HeaderMode::Logs => HeaderMode::Off,
            HeaderMode::Off => HeaderMode::Help,
        };
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Down => self.advance_field(true),
            KeyCode::BackTab | KeyCode::Up => self.advance_field(false),
            KeyCode::Enter => {
                if let Some(message) = self.submit_or_advance() {
                    self.dispatch(message);
                }
            }
            KeyCode::Backspace => self.edit_active_field(EditAction::Backspace),
            KeyCode::Char(' ') if !self.form.active_field.is_text() => {
                self.toggle_active_flag();
            }
            KeyCode::Char(ch) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    return;
                }
                self.edit_active_field(EditAction::Insert(ch));
            }
            _ => {}
        }
    }

    fn handle_check_key(&mut self, key: KeyEvent) {
        let failed = self
            .prober
            .as_ref()
            .is_some_and(|prober| matches!(prober.state, ProbeState::Failed(_)));
        if !failed {
            return;
        }
        match key.code {
            KeyCode::Char('r') => self.retry_probe(),
            KeyCode::Char('e') | KeyCode::Enter => self.edit_params(),
            _ => {}
        }
    }

    fn handle_browser_key(&mut self, key: KeyEvent) {
        let Some(browser) = self.browser.as_mut() else {
            return;
        };
        if browser.mode == BrowserMode::PickAnother {
            let answer = match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => true,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
                _ => return,
            };
            if let Some(message) = browser.answer_prompt(answer) {
                self.dispatch(message);
            }
            return;
        }
        match key.code {
            KeyCode::Up => browser.move_up(),
            KeyCode::Down => browser.move_down(),
            KeyCode::Right => browser.open_highlighted(),
            KeyCode::Left => browser.parent(),
            KeyCode::Enter => browser.activate(),
            KeyCode::Tab => browser.select_highlighted(),
            KeyCode::Backspace => browser.pop_query(),
            KeyCode::Esc => {
                let message = browser.finish();
                self.dispatch(message);
            }
            KeyCode::Char(ch) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    browser.push_query(ch);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::app::tests::wait_until;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn form_keys_fill_and_submit() {
        let mut app = App::for_test();
        type_text(&mut app, "pi");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "raspberrypi");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "se cret");
        press(&mut app, KeyCode::Down);
        assert_eq!(app.form.active_field, Field::Debug);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.form.flags.debug);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.form.active_field, Field::Password);
        assert_eq!(app.form.password, "se cret");

        for _ in 0..4 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.form.active_field, Field::ActionStart);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.stage, Stage::Check);
        assert_eq!(app.params.as_ref().unwrap().host, "raspberrypi");
        assert!(app.params.as_ref().unwrap().flags.debug);
    }

    #[test]
    fn ctrl_c_interrupts() {
        let mut app = App::for_test();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(app.exit, Some(SessionEnd::Interrupted));
        assert!(app.scratch.is_removed());
    }

    #[test]
    fn f2_cycles_header_mode() {
        let mut app = App::for_test();
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.header_mode, HeaderMode::Logs);
        press(&mut app, KeyCode::F(2));
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.header_mode, HeaderMode::Help);
    }

    #[test]
    fn browser_keys_select_and_finish() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "n").unwrap();
        let mut app = App::for_test();
        app.settings.last_browse_dir = Some(dir.path().display().to_string());
        app.dispatch(StageMessage::InputDone(crate::app::tests::params()));
        wait_until(|| {
            app.poll_components();
            app.stage == Stage::Files
        });

        type_text(&mut app, "notes");
        assert_eq!(app.browser.as_ref().unwrap().view.len(), 1);
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.browser.as_ref().unwrap().mode,
            BrowserMode::PickAnother
        );
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.stage, Stage::Create);
        assert_eq!(
            app.settings.last_browse_dir,
            Some(dir.path().display().to_string())
        );
        app.dispatch(StageMessage::Interrupt);
    }

    #[test]
    fn check_keys_only_apply_after_failure() {
        let backend = std::sync::Arc::new(crate::app::ssh_backend::MockSshBackend::default());
        backend.push_probe(Err(anyhow::anyhow!("no route to host")));
        let mut app = App::for_test_with_backend(backend);
        app.dispatch(StageMessage::InputDone(crate::app::tests::params()));
        wait_until(|| {
            app.poll_components();
            app.status.contains("no route to host")
        });
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.stage, Stage::Input);
    }

    #[test]
    fn any_key_leaves_summary() {
        let mut app = App::for_test();
        app.stage = Stage::Delete;
        press(&mut app, KeyCode::Char('q'));
        assert_eq!(app.exit, Some(SessionEnd::Completed));
    }
}
