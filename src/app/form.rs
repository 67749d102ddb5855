use anyhow::Result;

use crate::app::App;
use crate::model::{Field, ParamsFormState, SessionParams, StageMessage};

pub(super) enum EditAction {
    Insert(char),
    Backspace,
}

impl App {
    /// Back to the first field with user and host taken from the last
    /// successful session.
    pub(crate) fn reset_form(&mut self) {
        self.form = ParamsFormState {
            user: self.settings.last_user.clone().unwrap_or_default(),
            host: self.settings.last_host.clone().unwrap_or_default(),
            ..ParamsFormState::default()
        };
    }

    pub(super) fn advance_field(&mut self, forward: bool) {
        let fields = Field::ORDER;
        let pos = fields
            .iter()
            .position(|field| *field == self.form.active_field)
            .unwrap_or(0);
        let next = if forward {
            (pos + 1) % fields.len()
        } else if pos == 0 {
            fields.len() - 1
        } else {
            pos - 1
        };
        self.form.active_field = fields[next];
    }

    pub(super) fn edit_active_field(&mut self, action: EditAction) {
        let target = match self.form.active_field {
            Field::User => &mut self.form.user,
            Field::Host => &mut self.form.host,
            Field::Password => &mut self.form.password,
            Field::Debug | Field::ShowCommands | Field::ShowProgress | Field::ActionStart => {
                return;
            }
        };
        match action {
            EditAction::Insert(ch) => target.push(ch),
            EditAction::Backspace => {
                target.pop();
            }
        }
    }

    pub(super) fn toggle_active_flag(&mut self) {
        let flags = &mut self.form.flags;
        match self.form.active_field {
            Field::Debug => flags.debug = !flags.debug,
            Field::ShowCommands => flags.show_commands = !flags.show_commands,
            Field::ShowProgress => flags.show_progress = !flags.show_progress,
            _ => {}
        }
    }

    pub(crate) fn build_session_params(&self) -> Result<SessionParams> {
        if self.form.user.trim().is_empty() {
            anyhow::bail!("User is required");
        }
        if self.form.host.trim().is_empty() {
            anyhow::bail!("Host is required");
        }
        if self.form.password.is_empty() {
            anyhow::bail!("Password is required");
        }
        Ok(SessionParams {
            user: self.form.user.trim().to_string(),
            host: self.form.host.trim().to_string(),
            secret: self.form.password.clone(),
            flags: self.form.flags,
        })
    }

    /// Enter on a form field: moves on, or submits from `Start`.
    pub(super) fn submit_or_advance(&mut self) -> Option<StageMessage> {
        if self.form.active_field != Field::ActionStart {
            self.advance_field(true);
            return None;
        }
        match self.build_session_params() {
            Ok(params) => {
                self.form.feedback = None;
                Some(StageMessage::InputDone(params))
            }
            Err(err) => {
                self.form.feedback = Some(format!("Missing fields: {err}"));
                None
            }
        }
    }
}
