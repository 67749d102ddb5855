use ratatui::layout::Constraint;

use crate::model::Stage;

pub(crate) const APP_TITLE: &str = concat!("BACKUP-TUI ", env!("CARGO_PKG_VERSION"));

pub(crate) const HELP_INPUT: &str =
    "Tab/Up/Down move | Space toggle | Enter on Start to begin | F2 view | Ctrl+C quit";
pub(crate) const HELP_CHECK: &str = "(r)etry | (e)dit or Enter to change details | Ctrl+C quit";
pub(crate) const HELP_FILES: &str =
    "Up/Down move | Right/Enter open | Left up | Enter/Tab select | type to filter | Esc done";
pub(crate) const HELP_BATCH: &str = "Working... | F2 view | Ctrl+C cancel and quit";
pub(crate) const HELP_DELETE: &str = "Press any key to exit";

pub(crate) const LABEL_WIDTH: usize = 14;

pub(crate) const HEADER_HEIGHT: u16 = 3;
pub(crate) const STATUS_HEIGHT: u16 = 1;

pub(crate) const COMPACT_COLUMN_PERCENTAGES: [u16; 2] = [60, 40];

pub(crate) const MODAL_WIDTH_PERCENT: u16 = 60;
pub(crate) const FORM_WIDTH: u16 = 60;

pub(crate) const POPUP_MIN_WIDTH: u16 = 10;
pub(crate) const POPUP_MIN_HEIGHT: u16 = 5;

pub(crate) fn compact_columns() -> [Constraint; 2] {
    COMPACT_COLUMN_PERCENTAGES.map(Constraint::Percentage)
}

pub(crate) fn stage_help(stage: Stage) -> &'static str {
    match stage {
        Stage::Input => HELP_INPUT,
        Stage::Check => HELP_CHECK,
        Stage::Files => HELP_FILES,
        Stage::Create | Stage::Upload => HELP_BATCH,
        Stage::Delete => HELP_DELETE,
    }
}
