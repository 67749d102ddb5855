pub(crate) const STATUS_READY: &str = "Fill in the server details and press Enter on Start";
pub(crate) const STATUS_INTERRUPTED: &str = "Interrupted, cleaning up";

pub(crate) const LOG_TIMESTAMP_FORMAT: &str = "%m-%d %H:%M:%S";
pub(crate) const LOG_SEPARATOR: &str = " | ";
pub(crate) const LOG_RETENTION_DAYS: u64 = 7;
pub(crate) const LOG_MAX_IN_MEMORY: usize = 100;

pub(crate) const OUTPUT_MAX_BYTES: usize = 64 * 1024;
pub(crate) const ARCHIVE_SUFFIX: &str = "-backup";

pub(crate) const NOTHING_TO_UPLOAD: &str = "nothing to upload";
pub(crate) const PROGRESS_LOG_STEP_BYTES: u64 = 1024 * 1024;
