mod console;

pub use console::{ConsoleConfig, DEFAULT_USAGE_HISTORY_DAYS};
