//! Logger and logging macros
//!
//! For the macros to properly compile, the calling crate must add a dependency to
//! crate log (ie. `log.workspace = true`).

pub use log::{Level, LevelFilter};

use log4rs::{
    append::{
        console::ConsoleAppender,
        rolling_file::{
            policy::compound::{roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
    },
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";

const LOG_LINE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f%z)} [{({l}):5.5}] {m}{n}";
const LOG_FILE_NAME: &str = "householdiq.log";
const LOG_FILE_MAX_SIZE: u64 = 100 * 1024 * 1024;
const LOG_FILE_MAX_ROLLS: u32 = 8;

const DEFAULT_LOGGER_ENV: &str = "HOUSEHOLDIQ_LOG";

fn level_filter(expression: &str) -> LevelFilter {
    std::env::var(DEFAULT_LOGGER_ENV)
        .ok()
        .as_deref()
        .unwrap_or(expression)
        .parse()
        .unwrap_or(LevelFilter::Info)
}

fn console_appender() -> ConsoleAppender {
    ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN))).build()
}

fn file_appender(log_dir: &str) -> RollingFileAppender {
    let file_path = std::path::Path::new(log_dir).join(LOG_FILE_NAME);
    let roll_pattern = format!("{}.{{}}.gz", file_path.display());
    let policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(LOG_FILE_MAX_SIZE)),
        Box::new(FixedWindowRoller::builder().build(&roll_pattern, LOG_FILE_MAX_ROLLS).expect("valid roll pattern")),
    );
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN)))
        .build(file_path, Box::new(policy))
        .expect("the log file is creatable")
}

/// Initializes the global logger with a console appender and, when `log_dir`
/// is provided, a size-rolling file appender.
pub fn init_logger(log_dir: Option<&str>, filters: &str) {
    let level = level_filter(filters);

    let mut config = Config::builder().appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console_appender())));
    let mut root = Root::builder().appender(CONSOLE_APPENDER);
    if let Some(log_dir) = log_dir {
        config = config.appender(Appender::builder().build(LOG_FILE_APPENDER, Box::new(file_appender(log_dir))));
        root = root.appender(LOG_FILE_APPENDER);
    }

    let config = config.build(root.build(level)).unwrap();
    let _ = log4rs::init_config(config).unwrap();
}

/// Tries to init the global logger, but does not panic if it was already setup.
/// Should be used for tests.
pub fn try_init_logger(filters: &str) {
    let config = Config::builder()
        .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console_appender())))
        .build(Root::builder().appender(CONSOLE_APPENDER).build(level_filter(filters)))
        .unwrap();
    let _ = log4rs::init_config(config);
}

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => (log::trace!($($t)*))
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => (log::debug!($($t)*))
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => (log::info!($($t)*))
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => (log::warn!($($t)*))
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => (log::error!($($t)*))
}
