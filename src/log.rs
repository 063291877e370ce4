//! Logging for evalloc.
//!
//! Messages always go to the terminal. A scenario run additionally keeps a log in its output
//! folder, so the per-use-case progress and summaries stay next to the results they describe.
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::{Level, LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::OnceLock;

/// The level used when neither the settings file nor the environment give one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable which takes precedence over the log level in the settings file
pub const LOG_LEVEL_ENV_VAR: &str = "EVALLOC_LOG_LEVEL";

/// Log kept in the output folder of a run
pub const RUN_LOG_FILE_NAME: &str = "evalloc.log";

/// The terminal level, once the logger is set up
static ACTIVE_LEVEL: OnceLock<LevelFilter> = OnceLock::new();

/// Where messages are written besides the terminal
#[derive(Debug, Clone, Copy)]
pub enum LogSink<'a> {
    /// The terminal only, as for `validate`
    Terminal,
    /// The terminal and [`RUN_LOG_FILE_NAME`] in the given output folder
    RunFolder(&'a Path),
}

/// Whether [`init`] has been called successfully
pub fn is_logger_initialised() -> bool {
    ACTIVE_LEVEL.get().is_some()
}

/// Work out the terminal log level, preferring [`LOG_LEVEL_ENV_VAR`] over `settings_level`
pub fn resolve_level(settings_level: &str) -> Result<LevelFilter> {
    match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => parse_log_level(&level)
            .with_context(|| format!("Invalid value for {LOG_LEVEL_ENV_VAR}")),
        Err(_) => parse_log_level(settings_level),
    }
}

/// Set up the global logger.
///
/// Warnings and errors go to stderr and everything else to stdout, coloured when attached to a
/// terminal. For [`LogSink::RunFolder`] the run log is truncated and always records at least
/// `info` messages, whatever the terminal level.
pub fn init(settings_level: &str, sink: LogSink) -> Result<()> {
    let level = resolve_level(settings_level)?;
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let stdout_colour = io::stdout().is_terminal().then_some(colours);
    let stderr_colour = io::stderr().is_terminal().then_some(colours);

    let mut dispatch = Dispatch::new()
        .chain(
            Dispatch::new()
                .level(level)
                .filter(|metadata| metadata.level() > Level::Warn)
                .format(move |out, message, record| {
                    out.finish(format_args!("{}", terminal_line(record, message, stdout_colour)));
                })
                .chain(io::stdout()),
        )
        .chain(
            Dispatch::new()
                .level(level.min(LevelFilter::Warn))
                .format(move |out, message, record| {
                    out.finish(format_args!("{}", terminal_line(record, message, stderr_colour)));
                })
                .chain(io::stderr()),
        );

    if let LogSink::RunFolder(output_path) = sink {
        let file_path = output_path.join(RUN_LOG_FILE_NAME);
        let file = File::create(&file_path)
            .with_context(|| format!("Could not create log file {}", file_path.display()))?;
        dispatch = dispatch.chain(
            Dispatch::new()
                .level(level.max(LevelFilter::Info))
                .format(|out, message, record| {
                    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
                    out.finish(format_args!(
                        "{}",
                        format_line(timestamp, record.level(), Some(record.target()), message)
                    ));
                })
                .chain(file),
        );
    }

    dispatch.apply().context("Logger already initialised")?;

    // apply() succeeds only once per process, so the cell is empty here
    ACTIVE_LEVEL.set(level).ok();

    Ok(())
}

/// Convert a level name, in any case, to a [`LevelFilter`]
pub(crate) fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    let level = match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// A terminal line. The module is only shown below `info`, where it helps with tracing.
fn terminal_line(
    record: &Record,
    message: &Arguments,
    colours: Option<ColoredLevelConfig>,
) -> String {
    let timestamp = Local::now().format("%H:%M:%S");
    let target = (record.level() > Level::Info).then(|| record.target());
    match colours {
        Some(colours) => format_line(timestamp, colours.color(record.level()), target, message),
        None => format_line(timestamp, record.level(), target, message),
    }
}

/// Format a line as `[timestamp level module] message`, dropping the crate prefix from the module
fn format_line(
    timestamp: impl Display,
    level: impl Display,
    target: Option<&str>,
    message: &Arguments,
) -> String {
    match target {
        Some(target) => {
            let module = target.strip_prefix("evalloc::").unwrap_or(target);
            format!("[{timestamp} {level} {module}] {message}")
        }
        None => format!("[{timestamp} {level}] {message}"),
    }
}
