//! Logging facilities.
//!
//! Messages produced from processes are prefixed with the simulation time, the level and the process name:
//! `[2.000 INFO  node-meter] ...`.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::{debug, error};
use serde_json::json;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_with_context {
    ($level:ident, $tag:expr, $color:ident, $ctx:expr, $($arg:tt)+) => (
        log::$level!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::log::get_colored($tag, $crate::colored::Color::$color),
            $ctx.name(),
            format_args!($($arg)+)
        )
    );
}

/// Logs a message at the info level.
///
/// The first argument is anything providing `name()` and `time()`, usually a
/// [`SimulationContext`](crate::SimulationContext).
///
/// # Examples
///
/// ```rust
/// use std::io::Write;
/// use env_logger::Builder;
/// use fogsim_core::{log_info, Process, ProcessError, SimulationContext, Yield};
///
/// struct Announcer;
///
/// impl Process for Announcer {
///     fn resume(&mut self, ctx: &mut SimulationContext) -> Result<Yield, ProcessError> {
///         log_info!(ctx, "started");
///         Ok(Yield::Finish)
///     }
/// }
///
/// Builder::from_default_env()
///     .format(|buf, record| writeln!(buf, "{}", record.args()))
///     .init();
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_context!(info, "INFO ", Green, $ctx, $($arg)+));
}

/// Logs a message at the debug level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_context!(debug, "DEBUG", Blue, $ctx, $($arg)+));
}

/// Logs a message at the trace level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_context!(trace, "TRACE", Cyan, $ctx, $($arg)+));
}

/// Logs a message at the warn level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_context!(warn, "WARN ", Yellow, $ctx, $($arg)+));
}

/// Logs a message at the error level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_context!(error, "ERROR", Red, $ctx, $($arg)+));
}

pub(crate) fn log_scheduler_debug(time: f64, msg: &str, details: serde_json::Value) {
    debug!(
        target: "simulation",
        "[{:.3} {} simulation] {}: {}",
        time,
        get_colored("DEBUG", Color::Blue),
        msg,
        details
    );
}

pub(crate) fn log_process_failure(time: f64, process: &str, id: u32, err: &dyn std::error::Error) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] Process failed, aborting run: {}",
        time,
        get_colored("ERROR", Color::Red),
        json!({"process": process, "id": id, "error": err.to_string()})
    );
}
