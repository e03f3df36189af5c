//! Logging facilities.
//!
//! The macros prefix every record with the simulation time and the component name, and use the component name as
//! the log target, so the usual `RUST_LOG=<component>=debug` filtering applies.

use colored::Colorize;

use crate::event::Event;

/// Logs a message at the trace level. The first argument must provide `time()` and `name()`.
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $msg:expr) => (
        log::trace!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::cyan("TRACE"),
            $ctx.name(),
            $msg
        )
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        log::trace!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::cyan("TRACE"),
            $ctx.name(),
            format!($format, $($arg)+)
        )
    );
}

/// Logs a message at the debug level. The first argument must provide `time()` and `name()`.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $msg:expr) => (
        log::debug!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::blue("DEBUG"),
            $ctx.name(),
            $msg
        )
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        log::debug!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::blue("DEBUG"),
            $ctx.name(),
            format!($format, $($arg)+)
        )
    );
}

/// Logs a message at the info level. The first argument must provide `time()` and `name()`.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $msg:expr) => (
        log::info!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::green("INFO "),
            $ctx.name(),
            $msg
        )
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        log::info!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::green("INFO "),
            $ctx.name(),
            format!($format, $($arg)+)
        )
    );
}

/// Logs a message at the warn level. The first argument must provide `time()` and `name()`.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $msg:expr) => (
        log::warn!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::yellow("WARN "),
            $ctx.name(),
            $msg
        )
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        log::warn!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::yellow("WARN "),
            $ctx.name(),
            format!($format, $($arg)+)
        )
    );
}

/// Logs a message at the error level. The first argument must provide `time()` and `name()`.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $msg:expr) => (
        log::error!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::red("ERROR"),
            $ctx.name(),
            $msg
        )
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        log::error!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::colored::Colorize::red("ERROR"),
            $ctx.name(),
            format!($format, $($arg)+)
        )
    );
}

/// Logs an event which was not matched by any arm of [`cast!`](crate::cast).
pub fn log_unhandled_event(event: Event) {
    log::error!(
        target: "simulation",
        "[{:.3} {} simulation] Unhandled event: {:?}",
        event.time,
        "ERROR".red(),
        event
    );
}

/// Logs an event whose destination has no registered handler.
pub fn log_undelivered_event(event: Event) {
    log::error!(
        target: "simulation",
        "[{:.3} {} simulation] Undelivered event: {:?}",
        event.time,
        "ERROR".red(),
        event
    );
}

/// Logs an event that was emitted with invalid parameters.
pub fn log_incorrect_event(event: Event, msg: &str) {
    log::error!(
        target: "simulation",
        "[{:.3} {} simulation] Incorrect event ({}): {:?}",
        event.time,
        "ERROR".red(),
        msg,
        event
    );
}
