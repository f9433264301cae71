//! Diagnostics for the person at the terminal.
//!
//! These print a `warning:` or `error:` prefix to stderr, in color when it is
//! enabled. Developer-level tracing goes through `tracing` instead.

use crate::color::{MaybePaint, DIAGNOSTIC_TEXT, ERROR_INDICATOR, WARNING_INDICATOR};

pub const DEFAULT_EXIT_CODE: i32 = 1;

pub(crate) fn fmt_error(text: &str) -> String {
    format!(
        "{} {}",
        ERROR_INDICATOR.maybe_paint("error:"),
        DIAGNOSTIC_TEXT.maybe_paint(text)
    )
}

pub(crate) fn fmt_warn(text: &str) -> String {
    format!(
        "{} {}",
        WARNING_INDICATOR.maybe_paint("warning:"),
        DIAGNOSTIC_TEXT.maybe_paint(text)
    )
}

pub(crate) fn error_internal(text: &str) {
    eprintln!("{}", fmt_error(text));
}

pub(crate) fn warn_internal(text: &str) {
    eprintln!("{}", fmt_warn(text));
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::warn_internal(&formatted);
    })
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
    })
}

#[macro_export]
macro_rules! die {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
        ::std::process::exit($crate::utils::errors::DEFAULT_EXIT_CODE);
    })
}
