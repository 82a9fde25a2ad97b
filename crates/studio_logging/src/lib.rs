#![deny(missing_docs)]
//! Shared logging utilities for the studio workspace.
//!
//! This crate provides the `studio_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.
//!
//! Every macro accepts an optional `job = <id>;` prefix. Tagged lines are
//! emitted under the [`JOB_TARGET`] target with the job id in front, so a
//! single job can be followed through a log file:
//!
//! ```ignore
//! studio_info!(job = job_id; "status {} (seq {})", label, seq);
//! ```

#[doc(hidden)]
pub use log;

/// Log target used for lines tagged with a job id.
pub const JOB_TARGET: &str = "studio::job";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! studio_trace {
    (job = $job:expr; $($arg:tt)*) => {{
        $crate::log::trace!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! studio_debug {
    (job = $job:expr; $($arg:tt)*) => {{
        $crate::log::debug!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! studio_info {
    (job = $job:expr; $($arg:tt)*) => {{
        $crate::log::info!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! studio_warn {
    (job = $job:expr; $($arg:tt)*) => {{
        $crate::log::warn!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! studio_error {
    (job = $job:expr; $($arg:tt)*) => {{
        $crate::log::error!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may already own the global logger.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    #[test]
    fn macros_accept_plain_and_job_tagged_forms() {
        super::initialize_for_tests();
        let job_id = "abc123";
        studio_debug!("plain {}", 1);
        studio_info!(job = job_id; "tagged {}", 2);
        studio_warn!(job = job_id; "no args");
        studio_error!("error {}", "text");
        studio_trace!(job = 7; "numeric job ids work too");
    }
}
