//! Diagnostic helpers.
//!
//! The compiled graph goes to stdout; everything said about it goes through
//! `tracing` to stderr. These helpers keep the wording of messages uniform.

use std::fmt::Display;

/// Format a message that is about to become an error.
pub fn error_message(msg: impl Display) -> String {
    format!("pipeline generation failed: {}", msg)
}

/// Per-unit problem: the offending camera/workload/step is skipped or passed
/// through, compilation continues.
pub fn warn(msg: impl Display) {
    tracing::warn!("{}", msg);
}

/// Informational notice (exclusions, resolved settings).
pub fn info(msg: impl Display) {
    tracing::info!("{}", msg);
}
