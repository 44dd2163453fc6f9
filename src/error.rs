//! Error types for portscope.
//!
//! Failures split into two tiers: scan-level errors abort a whole scan and
//! surface to the caller, while row-level problems (malformed table lines,
//! unresolvable process owners) are absorbed inside the scanners and never
//! become errors at all.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for portscope operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Scan-level fatal errors. Any of these aborts the scan with no partial
/// result.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Socket table at {path} is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run {tool}: {reason}")]
    #[allow(dead_code)] // Constructed in scanner::windows, which builds on windows or under test
    ToolFailed { tool: &'static str, reason: String },

    #[error("Platform not supported (expected linux or windows)")]
    #[allow(dead_code)] // Constructed in the #[cfg(not(any(linux, windows)))] branch
    UnsupportedPlatform,
}

/// Errors raised by the HTTP boundary.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {reason}")]
    BindFailed { addr: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
