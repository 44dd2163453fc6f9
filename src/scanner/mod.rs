//! Port scanning engine.
//!
//! Provides platform-specific strategies for mapping open TCP ports to the
//! processes that own them, behind one shared contract. Linux reads the
//! kernel socket table under `/proc`; Windows shells out to `netstat` and
//! `tasklist`. Each scan is stateless: nothing is cached between calls.

pub mod linux;
// Compiled under test on every host so the netstat/tasklist parsers stay
// fixture-testable without a Windows machine.
#[cfg(any(target_os = "windows", test))]
pub mod windows;

use serde::Serialize;

use crate::error::ScanError;

/// Process name reported when the owner of a port cannot be resolved.
pub const UNKNOWN_PROCESS: &str = "unknown";

/// One open TCP port and the name of the process owning it.
///
/// Duplicate ports may appear on Linux when several sockets (distinct
/// inodes) share a local port; the Windows scanner dedupes by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortRecord {
    /// The local port number.
    pub port: u16,
    /// Owning process name, or `"unknown"` if unresolved.
    pub process: String,
}

/// A platform-specific way of producing port records.
///
/// Row-level failures (malformed lines, unresolvable owners) are absorbed by
/// the strategy; only scan-level failures (unreadable source, unrunnable
/// tool) surface as errors.
pub trait ScanStrategy {
    fn scan(&self) -> Result<Vec<PortRecord>, ScanError>;
}

/// Facade over the active strategy.
pub struct PortScanner {
    strategy: Box<dyn ScanStrategy + Send + Sync>,
}

impl PortScanner {
    /// Builds a scanner for the host platform.
    ///
    /// Exactly two platforms are supported; anything else fails fast with
    /// [`ScanError::UnsupportedPlatform`].
    pub fn for_host() -> Result<Self, ScanError> {
        #[cfg(target_os = "linux")]
        {
            Ok(Self::with_strategy(linux::LinuxStrategy::new()))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(Self::with_strategy(windows::WindowsStrategy::new()))
        }

        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        {
            Err(ScanError::UnsupportedPlatform)
        }
    }

    /// Builds a scanner around an explicit strategy (used by tests to inject
    /// fixture-backed strategies).
    pub fn with_strategy<S: ScanStrategy + Send + Sync + 'static>(strategy: S) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    /// Runs one full scan, returning an unordered snapshot of port records.
    pub fn scan(&self) -> Result<Vec<PortRecord>, ScanError> {
        self.strategy.scan()
    }
}
