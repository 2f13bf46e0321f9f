// Error types for the installer engine.
//
// Per-target failures (`InstallError`) are caught at the orchestrator's per-target
// boundary and recorded in that target's outcome. Run-level failures (`RunError`)
// stop the run before any target is processed.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while resolving, downloading or running one target.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Network or HTTP failure: DNS, TLS, timeout, non-2xx status, unreadable body.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The server answered, but with something no retry can fix: a malformed release
    /// document, or a URL that is not absolute.
    #[error("unusable source {url}: {reason}")]
    UnusableSource { url: String, reason: String },

    /// The listing page was retrieved but no hyperlink matched the pattern.
    #[error("no link on {page} matches pattern '{pattern}'")]
    NoInstallerFound { page: String, pattern: String },

    #[error("invalid link pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The installer process could not be started, or had to be killed on timeout.
    #[error("failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("installer exited with code {code}")]
    NonZeroExit { code: i32 },

    #[error("installer was terminated without an exit code")]
    Terminated,

    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    /// Short taxonomy name used as a prefix in outcomes and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            InstallError::Fetch { .. } => "FetchError",
            InstallError::UnusableSource { .. } => "UnusableSource",
            InstallError::NoInstallerFound { .. } => "NoInstallerFound",
            InstallError::InvalidPattern { .. } => "InvalidPattern",
            InstallError::Launch { .. } => "LaunchError",
            InstallError::NonZeroExit { .. } | InstallError::Terminated => "NonZeroExit",
            InstallError::ChecksumMismatch { .. } => "ChecksumMismatch",
            InstallError::Cancelled => "Cancelled",
            InstallError::Io { .. } => "IoError",
        }
    }

    /// Only network failures are worth another attempt. A document that arrived but
    /// could not be used will not improve on a second fetch.
    pub fn is_transient(&self) -> bool {
        matches!(self, InstallError::Fetch { .. })
    }
}

/// A post-install configuration step failed. Logged as `PostConfigWarning`; it never
/// turns a successful install into a failure.
#[derive(Debug, Error)]
pub enum PostConfigError {
    #[error("unknown placeholder '{{{placeholder}}}' in value for '{key}'")]
    UnknownPlaceholder { key: String, placeholder: String },

    #[error("failed to update {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Failed(String),
}

/// Failures that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to load configuration {}: {reason}", path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid target selection: {0}")]
    InvalidSelection(String),

    #[error("failed to create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),
}
