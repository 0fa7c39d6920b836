//! Application error types and user-facing error formatting.
//!
//! The taxonomy mirrors what the query layer reports to callers:
//! - [`ScoutError::InvalidQuery`] — malformed regex or parameters, the
//!   operation is aborted
//! - [`ScoutError::NoActiveProject`] — a query arrived before
//!   `explore_project` succeeded
//! - [`ScoutError::FileUnreadable`] — a single file could not be decoded
//!   or read; multi-file operations degrade this to a per-file warning
//!   instead of surfacing it as an error
//! - [`ScoutError::PathOutsideProject`] — the requested path escapes the
//!   established project root, the operation is refused
//!
//! [`ScoutError`] carries contextual hints and exit codes so that `main()`
//! can present human-readable diagnostics on stderr without ever exposing
//! raw panics or debug formatting.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Process exit codes.
///
/// * `0` - success
/// * `1` - general runtime error
/// * `2` - usage / argument error (bad CLI invocation, bad query)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

// ---------------------------------------------------------------------------
// Unified application error
// ---------------------------------------------------------------------------

/// Unified error type for the engine and both front ends (CLI, MCP).
#[derive(Error, Debug)]
pub enum ScoutError {
    /// A malformed regular expression or invalid query parameter.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A query was issued before a project was explored.
    #[error("no active project; run explore first")]
    NoActiveProject,

    /// A single file could not be read or decoded as text.
    #[error("unreadable file {path}: {reason}")]
    FileUnreadable { path: String, reason: String },

    /// The requested path escapes the established project root.
    #[error("path is outside the project: {0}")]
    PathOutsideProject(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A usage / argument error (exit code 2).
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScoutError {
    /// Return the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScoutError::Usage(_) | ScoutError::InvalidQuery(_) => EXIT_USAGE,
            _ => EXIT_ERROR,
        }
    }

    /// Return an optional human-readable hint that may help the user fix
    /// the problem.  Returns `None` when no specific guidance applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ScoutError::InvalidQuery(_) => Some("check your search pattern for syntax errors"),
            ScoutError::NoActiveProject => {
                Some("run `scout explore <path>` (or the explore_project tool) first")
            }
            ScoutError::PathOutsideProject(_) => {
                Some("paths must be relative to the explored project root")
            }
            ScoutError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Some("verify the file or directory exists")
            }
            ScoutError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Some("check file permissions")
            }
            _ => None,
        }
    }

    /// The taxonomy name used by the structured (MCP) boundary.
    pub fn code(&self) -> &'static str {
        match self {
            ScoutError::InvalidQuery(_) => "InvalidQuery",
            ScoutError::NoActiveProject => "NoActiveProject",
            ScoutError::FileUnreadable { .. } => "FileUnreadable",
            ScoutError::PathOutsideProject(_) => "PathOutsideProject",
            ScoutError::Io(_) => "Io",
            ScoutError::Usage(_) => "Usage",
            ScoutError::Other(_) => "Internal",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
