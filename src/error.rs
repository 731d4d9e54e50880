//! Error types for cms-sync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=store, 3=remote, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Only run-level failures surface as an [`Error`]. Item-level and
//! step-level failures are recorded in the run summary instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::remote::ApiError;
use crate::sync::SyncError;

/// Result type alias for cms-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Local store (exit 2)
    StoreNotFound,
    StoreInitFailed,

    // Remote (exit 3)
    RemoteError,

    // Validation (exit 4)
    InvalidArgument,
    InvalidKind,
    InvalidInstance,

    // Run outcome (exit 5)
    RunIncomplete,
    Cancelled,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::StoreNotFound => "STORE_NOT_FOUND",
            Self::StoreInitFailed => "STORE_INIT_FAILED",
            Self::RemoteError => "REMOTE_ERROR",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidKind => "INVALID_KIND",
            Self::InvalidInstance => "INVALID_INSTANCE",
            Self::RunIncomplete => "RUN_INCOMPLETE",
            Self::Cancelled => "CANCELLED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::StoreNotFound | Self::StoreInitFailed => 2,
            Self::RemoteError => 3,
            Self::InvalidArgument | Self::InvalidKind | Self::InvalidInstance => 4,
            Self::RunIncomplete | Self::Cancelled => 5,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether re-running the same command may succeed.
    ///
    /// True for remote failures (transient network, rate limits) and runs
    /// that finished with failed steps.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteError | Self::RunIncomplete | Self::Cancelled)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that abort a whole cms-sync command.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Local store not found at {path}")]
    StoreNotFound { path: PathBuf },

    #[error("Could not prepare local store at {path}: {source}")]
    StoreInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown entity kind: {0}")]
    InvalidKind(String),

    #[error("Invalid instance id '{0}' (expected a GUID)")]
    InvalidInstance(String),

    #[error("Remote API error: {0}")]
    Remote(#[from] ApiError),

    #[error("Run finished with status {status}")]
    RunIncomplete { status: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<SyncError> for Error {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Io(e) => Self::Io(e),
            SyncError::Json(e) => Self::Json(e),
            SyncError::Api(e) => Self::Remote(e),
            SyncError::Cancelled => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::StoreNotFound { .. } => ErrorCode::StoreNotFound,
            Self::StoreInit { .. } => ErrorCode::StoreInitFailed,
            Self::InvalidKind(_) => ErrorCode::InvalidKind,
            Self::InvalidInstance(_) => ErrorCode::InvalidInstance,
            Self::Remote(_) => ErrorCode::RemoteError,
            Self::RunIncomplete { .. } => ErrorCode::RunIncomplete,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::StoreNotFound { path } => Some(format!(
                "Nothing has been pulled into {}. Run `cms-sync pull` for the source instance first.",
                path.display()
            )),
            Self::StoreInit { path, .. } => Some(format!(
                "Check that {} is writable or pass a different `--root`.",
                path.display()
            )),
            Self::InvalidKind(_) => Some(
                "Valid kinds: galleries, assets, models, containers, content, templates, pages"
                    .to_string(),
            ),
            Self::InvalidInstance(_) => {
                Some("Instance ids look like 3f2b8c9e-1d4a-4e6b-9c1f-7a2d5e8b0c3a".to_string())
            }
            Self::Config(msg) if msg.contains("token") => Some(
                "Set CMS_SYNC_TOKEN or add \"api_token\" to ~/.cms-sync/config.json".to_string(),
            ),
            Self::RunIncomplete { .. } => Some(
                "Inspect the run log under <store>/logs/ for item-level errors.".to_string(),
            ),
            Self::Remote(e) if e.status == Some(401) || e.status == Some(403) => {
                Some("The API token was rejected. Refresh it and retry.".to_string())
            }
            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
