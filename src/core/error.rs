use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the entire launcher core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Manifest ────────────────────────────────────────
    #[error("Version not found in catalogue: {0}")]
    VersionNotFound(String),

    #[error("Manifest error for {context}: {reason}")]
    Manifest { context: String, reason: String },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Java ────────────────────────────────────────────
    #[error("Java not found for major version {0}")]
    JavaMissing(u32),

    #[error("Java install failed: {0}")]
    JavaInstall(String),

    // ── Process ─────────────────────────────────────────
    #[error("Failed to spawn game process: {0}")]
    Spawn(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    pub fn manifest(context: impl Into<String>, reason: impl Into<String>) -> Self {
        LauncherError::Manifest {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LauncherError::Io { .. } => "io",
            LauncherError::Http(_) | LauncherError::DownloadFailed { .. } => "network",
            LauncherError::Sha1Mismatch { .. } => "integrity",
            LauncherError::VersionNotFound(_) | LauncherError::Manifest { .. } => "manifest",
            LauncherError::Json(_) => "parsing",
            LauncherError::JavaMissing(_) => "java_missing",
            LauncherError::JavaInstall(_) => "java_install",
            LauncherError::Spawn(_) => "spawn",
            LauncherError::Zip(_) => "archive",
            LauncherError::Other(_) => "generic",
        }
    }

    /// Recoverable errors are retried through mirror failover or surfaced
    /// per-task; the rest abort the current operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LauncherError::Http(_)
                | LauncherError::DownloadFailed { .. }
                | LauncherError::Sha1Mismatch { .. }
                | LauncherError::JavaMissing(_)
        )
    }
}
