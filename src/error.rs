//! Unified error type for the discprobe application.
//!
//! All modules funnel their failures into [`Error`], which carries enough
//! context for API handlers to derive an HTTP status code via
//! [`Error::http_status`].

use std::path::PathBuf;
use std::time::Duration;

/// Unified error type covering all failure modes in discprobe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input path does not exist.
    #[error("path not found: {}", path.display())]
    NotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A directory scan finished without finding any video file.
    #[error("no video files found under: {}", dir.display())]
    NoVideo {
        /// The directory that was scanned.
        dir: PathBuf,
    },

    /// A BDMV tree holds no stream files.
    #[error("no m2ts streams found under: {}", root.display())]
    NoStreams {
        /// The BDMV root that was scanned.
        root: PathBuf,
    },

    /// The input exposes no Blu-ray disc layout.
    #[error("no BDMV layout found under: {}", path.display())]
    NoBdmv {
        /// The path (or mount point) that was inspected.
        path: PathBuf,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// An external tool (mediainfo, ffmpeg, mount, etc.) failed.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An external tool was terminated because its deadline expired.
    #[error("Tool timed out [{tool}] after {limit:?}")]
    Timeout {
        /// Name of the tool that was killed.
        tool: String,
        /// The deadline that expired.
        limit: Duration,
    },

    /// Mounting a disc image failed.
    #[error("Mount error [{}]: {message}", image.display())]
    Mount {
        /// The image that could not be mounted.
        image: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A directory walk hit an unreadable entry.
    #[error("Scan error: {source}")]
    Scan {
        /// The underlying walk error.
        #[from]
        source: walkdir::Error,
    },

    /// Packaging capture artifacts into a zip failed.
    #[error("Archive error: {source}")]
    Archive {
        /// The underlying zip error.
        #[from]
        source: zip::result::ZipError,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::NoVideo { .. } => 404,
            Error::NoStreams { .. } => 404,
            Error::NoBdmv { .. } => 404,
            Error::Validation(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Tool { .. } => 502,
            Error::Timeout { .. } => 504,
            Error::Mount { .. } => 502,
            Error::Io { .. } => 500,
            Error::Scan { .. } => 500,
            Error::Archive { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Convenience constructor for [`Error::NoVideo`].
    pub fn no_video(dir: impl Into<PathBuf>) -> Self {
        Error::NoVideo { dir: dir.into() }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Timeout`].
    pub fn timeout(tool: impl Into<String>, limit: Duration) -> Self {
        Error::Timeout {
            tool: tool.into(),
            limit,
        }
    }

    /// Convenience constructor for [`Error::Mount`].
    pub fn mount(image: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Mount {
            image: image.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
