//! Error taxonomy and backend failure normalization.
//!
//! Both codec backends raise their own failure types; nothing from either
//! crosses the [`UnifiedImage`](crate::UnifiedImage) boundary un-normalized.
//! A [`NormalizedError`] preserves the original message verbatim and records
//! which backend produced it; only raster backend failures carry a numeric
//! diagnostic code.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for steg-scrub operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which codec backend produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// The raster backend (raw interleaved pixel buffers, static format list).
    Raster,
    /// The dynamic backend (polymorphic image objects, runtime registry).
    Dynamic,
    /// Neither backend; produced by the core itself.
    Other,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raster => write!(f, "raster backend"),
            Self::Dynamic => write!(f, "dynamic backend"),
            Self::Other => write!(f, "core"),
        }
    }
}

/// Status classification recorded on a [`UnifiedImage`](crate::UnifiedImage).
///
/// Warning-class values are non-fatal: the decoded payload remains usable.
/// Everything from [`ReadFailure`](Self::ReadFailure) down is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No failure recorded during construction or the last operation.
    #[default]
    None,
    /// Non-fatal decode diagnostic about the channel layout.
    WarningChannelType,
    /// Non-fatal decode diagnostic: container did not match the claimed format.
    WarningFormatInvalid,
    /// No backend produced a usable payload from the input bytes.
    ReadFailure,
    /// The raster backend rejected an operation.
    RasterBackend,
    /// The dynamic backend rejected an operation.
    DynamicBackend,
    /// Re-encode refused because the payload was never decoded.
    Unencodable,
    /// Anything the taxonomy does not otherwise cover.
    Other,
}

impl ErrorKind {
    /// True for the non-fatal warning classifications.
    #[must_use]
    pub fn is_warning(self) -> bool {
        matches!(self, Self::WarningChannelType | Self::WarningFormatInvalid)
    }

    /// True for failure classifications (not `None`, not a warning).
    #[must_use]
    pub fn is_failure(self) -> bool {
        !matches!(
            self,
            Self::None | Self::WarningChannelType | Self::WarningFormatInvalid
        )
    }
}

/// A backend failure collapsed into one shared shape.
///
/// The message is the backend's own text, untruncated and unreworded. `code`
/// is populated only by the raster backend; `None` is distinct from zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedError {
    /// Originating backend.
    pub backend: Backend,
    /// Original diagnostic text, verbatim.
    pub message: String,
    /// Raster backend diagnostic code, when one was available.
    pub code: Option<i32>,
}

impl NormalizedError {
    /// Normalize a raster backend failure.
    pub fn raster(message: impl Into<String>, code: Option<i32>) -> Self {
        Self {
            backend: Backend::Raster,
            message: message.into(),
            code,
        }
    }

    /// Normalize a dynamic backend failure. The dynamic backend never
    /// reports numeric codes.
    pub fn dynamic(message: impl Into<String>) -> Self {
        Self {
            backend: Backend::Dynamic,
            message: message.into(),
            code: None,
        }
    }

    /// A diagnostic produced by the core itself rather than a backend.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            backend: Backend::Other,
            message: message.into(),
            code: None,
        }
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}: {} (code {})", self.backend, self.message, code),
            None => write!(f, "{}: {}", self.backend, self.message),
        }
    }
}

/// Errors returned by recompression, batch and report operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A codec backend rejected a decode or encode.
    #[error("{0}")]
    Backend(NormalizedError),

    /// The payload was never decoded by any backend; re-encode refused.
    #[error("payload was never decoded by any backend; re-encode refused")]
    Unencodable,

    /// Neither backend can write the requested target format.
    #[error("unsupported target format: {0}")]
    UnsupportedFormat(String),

    /// Quality outside the accepted 0-100 range.
    #[error("invalid quality value: {0} (expected 0-100)")]
    InvalidQuality(u8),

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// The taxonomy classification this error maps to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Backend(err) => match err.backend {
                Backend::Raster => ErrorKind::RasterBackend,
                Backend::Dynamic => ErrorKind::DynamicBackend,
                Backend::Other => ErrorKind::Other,
            },
            Self::Unencodable => ErrorKind::Unencodable,
            _ => ErrorKind::Other,
        }
    }

    /// The normalized backend failure, when this error carries one.
    #[must_use]
    pub fn normalized(&self) -> Option<&NormalizedError> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}
