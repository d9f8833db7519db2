// Error taxonomy for activity file decoding, conversion and rendering.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("File too small: expected at least {expected} bytes, got {actual}")]
    FileTooSmall { expected: usize, actual: usize },

    #[error("Invalid magic number: expected {expected:#06x}, got {got:#06x}")]
    BadMagic { expected: u16, got: u16 },

    #[error("Unknown file format version: {0:#06x}")]
    UnknownVersion(u16),

    #[error("Bad file header: {0}")]
    BadHeader(String),

    #[error("Truncated record at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Bad record type {record_type} at offset {offset}")]
    BadRecord { offset: usize, record_type: u8 },

    #[error("Unsupported activity: {0}")]
    UnsupportedActivity(u16),

    #[error("Unknown activity name: {0}")]
    UnknownActivityName(String),

    #[error("Conversion target conflict at {path:?}: {reason}")]
    ConversionTargetConflict { path: PathBuf, reason: String },

    #[error("Activity {name} ({id}) cannot be translated to the current format; request skip-volatile to drop it")]
    ConversionLossy { id: u16, name: &'static str },
}

pub type Result<T> = std::result::Result<T, FormatError>;

impl FormatError {
    pub fn bad_header(details: impl std::fmt::Display) -> Self {
        Self::BadHeader(details.to_string())
    }

    /// Whether tolerant mode may downgrade this error to a warning.
    pub fn is_tolerable(&self) -> bool {
        matches!(
            self,
            FormatError::UnknownVersion(_)
                | FormatError::BadHeader(_)
                | FormatError::Truncated { .. }
                | FormatError::BadRecord { .. }
        )
    }
}
