//! Error types for the PE crate.

use thiserror::Error;

/// Errors that can occur when loading a PE image or its resource tree.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] resdir_common::Error),

    /// The file does not start with a DOS header.
    #[error("not a PE image: missing MZ signature")]
    MissingDosSignature,

    /// The NT header signature was not `PE\0\0`.
    #[error("invalid PE signature at {offset:#x}")]
    InvalidPeSignature { offset: usize },

    /// Optional header magic is neither PE32 nor PE32+.
    #[error("unsupported optional header magic: {0:#06x}")]
    UnsupportedOptionalHeader(u16),

    /// The image has no resource directory.
    #[error("image has no resource directory")]
    NoResources,

    /// The root resource directory could not be read.
    #[error("resource directory at {offset:#x} is outside the image ({len} bytes)")]
    ResourceDirectoryOutOfBounds { offset: usize, len: usize },
}

/// Result type for PE operations.
pub type Result<T> = std::result::Result<T, Error>;
