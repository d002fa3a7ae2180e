//! Error types for the resource interpreter.

use std::io;
use std::path::PathBuf;

use resdir_pe::NodeKind;
use thiserror::Error;

/// Errors that abort a whole operation.
///
/// Only failures of the output sink end an operation early; problems with
/// individual nodes are reported as [`NodeError`] and skipped.
#[derive(Debug, Error)]
pub enum Error {
    /// The output sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for interpreter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A failure confined to a single node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A node of an unexpected kind or level.
    #[error("expected {expected}, found {found} at level {level}")]
    Structural {
        expected: &'static str,
        found: NodeKind,
        level: u8,
    },

    /// A read range falls outside the mapped file.
    #[error("range {offset:#x}..+{len:#x} is outside the image ({available} bytes)")]
    Bounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    /// An RVA that no section maps.
    #[error("RVA {rva:#x} is not mapped by any section")]
    UnmappedRva { rva: u32 },

    /// A required directory entry ancestor is missing.
    #[error("no directory entry ancestor at level {level}")]
    MissingAncestor { level: u8 },

    /// A version resource without a fixed file info record.
    #[error("version resource at {offset:#x} has no fixed file info")]
    MissingFixedFileInfo { offset: usize },

    /// Directory creation or file write failure.
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}
