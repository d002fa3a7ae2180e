//! Errors raised while reading image bytes.

use thiserror::Error;

/// Failure of a bounds-checked read.
#[derive(Debug, Error)]
pub enum Error {
    /// A read ran past the end of the slice.
    #[error("read of {needed} bytes with only {available} left")]
    UnexpectedEof { needed: usize, available: usize },

    /// A signature did not match.
    #[error("bad signature: expected {expected:02x?}, found {actual:02x?}")]
    InvalidMagic {
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    /// A position computed from untrusted data does not fit in the address space.
    #[error("offset overflow: {base:#x} + {delta:#x}")]
    OffsetOverflow { base: usize, delta: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
