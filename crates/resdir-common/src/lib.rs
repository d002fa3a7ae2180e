//! Shared low-level helpers for the resdir crates.
//!
//! - [`BinaryReader`] - bounds-checked little-endian reads over image bytes
//! - [`utf16`] - resource name strings as single-byte text

mod error;
mod reader;

pub mod utf16;

pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Byte pattern search, used to locate signatures in resource payloads.
pub use memchr;
