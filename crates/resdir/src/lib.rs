//! Resource directory interpreter for PE images.
//!
//! Given the resource tree of an image, this crate provides the derived
//! operations of the `resdir` tool:
//!
//! - [`display`] - node dump and path-qualified list view
//! - [`extract`] - bounds-checked extraction of payloads to disk
//! - [`version`] - decoding of the fixed file info in version resources
//! - [`stats`] - per-kind node counts
//!
//! All of them are pre-order walks driven by [`walk`]. Problems with single
//! nodes are logged and skipped; only failures of the [`Output`] sink end an
//! operation early.
//!
//! # Example
//!
//! ```no_run
//! use resdir::prelude::*;
//!
//! let image = PeImage::open("putty.exe")?;
//! let tree = ResourceTree::parse(&image)?;
//! let resources = Resources::new(&image, &tree);
//!
//! let mut out = TextOutput::new(std::io::stdout());
//! let config = RunConfig {
//!     statistics: true,
//!     version: true,
//!     ..Default::default()
//! };
//! resdir::run(resources, &config, &mut out)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;

pub mod display;
pub mod extract;
pub mod output;
pub mod path;
pub mod stats;
pub mod types;
pub mod version;
pub mod walk;

#[cfg(test)]
mod testing;

use resdir_pe::{DataEntry, ImageView, NodeId, ResourceTree};

pub use resdir_pe as pe;

pub use config::{run, RunConfig};
pub use error::{Error, NodeError, Result};
pub use output::{Output, OutputFormat};

/// The resource tree together with the image it was read from.
#[derive(Clone, Copy)]
pub struct Resources<'a> {
    image: &'a dyn ImageView,
    tree: &'a ResourceTree,
}

impl<'a> Resources<'a> {
    /// Pair a tree with the image it was parsed from.
    pub fn new(image: &'a dyn ImageView, tree: &'a ResourceTree) -> Self {
        Self { image, tree }
    }

    /// Get the image.
    #[inline]
    pub fn image(&self) -> &'a dyn ImageView {
        self.image
    }

    /// Get the resource tree.
    #[inline]
    pub fn tree(&self) -> &'a ResourceTree {
        self.tree
    }

    /// The root directory node, if the tree has one.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.tree.root()
    }

    /// Locate the payload of a data entry.
    ///
    /// Returns the file offset and the bytes, after checking the whole range
    /// against the mapped file.
    pub fn payload(&self, entry: &DataEntry) -> std::result::Result<(usize, &'a [u8]), NodeError> {
        let rva = entry.offset_to_data;
        let offset = self
            .image
            .rva_to_offset(rva)
            .ok_or(NodeError::UnmappedRva { rva })?;
        let len = entry.size as usize;

        self.image
            .read(offset, len)
            .map(|bytes| (offset, bytes))
            .ok_or(NodeError::Bounds {
                offset,
                len,
                available: self.image.bytes().len(),
            })
    }
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::extract::{ExtractMode, ExtractOptions, Extractor};
    pub use crate::output::{create_output, Output, OutputFormat, TextOutput};
    pub use crate::stats::ResourceStats;
    pub use crate::{run, Resources, RunConfig};
    pub use resdir_pe::{ImageView, NodeKind, PeImage, ResourceTree};
}
