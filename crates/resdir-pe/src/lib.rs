//! Minimal PE image access and resource directory tree for resdir.
//!
//! This crate provides the services the resource interpreter consumes:
//!
//! - [`PeImage`] - memory-mapped image with RVA translation and bounds checks
//! - [`ImageView`] - the read interface the interpreter is written against
//! - [`ResourceTree`] - the resource directory tree, built once and read-only
//! - [`writer`] - serialization of resource sections and minimal images
//!
//! Only the header fields needed to locate the resource table are parsed.
//!
//! # Example
//!
//! ```no_run
//! use resdir_pe::{PeImage, ResourceTree};
//!
//! let image = PeImage::open("putty.exe")?;
//! let tree = ResourceTree::parse(&image)?;
//! println!("{} resource nodes", tree.len());
//! # Ok::<(), resdir_pe::Error>(())
//! ```

mod error;
mod image;
mod node;
mod tree;

pub mod format;
pub mod writer;

pub use error::{Error, Result};
pub use image::{ImageView, PeImage, Section};
pub use node::{
    DataEntry, DataString, DirectoryEntry, EntryName, EntryTarget, NodeData, NodeId, NodeKind,
    ResourceDirectory, ResourceNode,
};
pub use tree::{ResourceTree, ROOT_LEVEL};
