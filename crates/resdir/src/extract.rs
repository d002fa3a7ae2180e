//! Payload extraction.
//!
//! Every data entry at the language level is written to
//! `<root>/<type dir>/<file name><extension>`. The type directory and the
//! extension come from the well-known type table; unknown types are written
//! directly under the root with a `.bin` extension.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use resdir_pe::{NodeId, NodeKind};
use tracing::{debug, info, warn};

use crate::output::Output;
use crate::path::{build_path, entry_at_level};
use crate::types::{self, ResourceType};
use crate::walk::preorder;
use crate::{NodeError, Resources};

/// Default extraction root, relative to the working directory.
pub const DEFAULT_ROOT: &str = "resources";

/// Level of the data entries that are extracted.
pub const LANGUAGE_LEVEL: u8 = 3;

/// How output file names are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// The identifier of the level-2 entry, e.g. `icons/1.ico`.
    #[default]
    Numeric,
    /// The synthesized path, e.g. `icons/ICON 0001 0409.ico`.
    Named,
}

/// Where and how to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub root: PathBuf,
    pub mode: ExtractMode,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            mode: ExtractMode::default(),
        }
    }
}

/// Outcome of an extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Writes resource payloads to disk.
pub struct Extractor<'a> {
    resources: Resources<'a>,
    options: &'a ExtractOptions,
}

impl<'a> Extractor<'a> {
    pub fn new(resources: Resources<'a>, options: &'a ExtractOptions) -> Self {
        Self { resources, options }
    }

    /// Extract every language-level data entry.
    ///
    /// Each written file is reported as `Save On`. Failed entries are logged
    /// and skipped; only errors from `out` are returned.
    pub fn extract_all(&self, out: &mut dyn Output) -> io::Result<ExtractSummary> {
        let tree = self.resources.tree();
        let mut summary = ExtractSummary::default();

        let leaves = preorder(tree, tree.root()).filter(|(_, node)| {
            node.kind() == NodeKind::DataEntry && node.dir_level() == LANGUAGE_LEVEL
        });

        for (id, node) in leaves {
            match self.extract_one(id) {
                Ok(path) => {
                    out.emit("Save On", &path.display().to_string())?;
                    summary.written += 1;
                }
                Err(e) => {
                    warn!(
                        "skipping resource {} at {:#x}: {e}",
                        id.index(),
                        node.file_offset()
                    );
                    summary.skipped += 1;
                }
            }
        }

        info!(
            written = summary.written,
            skipped = summary.skipped,
            "extraction finished"
        );
        Ok(summary)
    }

    /// Extract a single data entry and return the path written.
    ///
    /// An existing file at that path is overwritten.
    pub fn extract_one(&self, node: NodeId) -> Result<PathBuf, NodeError> {
        let tree = self.resources.tree();
        let leaf = tree.node(node);
        let entry = match leaf.as_data_entry() {
            Some(entry) if leaf.dir_level() == LANGUAGE_LEVEL => entry,
            _ => {
                return Err(NodeError::Structural {
                    expected: "data entry at the language level",
                    found: leaf.kind(),
                    level: leaf.dir_level(),
                })
            }
        };

        let (offset, bytes) = self.resources.payload(entry)?;
        let path = self.destination(node)?;

        if let Some(dir) = path.parent() {
            create_dir(dir)?;
        }
        fs::write(&path, bytes).map_err(|source| NodeError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(
            offset,
            size = bytes.len(),
            "wrote {}",
            path.display()
        );
        Ok(path)
    }

    /// The path a data entry is extracted to.
    pub fn destination(&self, node: NodeId) -> Result<PathBuf, NodeError> {
        let tree = self.resources.tree();

        let type_entry = entry_at_level(tree, node, 1)
            .and_then(|id| tree.node(id).as_directory_entry())
            .ok_or(NodeError::MissingAncestor { level: 1 })?;
        let resource_type = type_entry.name.id().and_then(types::lookup);

        let name_entry = entry_at_level(tree, node, 2)
            .and_then(|id| tree.node(id).as_directory_entry())
            .ok_or(NodeError::MissingAncestor { level: 2 })?;
        let numeric = name_entry.name.raw_value().to_string();

        let stem = match self.options.mode {
            ExtractMode::Numeric => numeric,
            ExtractMode::Named => {
                let named = build_path(self.resources, node);
                if named.is_empty() {
                    numeric
                } else {
                    named
                }
            }
        };

        let file_name = format!("{stem}{}", types::extension_for(resource_type));
        Ok(type_dir(&self.options.root, resource_type).join(file_name))
    }
}

fn type_dir(root: &Path, resource_type: Option<&ResourceType>) -> PathBuf {
    match resource_type {
        Some(known) => root.join(known.dir_name),
        None => root.to_path_buf(),
    }
}

fn create_dir(dir: &Path) -> Result<(), NodeError> {
    fs::create_dir_all(dir).map_err(|source| NodeError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
