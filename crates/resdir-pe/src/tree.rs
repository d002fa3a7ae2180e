//! Resource tree construction.
//!
//! The tree is stored in an arena and linked first-child/next-sibling, with a
//! parent index on every node. It is built once and never mutated afterwards.

use resdir_common::BinaryReader;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::format::{RawDataEntry, RawDirectoryEntry, RawResourceDirectory};
use crate::node::{
    DataEntry, DataString, DirectoryEntry, EntryName, EntryTarget, NodeData, NodeId,
    ResourceDirectory, ResourceNode,
};
use crate::{Error, ImageView, Result};

/// Level of the root directory.
pub const ROOT_LEVEL: u8 = 1;

const DIRECTORY_SIZE: usize = std::mem::size_of::<RawResourceDirectory>();
const ENTRY_SIZE: usize = std::mem::size_of::<RawDirectoryEntry>();

/// A parsed resource directory tree.
#[derive(Debug, Clone, Default)]
pub struct ResourceTree {
    nodes: Vec<ResourceNode>,
}

impl ResourceTree {
    /// Build the tree from the resource section of `image`.
    ///
    /// Only an unreadable root directory is an error. Entries, strings and
    /// nested directories that fall outside the file are logged and left out.
    pub fn parse<V: ImageView + ?Sized>(image: &V) -> Result<Self> {
        let base = image.resource_base().ok_or(Error::NoResources)?;
        let data = image.bytes();

        let root = read_directory(data, base).ok_or(Error::ResourceDirectoryOutOfBounds {
            offset: base,
            len: data.len(),
        })?;

        let mut builder = TreeBuilder::new(data, base);
        let root_id = builder.push(None, NodeData::Directory(root), ROOT_LEVEL, base);
        builder.visited.insert(base);

        let mut pending = vec![root_id];
        while let Some(id) = pending.pop() {
            let node = &builder.nodes[id.index()];
            let (level, offset) = (node.dir_level, node.file_offset);
            let directory = node.as_directory().copied();
            let entry = node.as_directory_entry().copied();

            if let Some(dir) = directory {
                let entries = builder.expand_directory(id, &dir, level, offset);
                pending.extend(entries.into_iter().rev());
            } else if let Some(entry) = entry {
                pending.extend(builder.expand_entry(id, &entry, level));
            }
        }

        debug!(nodes = builder.nodes.len(), "built resource tree");
        Ok(Self {
            nodes: builder.nodes,
        })
    }

    /// An empty tree, with no root.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The root directory node, if any.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeId(0))
        }
    }

    /// Get a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    #[inline]
    pub fn node(&self, id: NodeId) -> &ResourceNode {
        &self.nodes[id.index()]
    }

    /// Get a node by id, or `None` if it does not belong to this tree.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&ResourceNode> {
        self.nodes.get(id.index())
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.child)
    }

    #[inline]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next)
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }
}

fn read_directory(data: &[u8], offset: usize) -> Option<ResourceDirectory> {
    BinaryReader::new_at(data, offset)
        .read_struct::<RawResourceDirectory>()
        .ok()
        .map(ResourceDirectory::from)
}

fn read_data_string(data: &[u8], offset: usize) -> resdir_common::Result<DataString> {
    let mut reader = BinaryReader::new_at(data, offset);
    let length = reader.read_u16()?;
    let units = reader.read_utf16_units(length as usize)?;
    Ok(DataString { length, units })
}

struct TreeBuilder<'a> {
    data: &'a [u8],
    base: usize,
    nodes: Vec<ResourceNode>,
    last_child: Vec<Option<NodeId>>,
    visited: FxHashSet<usize>,
}

impl<'a> TreeBuilder<'a> {
    fn new(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            base,
            nodes: Vec::new(),
            last_child: Vec::new(),
            visited: FxHashSet::default(),
        }
    }

    /// Append a node as the last child of `parent`.
    fn push(&mut self, parent: Option<NodeId>, data: NodeData, level: u8, offset: usize) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ResourceNode {
            data,
            dir_level: level,
            file_offset: offset,
            parent,
            child: None,
            next: None,
        });
        self.last_child.push(None);

        if let Some(parent) = parent {
            match self.last_child[parent.index()] {
                Some(previous) => self.nodes[previous.index()].next = Some(id),
                None => self.nodes[parent.index()].child = Some(id),
            }
            self.last_child[parent.index()] = Some(id);
        }

        id
    }

    fn resolve(&self, relative: u32) -> Option<usize> {
        self.base.checked_add(relative as usize)
    }

    fn expand_directory(
        &mut self,
        id: NodeId,
        dir: &ResourceDirectory,
        level: u8,
        offset: usize,
    ) -> Vec<NodeId> {
        let count = dir.entry_count();
        let mut entries = Vec::with_capacity(count);

        for index in 0..count {
            let entry_offset = offset + DIRECTORY_SIZE + index * ENTRY_SIZE;
            let mut reader = BinaryReader::new_at(self.data, entry_offset);
            let raw = match reader.read_struct::<RawDirectoryEntry>() {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("directory at {offset:#x}: entry {index} of {count} is unreadable: {e}");
                    break;
                }
            };

            let entry = DirectoryEntry::from(raw);
            entries.push(self.push(Some(id), NodeData::DirectoryEntry(entry), level, entry_offset));
        }

        entries
    }

    fn expand_entry(&mut self, id: NodeId, entry: &DirectoryEntry, level: u8) -> Option<NodeId> {
        if let EntryName::String { offset } = entry.name {
            match self.resolve(offset).map(|at| (at, read_data_string(self.data, at))) {
                Some((at, Ok(string))) => {
                    self.push(Some(id), NodeData::DataString(string), level, at);
                }
                Some((at, Err(e))) => warn!("name string at {at:#x} is unreadable: {e}"),
                None => warn!("name string offset {offset:#x} overflows"),
            }
        }

        match entry.target {
            EntryTarget::Directory { offset } => {
                let at = self.resolve(offset)?;
                if !self.visited.insert(at) {
                    warn!("directory at {at:#x} is referenced more than once, not descending");
                    return None;
                }
                match read_directory(self.data, at) {
                    Some(dir) => Some(self.push(
                        Some(id),
                        NodeData::Directory(dir),
                        level.saturating_add(1),
                        at,
                    )),
                    None => {
                        warn!("nested directory at {at:#x} is outside the image");
                        None
                    }
                }
            }
            EntryTarget::Data { offset } => {
                let at = self.resolve(offset)?;
                match BinaryReader::new_at(self.data, at).read_struct::<RawDataEntry>() {
                    Ok(raw) => {
                        self.push(Some(id), NodeData::DataEntry(DataEntry::from(raw)), level, at);
                    }
                    Err(e) => warn!("data entry at {at:#x} is unreadable: {e}"),
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use crate::writer::{build_minimal_pe, ResourceName, ResourceSectionWriter, ResourceSpec};
    use crate::PeImage;

    const SECTION_RVA: u32 = 0x4000;

    fn image_with(specs: Vec<ResourceSpec>) -> PeImage {
        let section = ResourceSectionWriter::new(SECTION_RVA)
            .entries(specs)
            .build()
            .unwrap();
        PeImage::parse(build_minimal_pe(&section, SECTION_RVA)).unwrap()
    }

    fn sample() -> PeImage {
        image_with(vec![
            ResourceSpec::dir(
                ResourceName::Id(3),
                vec![ResourceSpec::dir(
                    ResourceName::Id(1),
                    vec![ResourceSpec::data(ResourceName::Id(1033), b"icon".to_vec())],
                )],
            ),
            ResourceSpec::dir(
                ResourceName::Name("CUSTOM".into()),
                vec![ResourceSpec::dir(
                    ResourceName::Name("BLOB".into()),
                    vec![ResourceSpec::data(ResourceName::Id(0), vec![1, 2, 3])],
                )],
            ),
        ])
    }

    fn kinds_in_preorder(tree: &ResourceTree) -> Vec<(NodeKind, u8)> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = tree.root().into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = tree.node(id);
            out.push((node.kind(), node.dir_level()));
            stack.extend(node.next());
            stack.extend(node.child());
        }
        out
    }

    #[test]
    fn test_levels_and_shape() {
        let tree = ResourceTree::parse(&sample()).unwrap();
        use NodeKind::*;

        // Named entries are stored before id entries.
        assert_eq!(
            kinds_in_preorder(&tree),
            vec![
                (ResourceDirectory, 1),
                (DirectoryEntry, 1),
                (DataString, 1),
                (ResourceDirectory, 2),
                (DirectoryEntry, 2),
                (DataString, 2),
                (ResourceDirectory, 3),
                (DirectoryEntry, 3),
                (DataEntry, 3),
                (DirectoryEntry, 1),
                (ResourceDirectory, 2),
                (DirectoryEntry, 2),
                (ResourceDirectory, 3),
                (DirectoryEntry, 3),
                (DataEntry, 3),
            ]
        );
    }

    #[test]
    fn test_parent_links() {
        let tree = ResourceTree::parse(&sample()).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.parent(root), None);

        let first_entry = tree.child(root).unwrap();
        assert_eq!(tree.parent(first_entry), Some(root));

        let second_entry = tree.next(first_entry).unwrap();
        assert_eq!(tree.parent(second_entry), Some(root));
        assert_eq!(tree.next(second_entry), None);
    }

    #[test]
    fn test_data_string_contents() {
        let tree = ResourceTree::parse(&sample()).unwrap();
        let first_entry = tree.child(tree.root().unwrap()).unwrap();
        let string_node = tree.child(first_entry).unwrap();
        let string = tree.node(string_node).as_data_string().unwrap();

        assert_eq!(string.length, 6);
        assert_eq!(string.to_single_byte(usize::MAX), "CUSTOM");
    }

    #[test]
    fn test_directory_cycle_is_not_followed() {
        // A type directory whose only entry points back at the root directory.
        let mut section = Vec::new();
        let root = RawResourceDirectory {
            number_of_id_entries: 1,
            ..Default::default()
        };
        let entry = RawDirectoryEntry {
            name: 3,
            offset_to_data: crate::format::HIGH_BIT,
        };
        use zerocopy::IntoBytes;
        section.extend_from_slice(root.as_bytes());
        section.extend_from_slice(entry.as_bytes());

        let image = PeImage::parse(build_minimal_pe(&section, SECTION_RVA)).unwrap();
        let tree = ResourceTree::parse(&image).unwrap();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_truncated_entries_are_dropped() {
        let root = RawResourceDirectory {
            number_of_id_entries: 0xFFFF,
            ..Default::default()
        };
        use zerocopy::IntoBytes;
        let image = PeImage::parse(build_minimal_pe(root.as_bytes(), SECTION_RVA)).unwrap();
        let tree = ResourceTree::parse(&image).unwrap();

        // The section is padded with zeros to the file alignment; every fully
        // readable entry is kept and nothing past the end of the file.
        assert!(tree.len() > 1);
        assert!(tree.len() < 0xFFFF);
    }

    #[test]
    fn test_empty_tree() {
        let tree = ResourceTree::empty();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
    }
}
