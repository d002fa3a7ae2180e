//! Resource tree nodes.
//!
//! A node is one of the four structures found in a resource section. The
//! ambiguous raw fields of a directory entry are decoded into
//! [`EntryName`] and [`EntryTarget`] when the tree is built.

use std::fmt;

use resdir_common::utf16;

use crate::format::{RawDataEntry, RawDirectoryEntry, RawResourceDirectory, HIGH_BIT};

/// Index of a node within its [`ResourceTree`](crate::ResourceTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in the tree's arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The four node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    ResourceDirectory,
    DirectoryEntry,
    DataString,
    DataEntry,
}

impl NodeKind {
    /// All kinds, in declaration order.
    pub const ALL: [NodeKind; 4] = [
        NodeKind::ResourceDirectory,
        NodeKind::DirectoryEntry,
        NodeKind::DataString,
        NodeKind::DataEntry,
    ];

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::ResourceDirectory => "Resource Directory",
            NodeKind::DirectoryEntry => "Directory Entry",
            NodeKind::DataString => "Data String",
            NodeKind::DataEntry => "Data Entry",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Header of a resource directory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDirectory {
    pub characteristics: u32,
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub named_entries: u16,
    pub id_entries: u16,
}

impl ResourceDirectory {
    /// Total number of entries following the header.
    pub fn entry_count(&self) -> usize {
        self.named_entries as usize + self.id_entries as usize
    }
}

impl From<RawResourceDirectory> for ResourceDirectory {
    fn from(raw: RawResourceDirectory) -> Self {
        Self {
            characteristics: raw.characteristics,
            time_date_stamp: raw.time_date_stamp,
            major_version: raw.major_version,
            minor_version: raw.minor_version,
            named_entries: raw.number_of_named_entries,
            id_entries: raw.number_of_id_entries,
        }
    }
}

/// How a directory entry is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryName {
    /// Offset of a length-prefixed UTF-16 string, relative to the resource base.
    String { offset: u32 },
    /// Numeric identifier.
    Id(u32),
}

impl EntryName {
    fn from_raw(raw: u32) -> Self {
        if raw & HIGH_BIT != 0 {
            EntryName::String {
                offset: raw & !HIGH_BIT,
            }
        } else {
            EntryName::Id(raw)
        }
    }

    /// The 31-bit value stored in the entry: the string offset or the id.
    pub fn raw_value(self) -> u32 {
        match self {
            EntryName::String { offset } => offset,
            EntryName::Id(id) => id,
        }
    }

    /// Whether the name refers to a string record.
    pub fn is_string(self) -> bool {
        matches!(self, EntryName::String { .. })
    }

    /// The numeric identifier, if the entry is not string-named.
    pub fn id(self) -> Option<u32> {
        match self {
            EntryName::Id(id) => Some(id),
            EntryName::String { .. } => None,
        }
    }
}

/// What a directory entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTarget {
    /// Nested directory, at an offset relative to the resource base.
    Directory { offset: u32 },
    /// Data entry, at an offset relative to the resource base.
    Data { offset: u32 },
}

impl EntryTarget {
    fn from_raw(raw: u32) -> Self {
        if raw & HIGH_BIT != 0 {
            EntryTarget::Directory {
                offset: raw & !HIGH_BIT,
            }
        } else {
            EntryTarget::Data { offset: raw }
        }
    }

    /// The offset relative to the resource base.
    pub fn offset(self) -> u32 {
        match self {
            EntryTarget::Directory { offset } | EntryTarget::Data { offset } => offset,
        }
    }

    /// Whether the target is a nested directory.
    pub fn is_directory(self) -> bool {
        matches!(self, EntryTarget::Directory { .. })
    }
}

/// A decoded directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: EntryName,
    pub target: EntryTarget,
}

impl From<RawDirectoryEntry> for DirectoryEntry {
    fn from(raw: RawDirectoryEntry) -> Self {
        Self {
            name: EntryName::from_raw(raw.name),
            target: EntryTarget::from_raw(raw.offset_to_data),
        }
    }
}

/// A length-prefixed UTF-16 string naming a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataString {
    /// Length in code units, as stored.
    pub length: u16,
    /// The code units (not null-terminated).
    pub units: Vec<u16>,
}

impl DataString {
    /// Convert to single-byte text, keeping at most `max_len` characters.
    pub fn to_single_byte(&self, max_len: usize) -> String {
        utf16::to_single_byte(&self.units, max_len)
    }
}

/// Location and attributes of a resource payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataEntry {
    /// RVA of the payload bytes.
    pub offset_to_data: u32,
    pub size: u32,
    pub code_page: u32,
    pub reserved: u32,
}

impl From<RawDataEntry> for DataEntry {
    fn from(raw: RawDataEntry) -> Self {
        Self {
            offset_to_data: raw.offset_to_data,
            size: raw.size,
            code_page: raw.code_page,
            reserved: raw.reserved,
        }
    }
}

/// Per-variant node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Directory(ResourceDirectory),
    DirectoryEntry(DirectoryEntry),
    DataString(DataString),
    DataEntry(DataEntry),
}

/// A node of the resource tree.
///
/// Links are indices into the owning tree: at most one first child, at most
/// one next sibling, and a non-owning back reference to the parent.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub(crate) data: NodeData,
    pub(crate) dir_level: u8,
    pub(crate) file_offset: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) child: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

impl ResourceNode {
    /// The node variant.
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Directory(_) => NodeKind::ResourceDirectory,
            NodeData::DirectoryEntry(_) => NodeKind::DirectoryEntry,
            NodeData::DataString(_) => NodeKind::DataString,
            NodeData::DataEntry(_) => NodeKind::DataEntry,
        }
    }

    /// The decoded structure.
    #[inline]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Directory nesting level: 1 = type, 2 = name, 3 = language.
    #[inline]
    pub fn dir_level(&self) -> u8 {
        self.dir_level
    }

    /// File offset the structure was read from.
    #[inline]
    pub fn file_offset(&self) -> usize {
        self.file_offset
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn child(&self) -> Option<NodeId> {
        self.child
    }

    #[inline]
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    pub fn as_directory(&self) -> Option<&ResourceDirectory> {
        match &self.data {
            NodeData::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub fn as_directory_entry(&self) -> Option<&DirectoryEntry> {
        match &self.data {
            NodeData::DirectoryEntry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_data_string(&self) -> Option<&DataString> {
        match &self.data {
            NodeData::DataString(string) => Some(string),
            _ => None,
        }
    }

    pub fn as_data_entry(&self) -> Option<&DataEntry> {
        match &self.data {
            NodeData::DataEntry(entry) => Some(entry),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_decoding() {
        assert_eq!(EntryName::from_raw(3), EntryName::Id(3));
        assert_eq!(
            EntryName::from_raw(0x8000_0120),
            EntryName::String { offset: 0x120 }
        );
        assert_eq!(EntryName::from_raw(0x8000_0120).raw_value(), 0x120);
        assert_eq!(EntryName::Id(16).id(), Some(16));
        assert_eq!(EntryName::String { offset: 4 }.id(), None);
    }

    #[test]
    fn test_entry_target_decoding() {
        let dir = EntryTarget::from_raw(0x8000_0018);
        assert!(dir.is_directory());
        assert_eq!(dir.offset(), 0x18);

        let data = EntryTarget::from_raw(0x48);
        assert!(!data.is_directory());
        assert_eq!(data.offset(), 0x48);
    }
}
