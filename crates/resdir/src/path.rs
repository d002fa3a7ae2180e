//! Path synthesis.
//!
//! A node's path is made of one component per directory level, from the type
//! (level 1) down to the node's own level. Each component comes from the
//! directory entry at that level: its name string, the symbolic name of a
//! well-known type, or the identifier as four hex digits. Components are
//! separated by a single space, e.g. `ICON 0001 0409`.

use resdir_common::{utf16, BinaryReader};
use resdir_pe::{EntryName, NodeId, NodeKind, ResourceTree, ROOT_LEVEL};
use tracing::warn;

use crate::walk::find_ancestor;
use crate::{types, NodeError, Resources};

/// Capacity of a path buffer, including the terminator.
pub const MAX_PATH: usize = 260;

/// Longest string component, in characters.
pub const MAX_COMPONENT_LEN: usize = MAX_PATH - 2;

const SEPARATOR: char = ' ';

/// Bounded buffer that components are appended to.
///
/// The text never exceeds `capacity - 1` bytes; one byte is kept for the
/// terminator of the fixed-size buffers these paths end up in.
#[derive(Debug, Clone)]
pub struct PathBuffer {
    text: String,
    capacity: usize,
}

impl PathBuffer {
    /// An empty buffer holding at most `capacity - 1` bytes of text.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes still available for text.
    pub fn remaining(&self) -> usize {
        self.capacity
            .saturating_sub(1)
            .saturating_sub(self.text.len())
    }

    /// Append at most `max_len` bytes of a component, then a separator.
    ///
    /// Returns `false` if the component had to be cut short. Nothing, not
    /// even the separator, is written for a component cut down to zero.
    pub fn push_component(&mut self, component: &str, max_len: usize) -> bool {
        let limit = max_len.min(self.remaining());
        let mut chars = component.chars().map(sanitize);
        let before = self.text.len();

        self.text.extend(chars.by_ref().take(limit));
        if self.text.len() > before && self.remaining() > 0 {
            self.text.push(SEPARATOR);
        }
        chars.next().is_none()
    }

    /// The text appended so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The path, without the trailing separator.
    pub fn finish(mut self) -> String {
        while self.text.ends_with(SEPARATOR) {
            self.text.pop();
        }
        self.text
    }
}

/// Keep path components single-byte and free of directory separators.
fn sanitize(c: char) -> char {
    match c {
        '/' | '\\' => '_',
        c if c.is_ascii_control() => '_',
        c if c.is_ascii() => c,
        _ => utf16::REPLACEMENT,
    }
}

/// The directory entry at `level` on the path from the root to `node`.
///
/// `node` itself qualifies when it is a directory entry at that level.
pub fn entry_at_level(tree: &ResourceTree, node: NodeId, level: u8) -> Option<NodeId> {
    let this = tree.get(node)?;
    if this.kind() == NodeKind::DirectoryEntry && this.dir_level() == level {
        return Some(node);
    }
    find_ancestor(tree, node, NodeKind::DirectoryEntry, level)
}

/// Build the path of `node` with the default capacity.
pub fn build_path(res: Resources<'_>, node: NodeId) -> String {
    build_path_with_capacity(res, node, MAX_PATH)
}

/// Build the path of `node` into a buffer of `capacity` bytes.
///
/// A component is truncated so that every later component keeps room for
/// its text (up to an equal share of the buffer) and its separator.
/// Components that cannot be resolved are logged and left out, so the
/// result may be partial or empty.
pub fn build_path_with_capacity(res: Resources<'_>, node: NodeId, capacity: usize) -> String {
    let mut buffer = PathBuffer::with_capacity(capacity);
    let Some(target) = res.tree().get(node) else {
        return buffer.finish();
    };

    let components: Vec<String> = (ROOT_LEVEL..=target.dir_level())
        .filter_map(|level| match component(res, node, level) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("path of node {}: {e}", node.index());
                None
            }
        })
        .collect();

    let share = (capacity.saturating_sub(1) / components.len().max(1)).max(1);
    let mut truncated = false;
    for (index, text) in components.iter().enumerate() {
        let reserve: usize = components[index + 1..]
            .iter()
            .map(|later| later.len().min(share) + 1)
            .sum();
        let max_len = buffer.remaining().saturating_sub(reserve);
        truncated |= !buffer.push_component(text, max_len);
    }
    if truncated {
        warn!("path of node {} truncated to {capacity} bytes", node.index());
    }

    buffer.finish()
}

fn component(res: Resources<'_>, node: NodeId, level: u8) -> Result<String, NodeError> {
    let tree = res.tree();
    let entry_id = entry_at_level(tree, node, level).ok_or(NodeError::MissingAncestor { level })?;
    let entry = tree
        .node(entry_id)
        .as_directory_entry()
        .ok_or(NodeError::Structural {
            expected: "directory entry",
            found: tree.node(entry_id).kind(),
            level,
        })?;

    match entry.name {
        EntryName::String { offset } => {
            let units = read_name(res, offset)?;
            Ok(utf16::to_single_byte(&units, MAX_COMPONENT_LEN))
        }
        EntryName::Id(id) => match types::lookup(id) {
            Some(known) if level == ROOT_LEVEL => Ok(known.name.to_string()),
            _ => Ok(format!("{id:04x}")),
        },
    }
}

/// Read a length-prefixed UTF-16 name at `offset` from the resource base.
fn read_name(res: Resources<'_>, offset: u32) -> Result<Vec<u16>, NodeError> {
    let image = res.image();
    let available = image.bytes().len();
    let bounds = |at: usize, len: usize| NodeError::Bounds {
        offset: at,
        len,
        available,
    };

    let base = image.resource_base().unwrap_or_default();
    let at = base
        .checked_add(offset as usize)
        .ok_or_else(|| bounds(base, offset as usize))?;

    let mut reader = BinaryReader::new_at(image.bytes(), at);
    let length = reader.read_u16().map_err(|_| bounds(at, 2))?;
    let units = reader
        .read_utf16_units(length as usize)
        .map_err(|_| bounds(at + 2, length as usize * 2))?;
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{leaf, named_dir, resource, Fixture, SECTION_RVA};
    use crate::walk::search;
    use resdir_pe::writer::{ResourceName, ResourceSectionWriter};

    fn leaves(fx: &Fixture) -> Vec<NodeId> {
        search(fx.tree(), fx.tree().root(), |n| n.kind() == NodeKind::DataEntry)
    }

    #[test]
    fn test_numeric_components() {
        let fx = Fixture::new(vec![resource(3, ResourceName::Id(1), 1033, b"x")]);
        let path = build_path(fx.resources(), leaves(&fx)[0]);
        assert_eq!(path, "ICON 0001 0409");
    }

    #[test]
    fn test_unknown_type_is_hex() {
        let fx = Fixture::new(vec![resource(0x1234, ResourceName::Id(0xAB), 0, b"x")]);
        let path = build_path(fx.resources(), leaves(&fx)[0]);
        assert_eq!(path, "1234 00ab 0000");
    }

    #[test]
    fn test_symbolic_names_only_at_level_one() {
        // Name id 3 matches ICON but must stay numeric at level 2.
        let fx = Fixture::new(vec![resource(10, ResourceName::Id(3), 16, b"x")]);
        let path = build_path(fx.resources(), leaves(&fx)[0]);
        assert_eq!(path, "RCDATA 0003 0010");
    }

    #[test]
    fn test_string_components() {
        let fx = Fixture::new(vec![named_dir(
            ResourceName::Id(3),
            vec![named_dir(
                ResourceName::Name("5".into()),
                vec![named_dir(ResourceName::Name("1033".into()), vec![])],
            )],
        )]);
        // The level-3 entry has no payload here; its own path still resolves.
        let entries = search(fx.tree(), fx.tree().root(), |n| {
            n.kind() == NodeKind::DirectoryEntry && n.dir_level() == 3
        });
        assert_eq!(build_path(fx.resources(), entries[0]), "ICON 5 1033");
    }

    #[test]
    fn test_path_of_intermediate_entry() {
        let fx = Fixture::new(vec![named_dir(
            ResourceName::Name("CUSTOM".into()),
            vec![named_dir(ResourceName::Id(7), vec![leaf(0, b"x")])],
        )]);
        let level2 = search(fx.tree(), fx.tree().root(), |n| {
            n.kind() == NodeKind::DirectoryEntry && n.dir_level() == 2
        });
        assert_eq!(build_path(fx.resources(), level2[0]), "CUSTOM 0007");
    }

    #[test]
    fn test_sanitized_components() {
        let fx = Fixture::new(vec![resource(
            10,
            ResourceName::Name("../é\tx".into()),
            0,
            b"x",
        )]);
        let path = build_path(fx.resources(), leaves(&fx)[0]);
        assert_eq!(path, "RCDATA .._?_x 0000");
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        for name_len in [1usize, 7, 64, 255, 258, 300, 1000] {
            for capacity in [1usize, 2, 5, 16, 32, 260] {
                let long = "N".repeat(name_len);
                let fx = Fixture::new(vec![named_dir(
                    ResourceName::Name(long.clone()),
                    vec![named_dir(
                        ResourceName::Name(long),
                        vec![leaf(1033, b"x")],
                    )],
                )]);
                let path = build_path_with_capacity(fx.resources(), leaves(&fx)[0], capacity);
                assert!(
                    path.len() < capacity.max(1),
                    "len {} with capacity {capacity}",
                    path.len()
                );
                assert!(!path.ends_with(' '));
            }
        }
    }

    #[test]
    fn test_buffer_truncation() {
        let mut buffer = PathBuffer::with_capacity(8);
        assert!(buffer.push_component("ICON", usize::MAX));
        assert_eq!(buffer.as_str(), "ICON ");
        assert!(!buffer.push_component("TOOLONG", usize::MAX));
        assert_eq!(buffer.as_str(), "ICON TO");
        assert_eq!(buffer.remaining(), 0);
        assert_eq!(buffer.finish(), "ICON TO");

        let mut buffer = PathBuffer::with_capacity(16);
        assert!(!buffer.push_component("ABCDEF", 3));
        assert!(!buffer.push_component("XYZ", 0));
        assert_eq!(buffer.as_str(), "ABC ");
    }

    #[test]
    fn test_zero_capacity() {
        let mut buffer = PathBuffer::with_capacity(0);
        assert!(!buffer.push_component("A", usize::MAX));
        assert_eq!(buffer.finish(), "");
    }

    #[test]
    fn test_long_type_name_keeps_later_components() {
        let long = "T".repeat(300);
        let fx = Fixture::new(vec![named_dir(
            ResourceName::Name(long),
            vec![
                named_dir(ResourceName::Id(1), vec![leaf(1033, b"a")]),
                named_dir(ResourceName::Id(2), vec![leaf(1049, b"b")]),
            ],
        )]);
        let ids = leaves(&fx);
        let first = build_path(fx.resources(), ids[0]);
        let second = build_path(fx.resources(), ids[1]);

        assert_ne!(first, second);
        assert!(first.ends_with("T 0001 0409"), "{first}");
        assert!(second.ends_with("T 0002 0419"), "{second}");
        assert_eq!(first.len(), MAX_PATH - 1);
    }

    #[test]
    fn test_two_long_names_share_the_buffer() {
        let long = "N".repeat(300);
        let fx = Fixture::new(vec![named_dir(
            ResourceName::Name(long.clone()),
            vec![named_dir(ResourceName::Name(long), vec![leaf(1033, b"x")])],
        )]);
        let path = build_path(fx.resources(), leaves(&fx)[0]);

        let parts: Vec<_> = path.split(' ').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].len() > parts[1].len() && !parts[1].is_empty());
        assert_eq!(parts[2], "0409");
        assert!(path.len() < MAX_PATH);
    }

    #[test]
    fn test_unreadable_name_is_left_out() {
        let section = ResourceSectionWriter::new(SECTION_RVA)
            .entry(resource(3, ResourceName::Name("5".into()), 1033, b"x"))
            .build()
            .unwrap();
        // root (16 + 8) + type directory header (16): the level-2 entry's name
        let fx = Fixture::from_section(section, |bytes| {
            bytes[40..44].copy_from_slice(&(0x8000_0000u32 | 0x7FFF_0000).to_le_bytes());
        });

        let leaf = leaves(&fx)[0];
        let level2 = entry_at_level(fx.tree(), leaf, 2).unwrap();
        assert!(matches!(
            fx.tree().node(level2).as_directory_entry().unwrap().name,
            EntryName::String { offset: 0x7FFF_0000 }
        ));
        assert_eq!(build_path(fx.resources(), leaf), "ICON 0409");
    }

    #[test]
    fn test_entry_at_level() {
        let fx = Fixture::new(vec![resource(16, ResourceName::Id(1), 1033, b"x")]);
        let tree = fx.tree();
        let leaf = leaves(&fx)[0];

        let lang = entry_at_level(tree, leaf, 3).unwrap();
        assert_eq!(entry_at_level(tree, lang, 3), Some(lang));
        assert_eq!(
            tree.node(entry_at_level(tree, lang, 1).unwrap())
                .as_directory_entry()
                .unwrap()
                .name
                .id(),
            Some(16)
        );
    }
}
