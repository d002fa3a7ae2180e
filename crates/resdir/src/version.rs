//! Version resource decoding.
//!
//! A version resource starts with a `VS_VERSIONINFO` header: three 16-bit
//! fields, the null-terminated UTF-16 key `VS_VERSION_INFO` and padding to a
//! 4-byte boundary. The `VS_FIXEDFILEINFO` record follows, and its file and
//! product version words are what gets reported.

use std::fmt;
use std::io;

use resdir_common::memchr::memmem;
use resdir_common::BinaryReader;
use resdir_pe::{NodeId, NodeKind, ROOT_LEVEL};
use tracing::{debug, warn};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::output::Output;
use crate::types::RT_VERSION;
use crate::walk::{search, search_subtree};
use crate::{NodeError, Resources};

/// Signature of a `VS_FIXEDFILEINFO` record.
pub const FIXED_FILE_INFO_SIGNATURE: u32 = 0xFEEF_04BD;

/// Size of the `VS_VERSIONINFO` header with the standard key.
pub const VERSION_INFO_HEADER_SIZE: usize = 40;

/// `VS_FIXEDFILEINFO` (52 bytes).
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct FixedFileInfo {
    pub signature: u32,
    pub struc_version: u32,
    pub file_version_ms: u32,
    pub file_version_ls: u32,
    pub product_version_ms: u32,
    pub product_version_ls: u32,
    pub file_flags_mask: u32,
    pub file_flags: u32,
    pub file_os: u32,
    pub file_type: u32,
    pub file_subtype: u32,
    pub file_date_ms: u32,
    pub file_date_ls: u32,
}

const FIXED_FILE_INFO_SIZE: usize = std::mem::size_of::<FixedFileInfo>();

/// A four-part version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionQuad(pub [u16; 4]);

impl VersionQuad {
    /// Split a most/least significant word pair into four components.
    pub fn from_words(ms: u32, ls: u32) -> Self {
        Self([
            (ms >> 16) as u16,
            (ms & 0xFFFF) as u16,
            (ls >> 16) as u16,
            (ls & 0xFFFF) as u16,
        ])
    }
}

impl fmt::Display for VersionQuad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// Versions decoded from one version resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub file_version: VersionQuad,
    pub product_version: VersionQuad,
    /// File offset of the fixed file info record.
    pub offset: usize,
}

impl From<(&FixedFileInfo, usize)> for VersionInfo {
    fn from((info, offset): (&FixedFileInfo, usize)) -> Self {
        Self {
            file_version: VersionQuad::from_words(info.file_version_ms, info.file_version_ls),
            product_version: VersionQuad::from_words(
                info.product_version_ms,
                info.product_version_ls,
            ),
            offset,
        }
    }
}

/// Offset of the fixed file info within a version resource payload.
///
/// The header is walked to find where the record starts. If the header is
/// malformed, the payload is scanned for the record's signature instead.
pub fn fixed_file_info_offset(payload: &[u8]) -> Option<usize> {
    let signature = FIXED_FILE_INFO_SIGNATURE.to_le_bytes();
    let has_signature = |at: usize| {
        payload
            .get(at..)
            .and_then(|rest| rest.get(..4))
            .is_some_and(|bytes| bytes == signature)
    };

    if let Some(at) = header_size(payload) {
        if has_signature(at) {
            return Some(at);
        }
    }

    let found = memmem::find(payload, &signature)?;
    debug!(offset = found, "fixed file info found by signature scan");
    Some(found)
}

fn header_size(payload: &[u8]) -> Option<usize> {
    let mut reader = BinaryReader::new(payload);
    let _length = reader.read_u16().ok()?;
    let value_length = reader.read_u16().ok()?;
    let _kind = reader.read_u16().ok()?;
    if value_length as usize != FIXED_FILE_INFO_SIZE {
        return None;
    }
    reader.read_utf16_cstring().ok()?;
    reader.align(4);
    Some(reader.position())
}

/// Type-level directory entries for `RT_VERSION`.
pub fn version_entries(res: Resources<'_>) -> Vec<NodeId> {
    search(res.tree(), res.root(), |node| {
        node.kind() == NodeKind::DirectoryEntry
            && node.dir_level() == ROOT_LEVEL
            && node
                .as_directory_entry()
                .is_some_and(|e| e.name.id() == Some(RT_VERSION))
    })
}

/// Decode the fixed file info of one data entry.
pub fn decode_leaf(res: Resources<'_>, node: NodeId) -> Result<VersionInfo, NodeError> {
    let leaf = res.tree().node(node);
    let entry = leaf.as_data_entry().ok_or(NodeError::Structural {
        expected: "data entry",
        found: leaf.kind(),
        level: leaf.dir_level(),
    })?;

    // The whole declared payload must be in the file, not only the record.
    let (offset, payload) = res.payload(entry)?;
    let skip = fixed_file_info_offset(payload).ok_or(NodeError::MissingFixedFileInfo { offset })?;

    let at = offset + skip;
    let end = skip + FIXED_FILE_INFO_SIZE;
    if end > payload.len() || !res.image().can_read(at, FIXED_FILE_INFO_SIZE) {
        return Err(NodeError::Bounds {
            offset: at,
            len: FIXED_FILE_INFO_SIZE,
            available: res.image().bytes().len(),
        });
    }
    let record = &payload[skip..end];
    let info = FixedFileInfo::read_from_bytes(record).map_err(|_| NodeError::Bounds {
        offset: at,
        len: FIXED_FILE_INFO_SIZE,
        available: record.len(),
    })?;

    Ok(VersionInfo::from((&info, at)))
}

/// Decode every version resource and report its versions.
///
/// Leaves that cannot be decoded are logged and skipped. Returns the number
/// of resources reported; an image without version resources reports none.
pub fn decode_version(res: Resources<'_>, out: &mut dyn Output) -> io::Result<usize> {
    let mut reported = 0;

    for entry in version_entries(res) {
        let leaves = search_subtree(res.tree(), entry, |n| n.kind() == NodeKind::DataEntry);
        for leaf in leaves {
            match decode_leaf(res, leaf) {
                Ok(info) => {
                    out.emit("File Version", &info.file_version.to_string())?;
                    out.emit("Product Version", &info.product_version.to_string())?;
                    reported += 1;
                }
                Err(e) => warn!("cannot read VS_FIXEDFILEINFO: {e}"),
            }
        }
    }

    Ok(reported)
}
