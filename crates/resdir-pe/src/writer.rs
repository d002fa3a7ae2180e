//! Resource section writer.
//!
//! Serializes a typed description of a resource tree into the on-disk
//! layout: directory tables first, then name strings, data entries and
//! finally the payloads. [`build_minimal_pe`] wraps a section in the
//! smallest image [`PeImage`](crate::PeImage) accepts.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use resdir_common::utf16;
use zerocopy::IntoBytes;

use crate::format::{
    CoffHeader, RawDataEntry, RawDirectoryEntry, RawResourceDirectory, SectionHeader,
    DOS_LFANEW_OFFSET, DOS_MAGIC, HIGH_BIT, PE32_MAGIC, PE32_PLUS_MAGIC, PE_SIGNATURE,
};
use crate::Result;

/// Name of an entry being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceName {
    Id(u32),
    Name(String),
}

impl ResourceName {
    fn is_string(&self) -> bool {
        matches!(self, ResourceName::Name(_))
    }
}

#[derive(Debug, Clone)]
enum Content {
    Directory(Vec<ResourceSpec>),
    Payload { bytes: Vec<u8>, code_page: u32 },
    Raw { rva: u32, size: u32 },
}

/// One directory entry and what it points at.
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    name: ResourceName,
    content: Content,
}

impl ResourceSpec {
    /// An entry pointing at a nested directory.
    pub fn dir(name: ResourceName, children: Vec<ResourceSpec>) -> Self {
        Self {
            name,
            content: Content::Directory(children),
        }
    }

    /// An entry pointing at a data entry whose payload is written into the section.
    pub fn data(name: ResourceName, bytes: Vec<u8>) -> Self {
        Self::data_with_code_page(name, bytes, 0)
    }

    /// Like [`ResourceSpec::data`], with an explicit code page.
    pub fn data_with_code_page(name: ResourceName, bytes: Vec<u8>, code_page: u32) -> Self {
        Self {
            name,
            content: Content::Payload { bytes, code_page },
        }
    }

    /// An entry pointing at a data entry with an arbitrary RVA and size.
    ///
    /// No payload is written; the RVA need not be mapped by any section.
    pub fn raw(name: ResourceName, rva: u32, size: u32) -> Self {
        Self {
            name,
            content: Content::Raw { rva, size },
        }
    }
}

/// Builder for resource section bytes.
///
/// # Example
///
/// ```
/// use resdir_pe::writer::{ResourceName, ResourceSectionWriter, ResourceSpec};
///
/// let section = ResourceSectionWriter::new(0x4000)
///     .entry(ResourceSpec::dir(
///         ResourceName::Id(24),
///         vec![ResourceSpec::dir(
///             ResourceName::Id(1),
///             vec![ResourceSpec::data(ResourceName::Id(1033), b"<assembly/>".to_vec())],
///         )],
///     ))
///     .build()
///     .unwrap();
/// assert!(!section.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ResourceSectionWriter {
    section_rva: u32,
    entries: Vec<ResourceSpec>,
}

#[derive(Default)]
struct FlatDirectory<'a> {
    named: u16,
    ids: u16,
    entries: Vec<(&'a ResourceName, FlatTarget)>,
}

#[derive(Clone, Copy)]
enum FlatTarget {
    Directory(usize),
    Leaf(usize),
}

enum Leaf<'a> {
    Payload { bytes: &'a [u8], code_page: u32 },
    Raw { rva: u32, size: u32 },
}

impl ResourceSectionWriter {
    /// Create a writer for a section loaded at `section_rva`.
    pub fn new(section_rva: u32) -> Self {
        Self {
            section_rva,
            entries: Vec::new(),
        }
    }

    /// Add a top-level (type) entry.
    pub fn entry(mut self, spec: ResourceSpec) -> Self {
        self.entries.push(spec);
        self
    }

    /// Add multiple top-level entries.
    pub fn entries(mut self, specs: impl IntoIterator<Item = ResourceSpec>) -> Self {
        self.entries.extend(specs);
        self
    }

    /// Serialize the section.
    pub fn build(&self) -> Result<Vec<u8>> {
        // Step 1: Flatten directories (pre-order) and leaves
        let mut dirs = Vec::new();
        let mut leaves = Vec::new();
        flatten(&self.entries, &mut dirs, &mut leaves);

        // Step 2: Directory tables
        let mut dir_offsets = Vec::with_capacity(dirs.len());
        let mut cursor = 0usize;
        for dir in &dirs {
            dir_offsets.push(cursor);
            cursor += std::mem::size_of::<RawResourceDirectory>()
                + dir.entries.len() * std::mem::size_of::<RawDirectoryEntry>();
        }

        // Step 3: Name strings
        let strings_start = cursor;
        let mut strings: Vec<u8> = Vec::new();
        let mut string_offsets = Vec::new();
        for dir in &dirs {
            for (name, _) in &dir.entries {
                if let ResourceName::Name(text) = name {
                    string_offsets.push((strings_start + strings.len()) as u32);
                    let units = utf16::encode_le(text);
                    strings.write_u16::<LittleEndian>((units.len() / 2) as u16)?;
                    strings.extend_from_slice(&units);
                }
            }
        }
        cursor = align(strings_start + strings.len(), 4);

        // Step 4: Data entries, then payloads
        let data_entries_start = cursor;
        cursor += leaves.len() * std::mem::size_of::<RawDataEntry>();
        let payloads_start = align(cursor, 8);

        // Step 5: Write everything
        let mut output: Vec<u8> = Vec::with_capacity(payloads_start);
        let mut strings_iter = string_offsets.into_iter();
        for dir in &dirs {
            let header = RawResourceDirectory {
                number_of_named_entries: dir.named,
                number_of_id_entries: dir.ids,
                ..Default::default()
            };
            output.extend_from_slice(header.as_bytes());

            for (name, target) in &dir.entries {
                let name = match name {
                    ResourceName::Id(id) => *id,
                    ResourceName::Name(_) => HIGH_BIT | strings_iter.next().unwrap_or_default(),
                };
                let offset_to_data = match *target {
                    FlatTarget::Directory(index) => HIGH_BIT | dir_offsets[index] as u32,
                    FlatTarget::Leaf(index) => {
                        (data_entries_start + index * std::mem::size_of::<RawDataEntry>()) as u32
                    }
                };
                let entry = RawDirectoryEntry {
                    name,
                    offset_to_data,
                };
                output.extend_from_slice(entry.as_bytes());
            }
        }

        output.extend_from_slice(&strings);
        output.resize(data_entries_start, 0);

        let mut payload_cursor = payloads_start;
        for leaf in &leaves {
            let raw = match leaf {
                Leaf::Payload { bytes, code_page } => {
                    let entry = RawDataEntry {
                        offset_to_data: self.section_rva + payload_cursor as u32,
                        size: bytes.len() as u32,
                        code_page: *code_page,
                        reserved: 0,
                    };
                    payload_cursor = align(payload_cursor + bytes.len(), 8);
                    entry
                }
                Leaf::Raw { rva, size } => RawDataEntry {
                    offset_to_data: *rva,
                    size: *size,
                    ..Default::default()
                },
            };
            output.extend_from_slice(raw.as_bytes());
        }

        output.resize(payloads_start, 0);
        for leaf in &leaves {
            if let Leaf::Payload { bytes, .. } = leaf {
                output.extend_from_slice(bytes);
                output.resize(align(output.len(), 8), 0);
            }
        }

        Ok(output)
    }
}

fn flatten<'a>(
    children: &'a [ResourceSpec],
    dirs: &mut Vec<FlatDirectory<'a>>,
    leaves: &mut Vec<Leaf<'a>>,
) -> usize {
    let index = dirs.len();
    dirs.push(FlatDirectory::default());

    // Named entries precede id entries in a directory table.
    let ordered = children
        .iter()
        .filter(|c| c.name.is_string())
        .chain(children.iter().filter(|c| !c.name.is_string()));

    let mut dir = FlatDirectory::default();
    for spec in ordered {
        if spec.name.is_string() {
            dir.named += 1;
        } else {
            dir.ids += 1;
        }

        let target = match &spec.content {
            Content::Directory(nested) => FlatTarget::Directory(flatten(nested, dirs, leaves)),
            Content::Payload { bytes, code_page } => {
                leaves.push(Leaf::Payload {
                    bytes,
                    code_page: *code_page,
                });
                FlatTarget::Leaf(leaves.len() - 1)
            }
            Content::Raw { rva, size } => {
                leaves.push(Leaf::Raw {
                    rva: *rva,
                    size: *size,
                });
                FlatTarget::Leaf(leaves.len() - 1)
            }
        };
        dir.entries.push((&spec.name, target));
    }

    dirs[index] = dir;
    index
}

fn align(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

const FILE_ALIGNMENT: usize = 0x200;
const SECTION_ALIGNMENT: u32 = 0x1000;
const NT_OFFSET: usize = 0x40;

/// Wrap a resource section in a single-section PE32 image.
///
/// The section is placed at file offset `0x200` and mapped at `section_rva`;
/// the resource data directory covers the whole section.
pub fn build_minimal_pe(section: &[u8], section_rva: u32) -> Vec<u8> {
    build_image(section, section_rva, false)
}

/// Like [`build_minimal_pe`], with a PE32+ optional header.
pub fn build_minimal_pe64(section: &[u8], section_rva: u32) -> Vec<u8> {
    build_image(section, section_rva, true)
}

fn build_image(section: &[u8], section_rva: u32, pe32_plus: bool) -> Vec<u8> {
    let (optional_size, magic, count_offset, image_base_offset) = if pe32_plus {
        (240usize, PE32_PLUS_MAGIC, 108usize, 24usize)
    } else {
        (224usize, PE32_MAGIC, 92usize, 28usize)
    };

    let mut out = vec![0u8; FILE_ALIGNMENT];
    out[..2].copy_from_slice(DOS_MAGIC);
    LittleEndian::write_u32(&mut out[DOS_LFANEW_OFFSET..], NT_OFFSET as u32);
    out[NT_OFFSET..NT_OFFSET + 4].copy_from_slice(PE_SIGNATURE);

    let coff = CoffHeader {
        machine: if pe32_plus { 0x8664 } else { 0x14C },
        number_of_sections: 1,
        size_of_optional_header: optional_size as u16,
        characteristics: 0x2102,
        ..Default::default()
    };
    let coff_start = NT_OFFSET + 4;
    out[coff_start..coff_start + 20].copy_from_slice(coff.as_bytes());

    let optional = &mut out[coff_start + 20..coff_start + 20 + optional_size];
    LittleEndian::write_u16(&mut optional[0..], magic);
    LittleEndian::write_u32(&mut optional[image_base_offset..], 0x0040_0000);
    LittleEndian::write_u32(&mut optional[32..], SECTION_ALIGNMENT);
    LittleEndian::write_u32(&mut optional[36..], FILE_ALIGNMENT as u32);
    let image_size = align(section_rva as usize + section.len(), SECTION_ALIGNMENT as usize);
    LittleEndian::write_u32(&mut optional[56..], image_size as u32);
    LittleEndian::write_u32(&mut optional[60..], FILE_ALIGNMENT as u32);
    LittleEndian::write_u32(&mut optional[count_offset..], 16);
    let resource_entry = count_offset + 4 + 2 * 8;
    LittleEndian::write_u32(&mut optional[resource_entry..], section_rva);
    LittleEndian::write_u32(&mut optional[resource_entry + 4..], section.len() as u32);

    let raw_size = align(section.len(), FILE_ALIGNMENT);
    let header = SectionHeader {
        name: *b".rsrc\0\0\0",
        virtual_size: section.len() as u32,
        virtual_address: section_rva,
        size_of_raw_data: raw_size as u32,
        pointer_to_raw_data: FILE_ALIGNMENT as u32,
        characteristics: 0x4000_0040,
        ..Default::default()
    };
    let section_table = coff_start + 20 + optional_size;
    out[section_table..section_table + 40].copy_from_slice(header.as_bytes());

    out.extend_from_slice(section);
    out.resize(FILE_ALIGNMENT + raw_size, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageView, PeImage};
    use resdir_common::BinaryReader;

    #[test]
    fn test_single_leaf_layout() {
        let section = ResourceSectionWriter::new(0x1000)
            .entry(ResourceSpec::dir(
                ResourceName::Id(10),
                vec![ResourceSpec::dir(
                    ResourceName::Id(7),
                    vec![ResourceSpec::data(ResourceName::Id(1033), vec![9; 5])],
                )],
            ))
            .build()
            .unwrap();

        let mut reader = BinaryReader::new(&section);
        let root: RawResourceDirectory = reader.read_struct().unwrap();
        assert_eq!({ root.number_of_id_entries }, 1);
        assert_eq!({ root.number_of_named_entries }, 0);

        let entry: RawDirectoryEntry = reader.read_struct().unwrap();
        assert_eq!({ entry.name }, 10);
        assert_eq!({ entry.offset_to_data }, HIGH_BIT | 24);
    }

    #[test]
    fn test_payload_reachable_through_image() {
        let section = ResourceSectionWriter::new(0x5000)
            .entry(ResourceSpec::dir(
                ResourceName::Id(10),
                vec![ResourceSpec::dir(
                    ResourceName::Name("DATA".into()),
                    vec![ResourceSpec::data_with_code_page(
                        ResourceName::Id(1033),
                        b"payload".to_vec(),
                        1252,
                    )],
                )],
            ))
            .build()
            .unwrap();
        let image = PeImage::parse(build_minimal_pe(&section, 0x5000)).unwrap();

        // root(16+8) + type dir(16+8) + name dir(16+8) + "DATA"(2+8), aligned to 4
        let data_entry_offset = image.resource_base().unwrap() + 84;
        let mut reader = BinaryReader::new_at(image.bytes(), data_entry_offset);
        let raw: RawDataEntry = reader.read_struct().unwrap();
        assert_eq!({ raw.size }, 7);
        assert_eq!({ raw.code_page }, 1252);

        let offset = image.rva_to_offset(raw.offset_to_data).unwrap();
        assert_eq!(image.read(offset, 7).unwrap(), b"payload");
    }

    #[test]
    fn test_pe32_plus_image() {
        let image = PeImage::parse(build_minimal_pe64(&[0u8; 32], 0x2000)).unwrap();
        assert!(image.is_pe32_plus());
        assert!(image.resource_base().is_some());
    }
}
