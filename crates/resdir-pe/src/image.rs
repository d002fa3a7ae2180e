//! PE image loading and address translation.
//!
//! Only the parts of the headers needed to find the resource table are
//! parsed: the DOS header, NT signature, COFF header, optional header magic,
//! the resource data directory and the section table.

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use resdir_common::BinaryReader;

use crate::format::{
    CoffHeader, DataDirectory, SectionHeader, DOS_LFANEW_OFFSET, DOS_MAGIC, PE32_MAGIC,
    PE32_PLUS_MAGIC, PE_SIGNATURE, RESOURCE_DIRECTORY_INDEX,
};
use crate::{Error, Result};

/// Read access to a loaded image, as consumed by the resource interpreter.
pub trait ImageView {
    /// The raw bytes of the file.
    fn bytes(&self) -> &[u8];

    /// Translate a relative virtual address to a file offset.
    fn rva_to_offset(&self, rva: u32) -> Option<usize>;

    /// File offset of the root resource directory, if the image has one.
    fn resource_base(&self) -> Option<usize>;

    /// Borrow `[offset, offset + len)` if it lies entirely within the file.
    fn read(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.bytes().get(offset..end)
    }

    /// Check whether `[offset, offset + len)` lies entirely within the file.
    fn can_read(&self, offset: usize, len: usize) -> bool {
        self.read(offset, len).is_some()
    }
}

/// Backing storage of an image.
enum ImageData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for ImageData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ImageData::Mapped(mmap) => &mmap[..],
            ImageData::Owned(bytes) => &bytes[..],
        }
    }
}

/// A section table entry, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name with trailing nulls removed.
    pub name: String,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub raw_size: u32,
    pub raw_offset: u32,
}

impl Section {
    fn from_header(header: &SectionHeader) -> Self {
        let raw_name = header.name;
        let end = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
        Self {
            name: String::from_utf8_lossy(&raw_name[..end]).into_owned(),
            virtual_address: header.virtual_address,
            virtual_size: header.virtual_size,
            raw_size: header.size_of_raw_data,
            raw_offset: header.pointer_to_raw_data,
        }
    }

    /// Translate `rva` if this section maps it.
    ///
    /// A section spans the larger of its virtual and raw sizes.
    pub fn translate(&self, rva: u32) -> Option<usize> {
        let delta = rva.checked_sub(self.virtual_address)?;
        if delta >= self.virtual_size.max(self.raw_size) {
            return None;
        }
        let offset = u64::from(self.raw_offset) + u64::from(delta);
        usize::try_from(offset).ok()
    }
}

/// A PE image, memory-mapped or held in memory.
pub struct PeImage {
    data: ImageData,
    name: String,
    is_pe32_plus: bool,
    sections: Vec<Section>,
    resource_directory: DataDirectory,
}

impl PeImage {
    /// Memory-map and parse the image at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self::from_data(ImageData::Mapped(mmap), name)
    }

    /// Parse an image held in memory.
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        Self::from_data(ImageData::Owned(bytes), "memory".to_string())
    }

    fn from_data(data: ImageData, name: String) -> Result<Self> {
        let headers = Headers::parse(&data)?;
        Ok(Self {
            data,
            name,
            is_pe32_plus: headers.is_pe32_plus,
            sections: headers.sections,
            resource_directory: headers.resource_directory,
        })
    }

    /// Get the image name (file name, or `memory`).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the optional header is PE32+.
    #[inline]
    pub fn is_pe32_plus(&self) -> bool {
        self.is_pe32_plus
    }

    /// Get the decoded section table.
    #[inline]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Whether the resource data directory is populated.
    pub fn has_resources(&self) -> bool {
        let directory = self.resource_directory;
        directory.virtual_address != 0 && directory.size != 0
    }
}

impl ImageView for PeImage {
    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        self.sections.iter().find_map(|s| s.translate(rva))
    }

    fn resource_base(&self) -> Option<usize> {
        if !self.has_resources() {
            return None;
        }
        self.rva_to_offset(self.resource_directory.virtual_address)
    }
}

impl std::fmt::Debug for PeImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeImage")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .field("is_pe32_plus", &self.is_pe32_plus)
            .field("sections", &self.sections.len())
            .finish()
    }
}

/// The header fields this crate cares about.
struct Headers {
    is_pe32_plus: bool,
    sections: Vec<Section>,
    resource_directory: DataDirectory,
}

impl Headers {
    fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        reader
            .expect_magic(DOS_MAGIC)
            .map_err(|_| Error::MissingDosSignature)?;

        reader.seek(DOS_LFANEW_OFFSET);
        let nt_offset = reader.read_u32()? as usize;

        reader.seek(nt_offset);
        reader
            .expect_magic(PE_SIGNATURE)
            .map_err(|_| Error::InvalidPeSignature { offset: nt_offset })?;

        let coff: CoffHeader = reader.read_struct()?;
        let optional_start = reader.position();

        let magic = reader.read_u16()?;
        let (count_offset, is_pe32_plus) = match magic {
            PE32_MAGIC => (92, false),
            PE32_PLUS_MAGIC => (108, true),
            other => return Err(Error::UnsupportedOptionalHeader(other)),
        };

        reader.seek(optional_start + count_offset);
        let directory_count = reader.read_u32()?;
        let resource_directory = if directory_count > RESOURCE_DIRECTORY_INDEX {
            reader.advance(RESOURCE_DIRECTORY_INDEX as usize * std::mem::size_of::<DataDirectory>());
            reader.read_struct::<DataDirectory>()?
        } else {
            DataDirectory::default()
        };

        reader.seek(optional_start + coff.size_of_optional_header as usize);
        let section_count = coff.number_of_sections as usize;
        let mut sections = Vec::with_capacity(section_count);
        for _ in 0..section_count {
            let header: SectionHeader = reader.read_struct()?;
            sections.push(Section::from_header(&header));
        }

        Ok(Self {
            is_pe32_plus,
            sections,
            resource_directory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::build_minimal_pe;

    #[test]
    fn test_parse_minimal_image() {
        let section = vec![0xAAu8; 64];
        let image = PeImage::parse(build_minimal_pe(&section, 0x3000)).unwrap();

        assert!(!image.is_pe32_plus());
        assert!(image.has_resources());
        assert_eq!(image.sections().len(), 1);
        assert_eq!(image.sections()[0].name, ".rsrc");

        let base = image.resource_base().unwrap();
        assert_eq!(image.read(base, 64).unwrap(), &section[..]);
    }

    #[test]
    fn test_rva_translation() {
        let image = PeImage::parse(build_minimal_pe(&[0u8; 16], 0x3000)).unwrap();
        let raw_offset = image.sections()[0].raw_offset as usize;

        assert_eq!(image.rva_to_offset(0x3000), Some(raw_offset));
        assert_eq!(image.rva_to_offset(0x3008), Some(raw_offset + 8));
        assert_eq!(image.rva_to_offset(0x2FFF), None);
        assert_eq!(image.rva_to_offset(0x9000_0000), None);
    }

    #[test]
    fn test_read_bounds() {
        let image = PeImage::parse(build_minimal_pe(&[0u8; 16], 0x3000)).unwrap();
        let len = image.bytes().len();

        assert!(image.can_read(0, len));
        assert!(!image.can_read(0, len + 1));
        assert!(!image.can_read(len, 1));
        assert!(!image.can_read(usize::MAX, 2));
        assert!(image.read(len, 0).is_some());
    }

    #[test]
    fn test_rejects_non_pe() {
        assert!(matches!(
            PeImage::parse(b"ELF....".to_vec()),
            Err(Error::MissingDosSignature)
        ));

        let mut bytes = build_minimal_pe(&[0u8; 16], 0x3000);
        let nt = u32::from_le_bytes(bytes[0x3C..0x40].try_into().unwrap()) as usize;
        bytes[nt] = b'X';
        assert!(matches!(
            PeImage::parse(bytes),
            Err(Error::InvalidPeSignature { .. })
        ));
    }

    #[test]
    fn test_open_mapped_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.dll");
        std::fs::write(&path, build_minimal_pe(&[1u8; 32], 0x2000)).unwrap();

        let image = PeImage::open(&path).unwrap();
        assert_eq!(image.name(), "sample.dll");
        assert!(image.resource_base().is_some());
    }
}
