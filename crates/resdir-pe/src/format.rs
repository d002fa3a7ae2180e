//! On-disk structures of the PE headers and the resource section.
//!
//! All structures are little-endian and read with zerocopy.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// DOS header magic.
pub const DOS_MAGIC: &[u8; 2] = b"MZ";

/// Offset of `e_lfanew` within the DOS header.
pub const DOS_LFANEW_OFFSET: usize = 0x3C;

/// NT header signature.
pub const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";

/// Optional header magic for 32-bit images.
pub const PE32_MAGIC: u16 = 0x10B;

/// Optional header magic for 64-bit images.
pub const PE32_PLUS_MAGIC: u16 = 0x20B;

/// Index of the resource table in the data directory array.
pub const RESOURCE_DIRECTORY_INDEX: u32 = 2;

/// High bit of a directory entry's name or offset field.
pub const HIGH_BIT: u32 = 0x8000_0000;

/// COFF file header, following the `PE\0\0` signature.
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct CoffHeader {
    pub machine: u16,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub pointer_to_symbol_table: u32,
    pub number_of_symbols: u32,
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

/// An entry of the optional header's data directory array.
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

/// A section table entry.
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub pointer_to_relocations: u32,
    pub pointer_to_linenumbers: u32,
    pub number_of_relocations: u16,
    pub number_of_linenumbers: u16,
    pub characteristics: u32,
}

/// `IMAGE_RESOURCE_DIRECTORY`: header of a directory table.
///
/// Followed by `number_of_named_entries + number_of_id_entries`
/// [`RawDirectoryEntry`] records.
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RawResourceDirectory {
    pub characteristics: u32,
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub number_of_named_entries: u16,
    pub number_of_id_entries: u16,
}

/// `IMAGE_RESOURCE_DIRECTORY_ENTRY`.
///
/// The high bit of `name` selects a string name (low 31 bits are an offset
/// from the resource base) over a numeric id. The high bit of
/// `offset_to_data` selects a nested directory over a data entry.
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RawDirectoryEntry {
    pub name: u32,
    pub offset_to_data: u32,
}

/// `IMAGE_RESOURCE_DATA_ENTRY`: describes a payload by RVA and size.
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RawDataEntry {
    pub offset_to_data: u32,
    pub size: u32,
    pub code_page: u32,
    pub reserved: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        assert_eq!(std::mem::size_of::<CoffHeader>(), 20);
        assert_eq!(std::mem::size_of::<DataDirectory>(), 8);
        assert_eq!(std::mem::size_of::<SectionHeader>(), 40);
        assert_eq!(std::mem::size_of::<RawResourceDirectory>(), 16);
        assert_eq!(std::mem::size_of::<RawDirectoryEntry>(), 8);
        assert_eq!(std::mem::size_of::<RawDataEntry>(), 16);
    }
}
