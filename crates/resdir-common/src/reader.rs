//! Bounds-checked cursor over untrusted image bytes.
//!
//! Offsets inside a PE image come from the file itself, so every read made
//! through [`BinaryReader`] is checked against the end of the slice and
//! fails with [`Error::UnexpectedEof`] instead of panicking. The cursor may
//! be placed anywhere, including past the end; only reads are validated.

use zerocopy::FromBytes;

use crate::{Error, Result};

/// Little-endian cursor over a borrowed byte slice.
///
/// # Example
///
/// ```
/// use resdir_common::BinaryReader;
///
/// // Length-prefixed UTF-16 name, as stored in a resource section.
/// let data = [0x02, 0x00, b'O', 0x00, b'K', 0x00];
/// let mut reader = BinaryReader::new(&data);
///
/// let length = reader.read_u16().unwrap();
/// let units = reader.read_utf16_units(length as usize).unwrap();
/// assert_eq!(String::from_utf16_lossy(&units), "OK");
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self::new_at(data, 0)
    }

    /// Start reading at `position`, which is not validated until the first read.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Length of the whole slice, independent of the cursor.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Bytes between the cursor and the end of the slice.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move the cursor to an absolute offset.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Move the cursor forward without reading.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        self.position = self.position.saturating_add(count);
    }

    /// Round the cursor up to a multiple of `alignment` (a power of two).
    #[inline]
    pub fn align(&mut self, alignment: usize) {
        debug_assert!(alignment.is_power_of_two());
        let mask = alignment - 1;
        self.position = self.position.saturating_add(mask) & !mask;
    }

    /// Borrow the next `count` bytes without consuming them.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        self.data
            .get(self.position..)
            .and_then(|rest| rest.get(..count))
            .ok_or(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            })
    }

    /// Borrow the next `count` bytes and consume them.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let taken = self.peek_bytes(count)?;
        self.position += count;
        Ok(taken)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read exactly `count` UTF-16 code units.
    pub fn read_utf16_units(&mut self, count: usize) -> Result<Vec<u16>> {
        let byte_len = count.checked_mul(2).ok_or(Error::OffsetOverflow {
            base: count,
            delta: count,
        })?;
        Ok(self
            .read_bytes(byte_len)?
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Read UTF-16 code units up to a null terminator, which is consumed
    /// but not returned.
    pub fn read_utf16_cstring(&mut self) -> Result<Vec<u16>> {
        let mut units = Vec::new();
        loop {
            match self.read_u16()? {
                0 => return Ok(units),
                unit => units.push(unit),
            }
        }
    }

    /// Copy a fixed-layout record out of the slice.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let needed = std::mem::size_of::<T>();
        let raw = self.read_bytes(needed)?;
        T::read_from_bytes(raw).map_err(|_| Error::UnexpectedEof {
            needed,
            available: raw.len(),
        })
    }

    /// Consume `magic`, failing if the bytes differ.
    pub fn expect_magic(&mut self, magic: &[u8]) -> Result<()> {
        let found = self.read_bytes(magic.len())?;
        if found == magic {
            Ok(())
        } else {
            Err(Error::InvalidMagic {
                expected: magic.to_vec(),
                actual: found.to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_fields() {
        // Resource directory entry: id 3, subdirectory at 0x18.
        let data = [0x03, 0x00, 0x00, 0x00, 0x18, 0x00, 0x00, 0x80, 0x10, 0x00];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u32().unwrap(), 3);
        assert_eq!(reader.read_u32().unwrap(), 0x8000_0018);
        assert_eq!(reader.read_u16().unwrap(), 0x10);
        assert!(reader.is_empty());
        assert!(reader.read_u16().is_err());
    }

    #[test]
    fn test_failed_read_keeps_position() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut reader = BinaryReader::new(&data);

        assert!(matches!(
            reader.read_u32(),
            Err(Error::UnexpectedEof { needed: 4, available: 3 })
        ));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.peek_bytes(2).unwrap(), &[0xAA, 0xBB]);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_position_past_end_is_an_error() {
        let data = [0x01, 0x02];
        let mut reader = BinaryReader::new_at(&data, 100);

        assert!(matches!(
            reader.read_bytes(0),
            Err(Error::UnexpectedEof { available: 0, .. })
        ));
        reader.seek(usize::MAX);
        reader.advance(10);
        assert_eq!(reader.position(), usize::MAX);
        assert!(reader.read_u16().is_err());
    }

    #[test]
    fn test_utf16_reads() {
        let data = [b'H', 0, b'i', 0, 0, 0, b'x', 0];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_utf16_cstring().unwrap(), vec![0x48, 0x69]);
        assert_eq!(reader.position(), 6);

        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_utf16_units(2).unwrap(), vec![0x48, 0x69]);
        assert!(reader.read_utf16_units(3).is_err());
        assert!(reader.read_utf16_units(usize::MAX).is_err());
    }

    #[test]
    fn test_unterminated_cstring() {
        let data = [b'A', 0, b'B', 0];
        assert!(BinaryReader::new(&data).read_utf16_cstring().is_err());
    }

    #[test]
    fn test_align() {
        let data = [0u8; 16];
        let mut reader = BinaryReader::new_at(&data, 38);
        reader.align(4);
        assert_eq!(reader.position(), 40);
        reader.align(4);
        assert_eq!(reader.position(), 40);
    }

    #[test]
    fn test_expect_magic() {
        let mut reader = BinaryReader::new(b"MZ\x90\x00");
        assert!(reader.expect_magic(b"MZ").is_ok());
        assert_eq!(reader.position(), 2);

        let mut reader = BinaryReader::new(b"ZM");
        assert!(matches!(
            reader.expect_magic(b"MZ"),
            Err(Error::InvalidMagic { .. })
        ));
    }
}
