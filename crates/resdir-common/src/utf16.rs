//! UTF-16 to single-byte text conversion.
//!
//! Resource names are stored as UTF-16LE code units. Reports and file names
//! use a single byte per character, so every code unit outside ASCII is
//! replaced with [`REPLACEMENT`]. The output length in bytes always equals
//! the number of code units consumed.

/// Character substituted for code units that have no ASCII equivalent.
pub const REPLACEMENT: char = '?';

/// Convert UTF-16 code units to a single-byte-per-character string.
///
/// At most `max_len` code units are converted.
pub fn to_single_byte(units: &[u16], max_len: usize) -> String {
    units
        .iter()
        .take(max_len)
        .map(|&unit| match u8::try_from(unit) {
            Ok(byte) if byte.is_ascii() => byte as char,
            _ => REPLACEMENT,
        })
        .collect()
}

/// Encode a string as UTF-16LE bytes, without a terminator.
pub fn encode_le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let units: Vec<u16> = "MAINICON".encode_utf16().collect();
        assert_eq!(to_single_byte(&units, usize::MAX), "MAINICON");
    }

    #[test]
    fn test_non_ascii_is_replaced() {
        let units: Vec<u16> = "Ünï€".encode_utf16().collect();
        let text = to_single_byte(&units, usize::MAX);
        assert_eq!(text, "?n??");
        assert_eq!(text.len(), units.len());
    }

    #[test]
    fn test_truncation() {
        let units: Vec<u16> = "ABCDEF".encode_utf16().collect();
        assert_eq!(to_single_byte(&units, 3), "ABC");
        assert_eq!(to_single_byte(&units, 0), "");
    }

    #[test]
    fn test_encode_le() {
        assert_eq!(encode_le("Hi"), vec![b'H', 0, b'i', 0]);
    }
}
