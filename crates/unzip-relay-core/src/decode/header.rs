// crates/unzip-relay-core/src/decode/header.rs
// ============================================================================
// Module: Archive Record Headers
// Description: Raw ZIP record signatures and local file header parsing.
// Purpose: Decode fixed-layout header fields from untrusted archive bytes.
// Dependencies: none
// ============================================================================

//! ## Overview
//! ZIP archives store entries sequentially: each entry starts with a local
//! file header, followed by the (possibly compressed) body, optionally
//! followed by a data descriptor when sizes were deferred. The central
//! directory trails the last entry and marks the end of the entry sequence
//! for a forward-only reader. All fields are little-endian.
//! Invariants:
//! - Parsers never read past the slices they are handed.
//! - ZIP64 extension parsing only overrides fields that are saturated.

// ============================================================================
// SECTION: Signatures
// ============================================================================

/// Signature preceding each local file header (`PK\x03\x04`).
pub(crate) const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
/// Signature of a central directory file header (`PK\x01\x02`).
pub(crate) const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
/// Signature of the end-of-central-directory record (`PK\x05\x06`).
pub(crate) const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
/// Signature of the ZIP64 end-of-central-directory record (`PK\x06\x06`).
pub(crate) const ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0606_4b50;
/// Signature of the ZIP64 end-of-central-directory locator (`PK\x06\x07`).
pub(crate) const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
/// Optional signature preceding a data descriptor (`PK\x07\x08`).
pub(crate) const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// Length of the fixed local file header portion after its signature.
pub(crate) const LOCAL_FILE_HEADER_LEN: usize = 26;

// ============================================================================
// SECTION: Flags
// ============================================================================

/// General-purpose flag: entry body is encrypted.
pub(crate) const FLAG_ENCRYPTED: u16 = 0x0001;
/// General-purpose flag: sizes and CRC are deferred to a data descriptor.
pub(crate) const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Extra-field identifier for the ZIP64 extended information record.
const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

// ============================================================================
// SECTION: Compression Method
// ============================================================================

/// Compression methods this decoder can stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompressionMethod {
    /// Method 0: bytes are stored without compression.
    Stored,
    /// Method 8: raw deflate.
    Deflate,
}

impl CompressionMethod {
    /// Maps a wire method code to a supported method.
    pub(crate) const fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Stored),
            8 => Some(Self::Deflate),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Local File Header
// ============================================================================

/// Parsed local file header fields.
#[derive(Debug, Clone)]
pub(crate) struct LocalFileHeader {
    /// General-purpose bit flags.
    pub flags: u16,
    /// Compression method code.
    pub method: u16,
    /// CRC-32 of the uncompressed body (zero when deferred).
    pub crc32: u32,
    /// Compressed body size in bytes (possibly ZIP64-extended).
    pub compressed_size: u64,
    /// Uncompressed body size in bytes (possibly ZIP64-extended).
    pub uncompressed_size: u64,
    /// Length of the entry name that follows the fixed header.
    pub name_len: usize,
    /// Length of the extra-field block that follows the entry name.
    pub extra_len: usize,
    /// True when a ZIP64 extended information field was applied.
    pub zip64: bool,
}

/// Reads a little-endian `u16` at a fixed offset.
fn u16_at(bytes: &[u8; LOCAL_FILE_HEADER_LEN], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

/// Reads a little-endian `u32` at a fixed offset.
fn u32_at(bytes: &[u8; LOCAL_FILE_HEADER_LEN], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

/// Parses the fixed portion of a local file header (signature excluded).
///
/// Field layout: version-needed (2), flags (2), method (2), mod-time (2),
/// mod-date (2), crc-32 (4), compressed size (4), uncompressed size (4),
/// name length (2), extra length (2).
pub(crate) fn parse_local_file_header(bytes: &[u8; LOCAL_FILE_HEADER_LEN]) -> LocalFileHeader {
    LocalFileHeader {
        flags: u16_at(bytes, 2),
        method: u16_at(bytes, 4),
        crc32: u32_at(bytes, 10),
        compressed_size: u64::from(u32_at(bytes, 14)),
        uncompressed_size: u64::from(u32_at(bytes, 18)),
        name_len: usize::from(u16_at(bytes, 22)),
        extra_len: usize::from(u16_at(bytes, 24)),
        zip64: false,
    }
}

/// Applies a ZIP64 extended information field to saturated size fields.
///
/// The ZIP64 record stores the uncompressed size first, then the compressed
/// size, and each value is present only when the corresponding 32-bit field
/// is saturated. Malformed or short records are ignored; the header keeps
/// its 32-bit values and downstream size verification catches lies.
pub(crate) fn apply_zip64_extra(header: &mut LocalFileHeader, extra: &[u8]) {
    let saturated = u64::from(u32::MAX);
    if header.compressed_size != saturated && header.uncompressed_size != saturated {
        return;
    }
    let mut cursor = 0usize;
    while let Some(field_header) = extra.get(cursor .. cursor + 4) {
        let field_id = u16::from_le_bytes([field_header[0], field_header[1]]);
        let field_len = usize::from(u16::from_le_bytes([field_header[2], field_header[3]]));
        let Some(data) = extra.get(cursor + 4 .. cursor + 4 + field_len) else {
            return;
        };
        if field_id == ZIP64_EXTRA_FIELD_ID {
            let mut offset = 0usize;
            if header.uncompressed_size == saturated {
                let Some(value) = read_u64_le(data, offset) else {
                    return;
                };
                header.uncompressed_size = value;
                offset += 8;
            }
            if header.compressed_size == saturated {
                let Some(value) = read_u64_le(data, offset) else {
                    return;
                };
                header.compressed_size = value;
            }
            header.zip64 = true;
            return;
        }
        cursor += 4 + field_len;
    }
}

/// Reads a little-endian `u64` at an offset, when enough bytes remain.
fn read_u64_le(bytes: &[u8], offset: usize) -> Option<u64> {
    let slice = bytes.get(offset .. offset + 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(slice);
    Some(u64::from_le_bytes(raw))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::CompressionMethod;
    use super::LOCAL_FILE_HEADER_LEN;
    use super::apply_zip64_extra;
    use super::parse_local_file_header;

    /// Builds a fixed header block for tests.
    fn fixed_header(
        flags: u16,
        method: u16,
        crc: u32,
        compressed: u32,
        uncompressed: u32,
        name_len: u16,
        extra_len: u16,
    ) -> [u8; LOCAL_FILE_HEADER_LEN] {
        let mut bytes = [0u8; LOCAL_FILE_HEADER_LEN];
        bytes[0 .. 2].copy_from_slice(&20u16.to_le_bytes());
        bytes[2 .. 4].copy_from_slice(&flags.to_le_bytes());
        bytes[4 .. 6].copy_from_slice(&method.to_le_bytes());
        bytes[10 .. 14].copy_from_slice(&crc.to_le_bytes());
        bytes[14 .. 18].copy_from_slice(&compressed.to_le_bytes());
        bytes[18 .. 22].copy_from_slice(&uncompressed.to_le_bytes());
        bytes[22 .. 24].copy_from_slice(&name_len.to_le_bytes());
        bytes[24 .. 26].copy_from_slice(&extra_len.to_le_bytes());
        bytes
    }

    #[test]
    fn parses_fixed_fields() {
        let header = parse_local_file_header(&fixed_header(0x0008, 8, 0xdead_beef, 10, 20, 5, 4));
        assert_eq!(header.flags, 0x0008);
        assert_eq!(header.method, 8);
        assert_eq!(header.crc32, 0xdead_beef);
        assert_eq!(header.compressed_size, 10);
        assert_eq!(header.uncompressed_size, 20);
        assert_eq!(header.name_len, 5);
        assert_eq!(header.extra_len, 4);
        assert!(!header.zip64);
    }

    #[test]
    fn method_codes_map_to_supported_methods() {
        assert_eq!(CompressionMethod::from_code(0), Some(CompressionMethod::Stored));
        assert_eq!(CompressionMethod::from_code(8), Some(CompressionMethod::Deflate));
        assert_eq!(CompressionMethod::from_code(12), None);
    }

    #[test]
    fn zip64_extra_overrides_saturated_sizes() {
        let mut header =
            parse_local_file_header(&fixed_header(0, 0, 0, u32::MAX, u32::MAX, 1, 20));
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x0001u16.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&0x1_0000_0001u64.to_le_bytes());
        extra.extend_from_slice(&0x1_0000_0001u64.to_le_bytes());
        apply_zip64_extra(&mut header, &extra);
        assert!(header.zip64);
        assert_eq!(header.uncompressed_size, 0x1_0000_0001);
        assert_eq!(header.compressed_size, 0x1_0000_0001);
    }

    #[test]
    fn zip64_extra_is_skipped_for_unsaturated_sizes() {
        let mut header = parse_local_file_header(&fixed_header(0, 0, 0, 10, 10, 1, 0));
        apply_zip64_extra(&mut header, &[]);
        assert!(!header.zip64);
        assert_eq!(header.compressed_size, 10);
    }

    #[test]
    fn unrelated_extra_fields_are_walked_over() {
        let mut header = parse_local_file_header(&fixed_header(0, 0, 0, u32::MAX, 7, 1, 0));
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x5455u16.to_le_bytes());
        extra.extend_from_slice(&1u16.to_le_bytes());
        extra.push(0);
        extra.extend_from_slice(&0x0001u16.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&123u64.to_le_bytes());
        apply_zip64_extra(&mut header, &extra);
        assert!(header.zip64);
        assert_eq!(header.compressed_size, 123);
        assert_eq!(header.uncompressed_size, 7);
    }

    #[test]
    fn truncated_zip64_extra_is_ignored() {
        let mut header = parse_local_file_header(&fixed_header(0, 0, 0, u32::MAX, 7, 1, 0));
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x0001u16.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&[1, 2, 3]);
        apply_zip64_extra(&mut header, &extra);
        assert!(!header.zip64);
        assert_eq!(header.compressed_size, u64::from(u32::MAX));
    }
}
