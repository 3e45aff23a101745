// crates/unzip-relay-core/src/testfix.rs
// ============================================================================
// Module: Archive Test Fixtures
// Description: Hand-built ZIP byte streams for decoder and pipeline tests.
// Purpose: Produce well-formed and deliberately broken archives without
//          depending on an archive-writing crate.
// Dependencies: crc32fast, flate2, tokio
// ============================================================================

//! ## Overview
//! Test-only helpers that assemble ZIP byte streams record by record:
//! stored and deflate entries, streaming-mode entries with data
//! descriptors, directory markers, and a lazily generated large archive for
//! memory-bound assertions.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only fixture construction may panic on programmer error."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use flate2::Compression;
use flate2::write::DeflateEncoder;
use tokio::io::AsyncRead;
use tokio::io::ReadBuf;

// ============================================================================
// SECTION: Byte Helpers
// ============================================================================

/// Computes the CRC-32 of a byte slice.
pub(crate) fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Compresses bytes with raw deflate.
pub(crate) fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("deflate write");
    encoder.finish().expect("deflate finish")
}

// ============================================================================
// SECTION: Archive Builder
// ============================================================================

/// Record of one written entry, used to emit the central directory.
struct CentralRecord {
    /// Entry name.
    name: Vec<u8>,
    /// General-purpose flags.
    flags: u16,
    /// Compression method code.
    method: u16,
    /// CRC-32 of the uncompressed body.
    crc: u32,
    /// Compressed size.
    compressed: u32,
    /// Uncompressed size.
    uncompressed: u32,
    /// Offset of the local file header.
    offset: u32,
}

/// Incremental ZIP byte-stream builder.
pub(crate) struct ZipBuilder {
    /// Entry records written so far.
    bytes: Vec<u8>,
    /// Central directory records pending emission.
    central: Vec<CentralRecord>,
}

impl ZipBuilder {
    /// Creates an empty builder.
    pub(crate) fn new() -> Self {
        Self {
            bytes: Vec::new(),
            central: Vec::new(),
        }
    }

    /// Appends a fully custom local record (used for corrupt archives).
    pub(crate) fn raw_entry(
        mut self,
        name: &str,
        flags: u16,
        method: u16,
        crc: u32,
        compressed_size: u32,
        uncompressed_size: u32,
        body: &[u8],
    ) -> Self {
        let offset = u32::try_from(self.bytes.len()).expect("fixture offset");
        self.push_local_header(name, flags, method, crc, compressed_size, uncompressed_size);
        self.bytes.extend_from_slice(body);
        self.central.push(CentralRecord {
            name: name.as_bytes().to_vec(),
            flags,
            method,
            crc,
            compressed: compressed_size,
            uncompressed: uncompressed_size,
            offset,
        });
        self
    }

    /// Appends a stored (method 0) file entry.
    pub(crate) fn stored_entry(self, name: &str, data: &[u8]) -> Self {
        let size = u32::try_from(data.len()).expect("fixture size");
        self.raw_entry(name, 0, 0, crc32(data), size, size, data)
    }

    /// Appends a stored entry with a deliberately wrong checksum.
    pub(crate) fn stored_entry_with_crc(self, name: &str, data: &[u8], crc: u32) -> Self {
        let size = u32::try_from(data.len()).expect("fixture size");
        self.raw_entry(name, 0, 0, crc, size, size, data)
    }

    /// Appends a deflate (method 8) file entry with up-front sizes.
    pub(crate) fn deflate_entry(self, name: &str, data: &[u8]) -> Self {
        let compressed = deflate(data);
        self.raw_entry(
            name,
            0,
            8,
            crc32(data),
            u32::try_from(compressed.len()).expect("fixture size"),
            u32::try_from(data.len()).expect("fixture size"),
            &compressed,
        )
    }

    /// Appends a streaming-mode deflate entry: zeroed header sizes, data
    /// descriptor (with signature) after the body.
    pub(crate) fn streamed_deflate_entry(mut self, name: &str, data: &[u8]) -> Self {
        let compressed = deflate(data);
        let crc = crc32(data);
        let compressed_len = u32::try_from(compressed.len()).expect("fixture size");
        let uncompressed_len = u32::try_from(data.len()).expect("fixture size");
        let offset = u32::try_from(self.bytes.len()).expect("fixture offset");
        self.push_local_header(name, 0x0008, 8, 0, 0, 0);
        self.bytes.extend_from_slice(&compressed);
        self.bytes.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
        self.bytes.extend_from_slice(&crc.to_le_bytes());
        self.bytes.extend_from_slice(&compressed_len.to_le_bytes());
        self.bytes.extend_from_slice(&uncompressed_len.to_le_bytes());
        self.central.push(CentralRecord {
            name: name.as_bytes().to_vec(),
            flags: 0x0008,
            method: 8,
            crc,
            compressed: compressed_len,
            uncompressed: uncompressed_len,
            offset,
        });
        self
    }

    /// Appends a directory marker entry.
    pub(crate) fn directory(self, name: &str) -> Self {
        self.raw_entry(name, 0, 0, 0, 0, 0, &[])
    }

    /// Appends a streaming-mode directory marker with a zeroed descriptor.
    pub(crate) fn streamed_directory(mut self, name: &str) -> Self {
        let offset = u32::try_from(self.bytes.len()).expect("fixture offset");
        self.push_local_header(name, 0x0008, 0, 0, 0, 0);
        self.bytes.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
        self.bytes.extend_from_slice(&0u32.to_le_bytes());
        self.bytes.extend_from_slice(&0u32.to_le_bytes());
        self.bytes.extend_from_slice(&0u32.to_le_bytes());
        self.central.push(CentralRecord {
            name: name.as_bytes().to_vec(),
            flags: 0x0008,
            method: 0,
            crc: 0,
            compressed: 0,
            uncompressed: 0,
            offset,
        });
        self
    }

    /// Finishes the archive with a central directory and end record.
    pub(crate) fn build(mut self) -> Vec<u8> {
        let central_offset = u32::try_from(self.bytes.len()).expect("fixture offset");
        let entry_count = u16::try_from(self.central.len()).expect("fixture count");
        for record in &self.central {
            self.bytes.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
            self.bytes.extend_from_slice(&20u16.to_le_bytes());
            self.bytes.extend_from_slice(&20u16.to_le_bytes());
            self.bytes.extend_from_slice(&record.flags.to_le_bytes());
            self.bytes.extend_from_slice(&record.method.to_le_bytes());
            self.bytes.extend_from_slice(&0u16.to_le_bytes());
            self.bytes.extend_from_slice(&0u16.to_le_bytes());
            self.bytes.extend_from_slice(&record.crc.to_le_bytes());
            self.bytes.extend_from_slice(&record.compressed.to_le_bytes());
            self.bytes.extend_from_slice(&record.uncompressed.to_le_bytes());
            self.bytes
                .extend_from_slice(&u16::try_from(record.name.len()).expect("name").to_le_bytes());
            self.bytes.extend_from_slice(&0u16.to_le_bytes());
            self.bytes.extend_from_slice(&0u16.to_le_bytes());
            self.bytes.extend_from_slice(&0u16.to_le_bytes());
            self.bytes.extend_from_slice(&0u16.to_le_bytes());
            self.bytes.extend_from_slice(&0u32.to_le_bytes());
            self.bytes.extend_from_slice(&record.offset.to_le_bytes());
            self.bytes.extend_from_slice(&record.name);
        }
        let central_size = u32::try_from(self.bytes.len()).expect("fixture offset") - central_offset;
        self.bytes.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        self.bytes.extend_from_slice(&0u16.to_le_bytes());
        self.bytes.extend_from_slice(&0u16.to_le_bytes());
        self.bytes.extend_from_slice(&entry_count.to_le_bytes());
        self.bytes.extend_from_slice(&entry_count.to_le_bytes());
        self.bytes.extend_from_slice(&central_size.to_le_bytes());
        self.bytes.extend_from_slice(&central_offset.to_le_bytes());
        self.bytes.extend_from_slice(&0u16.to_le_bytes());
        self.bytes
    }

    /// Returns the entry records only, without a central directory.
    pub(crate) fn build_without_central(self) -> Vec<u8> {
        self.bytes
    }

    /// Writes a local file header.
    fn push_local_header(
        &mut self,
        name: &str,
        flags: u16,
        method: u16,
        crc: u32,
        compressed_size: u32,
        uncompressed_size: u32,
    ) {
        self.bytes.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        self.bytes.extend_from_slice(&20u16.to_le_bytes());
        self.bytes.extend_from_slice(&flags.to_le_bytes());
        self.bytes.extend_from_slice(&method.to_le_bytes());
        self.bytes.extend_from_slice(&0u16.to_le_bytes());
        self.bytes.extend_from_slice(&0u16.to_le_bytes());
        self.bytes.extend_from_slice(&crc.to_le_bytes());
        self.bytes.extend_from_slice(&compressed_size.to_le_bytes());
        self.bytes.extend_from_slice(&uncompressed_size.to_le_bytes());
        self.bytes
            .extend_from_slice(&u16::try_from(name.len()).expect("name length").to_le_bytes());
        self.bytes.extend_from_slice(&0u16.to_le_bytes());
        self.bytes.extend_from_slice(name.as_bytes());
    }
}

// ============================================================================
// SECTION: Synthetic Large Archive
// ============================================================================

/// Lazily generated archive holding one large stored entry of zero bytes.
///
/// The body is produced on demand so tests can stream multi-mebibyte
/// entries without materializing them.
pub(crate) struct SyntheticStoredArchive {
    /// Header bytes served first.
    prefix: Vec<u8>,
    /// Read position within the prefix.
    prefix_pos: usize,
    /// Zero body bytes still to serve.
    body_remaining: u64,
    /// Trailing bytes (end-of-central-directory) served last.
    suffix: Vec<u8>,
    /// Read position within the suffix.
    suffix_pos: usize,
}

impl SyntheticStoredArchive {
    /// Builds an archive with one stored entry of `size` zero bytes.
    pub(crate) fn new(name: &str, size: u64) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        let zeros = [0u8; 8192];
        let mut remaining = size;
        while remaining > 0 {
            let take = usize::try_from(remaining.min(8192)).expect("chunk");
            hasher.update(&zeros[.. take]);
            remaining -= u64::try_from(take).expect("chunk");
        }
        let crc = hasher.finalize();
        let size32 = u32::try_from(size).expect("entry size fits 32 bits");
        let mut prefix = Vec::new();
        prefix.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        prefix.extend_from_slice(&20u16.to_le_bytes());
        prefix.extend_from_slice(&0u16.to_le_bytes());
        prefix.extend_from_slice(&0u16.to_le_bytes());
        prefix.extend_from_slice(&0u16.to_le_bytes());
        prefix.extend_from_slice(&0u16.to_le_bytes());
        prefix.extend_from_slice(&crc.to_le_bytes());
        prefix.extend_from_slice(&size32.to_le_bytes());
        prefix.extend_from_slice(&size32.to_le_bytes());
        prefix.extend_from_slice(&u16::try_from(name.len()).expect("name").to_le_bytes());
        prefix.extend_from_slice(&0u16.to_le_bytes());
        prefix.extend_from_slice(name.as_bytes());
        let mut suffix = Vec::new();
        suffix.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        suffix.extend_from_slice(&[0u8; 16]);
        suffix.extend_from_slice(&0u16.to_le_bytes());
        Self {
            prefix,
            prefix_pos: 0,
            body_remaining: size,
            suffix,
            suffix_pos: 0,
        }
    }
}

impl AsyncRead for SyntheticStoredArchive {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        if this.prefix_pos < this.prefix.len() {
            let take = buf.remaining().min(this.prefix.len() - this.prefix_pos);
            buf.put_slice(&this.prefix[this.prefix_pos .. this.prefix_pos + take]);
            this.prefix_pos += take;
            return Poll::Ready(Ok(()));
        }
        if this.body_remaining > 0 {
            let take =
                usize::try_from(this.body_remaining.min(8192)).expect("chunk").min(buf.remaining());
            let zeros = [0u8; 8192];
            buf.put_slice(&zeros[.. take]);
            this.body_remaining -= u64::try_from(take).expect("chunk");
            return Poll::Ready(Ok(()));
        }
        if this.suffix_pos < this.suffix.len() {
            let take = buf.remaining().min(this.suffix.len() - this.suffix_pos);
            buf.put_slice(&this.suffix[this.suffix_pos .. this.suffix_pos + take]);
            this.suffix_pos += take;
        }
        Poll::Ready(Ok(()))
    }
}
