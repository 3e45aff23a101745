// crates/unzip-relay-core/src/decode/mod.rs
// ============================================================================
// Module: Archive Entry Decoder
// Description: Streaming ZIP decoder over a forward-only byte source.
// Purpose: Yield archive entries lazily without materializing bodies.
// Dependencies: crc32fast, flate2, tokio
// ============================================================================

//! ## Overview
//! [`ZipEntryDecoder`] turns a forward-only byte stream into a lazy sequence
//! of archive entries. Entries are stored sequentially with no independent
//! framing a consumer could skip without reading through it, so exactly one
//! entry is open at a time and skipping is discard-read, never seek. Calling
//! [`ZipEntryDecoder::next_entry`] before the previous entry is fully
//! consumed auto-drains the remainder.
//! Invariants:
//! - All source reads go through one fixed-size internal buffer; memory is
//!   bounded by a small constant times the chunk size regardless of archive
//!   or entry size.
//! - A central-directory record or clean end of stream terminates the
//!   sequence normally; everything else that does not parse is a
//!   [`DecodeError`].
//!
//! Security posture: archive bytes are untrusted; header fields are treated
//! as claims and verified against observed byte counts and checksums.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod header;
mod inflate;

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

use crate::core::EntryKind;
use crate::core::EntryMetadata;
use crate::decode::header::CompressionMethod;
use crate::decode::header::DATA_DESCRIPTOR_SIGNATURE;
use crate::decode::header::FLAG_DATA_DESCRIPTOR;
use crate::decode::header::FLAG_ENCRYPTED;
use crate::decode::header::LOCAL_FILE_HEADER_LEN;
use crate::decode::header::LOCAL_FILE_HEADER_SIGNATURE;
use crate::decode::inflate::InflateState;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default internal chunk size for source reads and drain copies.
pub const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;
/// Smallest accepted chunk size.
const MIN_CHUNK_BYTES: usize = 4 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Archive decoding errors.
///
/// # Invariants
/// - Every variant is permanent for the archive: redecoding the same bytes
///   fails the same way.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bytes at a record boundary matched no known signature.
    #[error("unrecognized record signature {signature:#010x}")]
    BadSignature {
        /// The four bytes read, as a little-endian value.
        signature: u32,
    },
    /// The archive stream ended inside a header or descriptor.
    #[error("archive stream truncated")]
    TruncatedStream,
    /// An entry body ended before its declared size was reached.
    #[error("entry body truncated: {path}")]
    TruncatedEntry {
        /// Path of the truncated entry.
        path: String,
    },
    /// Entry uses a compression method this decoder does not support.
    #[error("unsupported compression method {method} for entry {path}")]
    UnsupportedMethod {
        /// Path of the offending entry.
        path: String,
        /// Wire method code.
        method: u16,
    },
    /// Entry body is encrypted; encrypted archives are unsupported.
    #[error("encrypted entry not supported: {path}")]
    EncryptedEntry {
        /// Path of the offending entry.
        path: String,
    },
    /// Stored entry deferred its sizes to a data descriptor; a forward-only
    /// reader cannot frame such a body.
    #[error("stored entry with deferred sizes cannot be streamed: {path}")]
    UnframeableEntry {
        /// Path of the offending entry.
        path: String,
    },
    /// Deflate body was malformed.
    #[error("invalid deflate data in entry {path}: {detail}")]
    InvalidDeflate {
        /// Path of the offending entry.
        path: String,
        /// Decompressor error detail.
        detail: String,
    },
    /// Declared sizes disagree with the observed byte counts.
    #[error("declared sizes disagree with entry body: {path}")]
    InconsistentSizes {
        /// Path of the offending entry.
        path: String,
    },
    /// Decoded bytes do not match the declared checksum.
    #[error("checksum mismatch for entry {path} (expected {expected:#010x}, got {actual:#010x})")]
    ChecksumMismatch {
        /// Path of the offending entry.
        path: String,
        /// Checksum declared by the archive.
        expected: u32,
        /// Checksum computed over decoded bytes.
        actual: u32,
    },
    /// Entry path bytes were not valid UTF-8.
    #[error("entry path is not valid utf-8")]
    InvalidPath,
    /// Underlying source read failed.
    #[error("source read failed: {0}")]
    Io(String),
}

impl DecodeError {
    /// Returns the offending entry path when the error carries one.
    #[must_use]
    pub fn entry_path(&self) -> Option<&str> {
        match self {
            Self::TruncatedEntry {
                path,
            }
            | Self::UnsupportedMethod {
                path, ..
            }
            | Self::EncryptedEntry {
                path,
            }
            | Self::UnframeableEntry {
                path,
            }
            | Self::InvalidDeflate {
                path, ..
            }
            | Self::InconsistentSizes {
                path,
            }
            | Self::ChecksumMismatch {
                path, ..
            } => Some(path),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Entry Progress
// ============================================================================

/// Decode state for the currently open entry.
struct EntryProgress {
    /// Entry metadata exposed to consumers.
    metadata: EntryMetadata,
    /// Compression method of the body.
    method: CompressionMethod,
    /// True when sizes and CRC are deferred to a data descriptor.
    has_descriptor: bool,
    /// True when the local header carried a ZIP64 extension.
    zip64: bool,
    /// CRC declared up front, when not deferred.
    expected_crc: Option<u32>,
    /// Compressed size declared up front, when not deferred.
    declared_compressed: Option<u64>,
    /// Uncompressed size declared up front, when not deferred.
    declared_uncompressed: Option<u64>,
    /// Running checksum over decoded bytes.
    crc: crc32fast::Hasher,
    /// Inflate state for deflate bodies.
    inflate: Option<InflateState>,
    /// Compressed bytes consumed so far.
    compressed_consumed: u64,
    /// Decoded bytes produced so far.
    uncompressed_produced: u64,
    /// True once the body has been fully produced.
    body_done: bool,
    /// True once the trailing descriptor and checksum were verified.
    completed: bool,
}

// ============================================================================
// SECTION: Decoder
// ============================================================================

/// Streaming decoder yielding archive entries from a forward-only source.
///
/// Advancing to the next entry auto-drains any unread remainder of the
/// current one; the borrow checker prevents interleaved use of two entries.
pub struct ZipEntryDecoder<R> {
    /// Underlying forward-only byte source.
    reader: R,
    /// Fixed-size read buffer.
    buf: Vec<u8>,
    /// Offset of the first unconsumed buffered byte.
    start: usize,
    /// Offset one past the last buffered byte.
    end: usize,
    /// True once the source reported end of stream.
    eof: bool,
    /// True once the entry sequence terminated normally.
    finished: bool,
    /// State of the currently open entry.
    current: Option<EntryProgress>,
    /// Scratch buffer reused for discard-reads.
    drain_buf: Vec<u8>,
}

impl<R> ZipEntryDecoder<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Creates a decoder with the default chunk size.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_BYTES)
    }

    /// Creates a decoder with an explicit chunk size (floored at 4 KiB).
    #[must_use]
    pub fn with_chunk_size(reader: R, chunk_bytes: usize) -> Self {
        let chunk = chunk_bytes.max(MIN_CHUNK_BYTES);
        Self {
            reader,
            buf: vec![0u8; chunk],
            start: 0,
            end: 0,
            eof: false,
            finished: false,
            current: None,
            drain_buf: vec![0u8; chunk],
        }
    }

    /// Advances to the next entry, draining the current one if needed.
    ///
    /// Returns `None` when the entry sequence terminated normally (central
    /// directory reached or the stream ended cleanly).
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for malformed headers, unsupported bodies,
    /// truncation, or checksum mismatches.
    pub async fn next_entry(&mut self) -> Result<Option<ZipEntry<'_, R>>, DecodeError> {
        self.finish_current_entry().await?;
        if self.finished {
            return Ok(None);
        }
        let Some(signature) = self.read_signature().await? else {
            self.finished = true;
            return Ok(None);
        };
        match signature {
            LOCAL_FILE_HEADER_SIGNATURE => {
                let progress = self.read_local_header().await?;
                let metadata = progress.metadata.clone();
                self.current = Some(progress);
                Ok(Some(ZipEntry {
                    decoder: self,
                    metadata,
                }))
            }
            header::CENTRAL_DIRECTORY_SIGNATURE
            | header::END_OF_CENTRAL_DIRECTORY_SIGNATURE
            | header::ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE
            | header::ZIP64_LOCATOR_SIGNATURE => {
                self.finished = true;
                Ok(None)
            }
            signature => Err(DecodeError::BadSignature {
                signature,
            }),
        }
    }

    /// Drains and completes the open entry, if any.
    async fn finish_current_entry(&mut self) -> Result<(), DecodeError> {
        let Some(progress) = &self.current else {
            return Ok(());
        };
        if progress.completed {
            self.current = None;
            return Ok(());
        }
        let mut drain = std::mem::take(&mut self.drain_buf);
        let result = async {
            loop {
                let read = self.read_entry_chunk(&mut drain).await?;
                if read == 0 {
                    return Ok(());
                }
            }
        }
        .await;
        self.drain_buf = drain;
        self.current = None;
        result
    }

    /// Reads decoded bytes of the open entry into `out`.
    ///
    /// Returns zero once the body is complete (and its trailing descriptor
    /// and checksum verified) or when `out` is empty.
    pub(crate) async fn read_entry_chunk(&mut self, out: &mut [u8]) -> Result<usize, DecodeError> {
        let Some(mut progress) = self.current.take() else {
            return Ok(0);
        };
        let result = self.entry_chunk_inner(&mut progress, out).await;
        self.current = Some(progress);
        result
    }

    /// Body read dispatch for the open entry.
    async fn entry_chunk_inner(
        &mut self,
        progress: &mut EntryProgress,
        out: &mut [u8],
    ) -> Result<usize, DecodeError> {
        if out.is_empty() || progress.completed {
            return Ok(0);
        }
        if progress.body_done {
            self.complete_entry(progress).await?;
            return Ok(0);
        }
        match progress.method {
            CompressionMethod::Stored => self.stored_chunk(progress, out).await,
            CompressionMethod::Deflate => self.deflate_chunk(progress, out).await,
        }
    }

    /// Copies stored bytes straight through.
    async fn stored_chunk(
        &mut self,
        progress: &mut EntryProgress,
        out: &mut [u8],
    ) -> Result<usize, DecodeError> {
        let declared = progress.declared_compressed.unwrap_or(0);
        let remaining = declared.saturating_sub(progress.compressed_consumed);
        if remaining == 0 {
            progress.body_done = true;
            self.complete_entry(progress).await?;
            return Ok(0);
        }
        if !self.fill_buf().await? {
            return Err(DecodeError::TruncatedEntry {
                path: progress.metadata.relative_path.clone(),
            });
        }
        let available = self.end - self.start;
        let take = clamp_to_usize(remaining, out.len().min(available));
        out[.. take].copy_from_slice(&self.buf[self.start .. self.start + take]);
        self.start += take;
        progress.crc.update(&out[.. take]);
        progress.compressed_consumed += as_u64(take);
        progress.uncompressed_produced += as_u64(take);
        Ok(take)
    }

    /// Inflates deflate bytes into `out`.
    ///
    /// Steps with an empty input slice are deliberate: the decompressor can
    /// still drain pending window output after the declared compressed bytes
    /// are fully consumed.
    async fn deflate_chunk(
        &mut self,
        progress: &mut EntryProgress,
        out: &mut [u8],
    ) -> Result<usize, DecodeError> {
        loop {
            let limit = progress
                .declared_compressed
                .map(|declared| declared.saturating_sub(progress.compressed_consumed));
            if limit != Some(0) && self.start == self.end {
                let _ = self.fill_buf().await?;
            }
            let available = self.end - self.start;
            let input_len = limit.map_or(available, |limit| clamp_to_usize(limit, available));
            let Some(inflate) = progress.inflate.as_mut() else {
                return Err(DecodeError::InvalidDeflate {
                    path: progress.metadata.relative_path.clone(),
                    detail: "missing inflate state".to_string(),
                });
            };
            let step = inflate
                .step(&self.buf[self.start .. self.start + input_len], out)
                .map_err(|detail| DecodeError::InvalidDeflate {
                    path: progress.metadata.relative_path.clone(),
                    detail,
                })?;
            self.start += step.consumed;
            progress.compressed_consumed += as_u64(step.consumed);
            progress.uncompressed_produced += as_u64(step.produced);
            progress.crc.update(&out[.. step.produced]);
            if step.finished {
                progress.body_done = true;
                if step.produced > 0 {
                    return Ok(step.produced);
                }
                self.complete_entry(progress).await?;
                return Ok(0);
            }
            if step.produced > 0 {
                return Ok(step.produced);
            }
            if step.consumed == 0 {
                if limit == Some(0) {
                    return Err(DecodeError::InvalidDeflate {
                        path: progress.metadata.relative_path.clone(),
                        detail: "compressed data ended before the stream end marker".to_string(),
                    });
                }
                if self.eof && self.start == self.end {
                    return Err(DecodeError::TruncatedEntry {
                        path: progress.metadata.relative_path.clone(),
                    });
                }
                if input_len > 0 {
                    return Err(DecodeError::InvalidDeflate {
                        path: progress.metadata.relative_path.clone(),
                        detail: "decompressor made no progress".to_string(),
                    });
                }
            }
        }
    }

    /// Consumes the trailing descriptor and verifies sizes and checksum.
    async fn complete_entry(&mut self, progress: &mut EntryProgress) -> Result<(), DecodeError> {
        if progress.completed {
            return Ok(());
        }
        let path = progress.metadata.relative_path.clone();
        if progress.has_descriptor {
            let (crc, compressed, uncompressed) = self
                .read_data_descriptor(
                    progress.zip64,
                    progress.compressed_consumed,
                    progress.uncompressed_produced,
                )
                .await?;
            if compressed != progress.compressed_consumed
                || uncompressed != progress.uncompressed_produced
            {
                return Err(DecodeError::InconsistentSizes {
                    path,
                });
            }
            progress.expected_crc = Some(crc);
        } else {
            if progress.declared_compressed != Some(progress.compressed_consumed) {
                return Err(DecodeError::InconsistentSizes {
                    path,
                });
            }
            if progress.declared_uncompressed != Some(progress.uncompressed_produced) {
                return Err(DecodeError::InconsistentSizes {
                    path,
                });
            }
        }
        let actual = progress.crc.clone().finalize();
        if let Some(expected) = progress.expected_crc
            && expected != actual
        {
            return Err(DecodeError::ChecksumMismatch {
                path,
                expected,
                actual,
            });
        }
        progress.completed = true;
        Ok(())
    }

    /// Reads a data descriptor, tolerating the optional signature and both
    /// the 32-bit and ZIP64 forms.
    ///
    /// A CRC that happens to equal the descriptor signature is
    /// indistinguishable from the optional marker; the size verification
    /// disambiguates in practice.
    async fn read_data_descriptor(
        &mut self,
        zip64: bool,
        consumed: u64,
        produced: u64,
    ) -> Result<(u32, u64, u64), DecodeError> {
        let mut word = [0u8; 4];
        self.read_exact(&mut word).await?;
        let mut crc = u32::from_le_bytes(word);
        if crc == DATA_DESCRIPTOR_SIGNATURE {
            self.read_exact(&mut word).await?;
            crc = u32::from_le_bytes(word);
        }
        let mut sizes = [0u8; 8];
        self.read_exact(&mut sizes).await?;
        if !zip64 {
            let compressed = u64::from(u32::from_le_bytes([
                sizes[0], sizes[1], sizes[2], sizes[3],
            ]));
            let uncompressed = u64::from(u32::from_le_bytes([
                sizes[4], sizes[5], sizes[6], sizes[7],
            ]));
            if compressed == consumed && uncompressed == produced {
                return Ok((crc, compressed, uncompressed));
            }
        }
        let compressed = u64::from_le_bytes(sizes);
        let mut rest = [0u8; 8];
        self.read_exact(&mut rest).await?;
        let uncompressed = u64::from_le_bytes(rest);
        Ok((crc, compressed, uncompressed))
    }

    /// Parses a local file header into fresh entry progress.
    ///
    /// A forward-only reader never sees the central directory before entry
    /// bodies, so kinds are limited to what local headers can express:
    /// directory markers (trailing separator) and regular files.
    async fn read_local_header(&mut self) -> Result<EntryProgress, DecodeError> {
        let mut fixed = [0u8; LOCAL_FILE_HEADER_LEN];
        self.read_exact(&mut fixed).await?;
        let mut parsed = header::parse_local_file_header(&fixed);
        let name = self.read_vec(parsed.name_len).await?;
        let extra = self.read_vec(parsed.extra_len).await?;
        header::apply_zip64_extra(&mut parsed, &extra);
        let relative_path =
            String::from_utf8(name).map_err(|_| DecodeError::InvalidPath)?;
        if parsed.flags & FLAG_ENCRYPTED != 0 {
            return Err(DecodeError::EncryptedEntry {
                path: relative_path,
            });
        }
        let Some(method) = CompressionMethod::from_code(parsed.method) else {
            return Err(DecodeError::UnsupportedMethod {
                path: relative_path,
                method: parsed.method,
            });
        };
        let kind = if relative_path.ends_with('/') {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let has_descriptor = parsed.flags & FLAG_DATA_DESCRIPTOR != 0;
        if has_descriptor && method == CompressionMethod::Stored && kind != EntryKind::Directory {
            return Err(DecodeError::UnframeableEntry {
                path: relative_path,
            });
        }
        if !has_descriptor
            && method == CompressionMethod::Stored
            && parsed.compressed_size != parsed.uncompressed_size
        {
            return Err(DecodeError::InconsistentSizes {
                path: relative_path,
            });
        }
        let (declared_compressed, declared_uncompressed, expected_crc, declared_size) =
            if has_descriptor {
                // Directory markers have empty bodies even in streaming mode.
                let empty = (kind == EntryKind::Directory).then_some(0);
                (empty, empty, None, empty)
            } else {
                (
                    Some(parsed.compressed_size),
                    Some(parsed.uncompressed_size),
                    Some(parsed.crc32),
                    Some(parsed.uncompressed_size),
                )
            };
        Ok(EntryProgress {
            metadata: EntryMetadata {
                relative_path,
                kind,
                declared_size,
            },
            method,
            has_descriptor,
            zip64: parsed.zip64,
            expected_crc,
            declared_compressed,
            declared_uncompressed,
            crc: crc32fast::Hasher::new(),
            inflate: (method == CompressionMethod::Deflate).then(InflateState::new),
            compressed_consumed: 0,
            uncompressed_produced: 0,
            body_done: false,
            completed: false,
        })
    }

    /// Reads a record signature, or `None` on clean end of stream.
    async fn read_signature(&mut self) -> Result<Option<u32>, DecodeError> {
        if !self.fill_buf().await? {
            return Ok(None);
        }
        let mut word = [0u8; 4];
        self.read_exact(&mut word).await?;
        Ok(Some(u32::from_le_bytes(word)))
    }

    /// Reads exactly `out.len()` bytes through the internal buffer.
    async fn read_exact(&mut self, out: &mut [u8]) -> Result<(), DecodeError> {
        let mut filled = 0usize;
        while filled < out.len() {
            if !self.fill_buf().await? {
                return Err(DecodeError::TruncatedStream);
            }
            let available = self.end - self.start;
            let take = available.min(out.len() - filled);
            out[filled .. filled + take]
                .copy_from_slice(&self.buf[self.start .. self.start + take]);
            self.start += take;
            filled += take;
        }
        Ok(())
    }

    /// Reads a length-bounded byte vector (entry names and extra fields).
    async fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        let mut out = vec![0u8; len];
        self.read_exact(&mut out).await?;
        Ok(out)
    }

    /// Ensures at least one buffered byte; returns false at end of stream.
    async fn fill_buf(&mut self) -> Result<bool, DecodeError> {
        if self.start < self.end {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        self.start = 0;
        self.end = 0;
        let read = self
            .reader
            .read(&mut self.buf)
            .await
            .map_err(|err| DecodeError::Io(err.to_string()))?;
        if read == 0 {
            self.eof = true;
            return Ok(false);
        }
        self.end = read;
        Ok(true)
    }
}

/// Clamps a `u64` budget to a `usize` buffer limit.
fn clamp_to_usize(budget: u64, limit: usize) -> usize {
    usize::try_from(budget).map_or(limit, |budget| budget.min(limit))
}

/// Widens a buffer-bounded `usize` into a `u64` counter increment.
fn as_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Entry Handle
// ============================================================================

/// One open archive entry: metadata plus its lazy byte stream.
///
/// The handle mutably borrows the decoder, so a second entry cannot be
/// opened until this one is dropped.
pub struct ZipEntry<'a, R> {
    /// Decoder owning the underlying source.
    decoder: &'a mut ZipEntryDecoder<R>,
    /// Metadata parsed from the local file header.
    metadata: EntryMetadata,
}

impl<R> std::fmt::Debug for ZipEntry<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipEntry").field("metadata", &self.metadata).finish_non_exhaustive()
    }
}

impl<R> ZipEntry<'_, R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Returns the entry metadata.
    #[must_use]
    pub const fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }

    /// Reads the next decoded chunk into `out`; zero means the body is
    /// complete and verified.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] on malformed bodies, truncation, or checksum
    /// mismatch.
    pub async fn read_chunk(&mut self, out: &mut [u8]) -> Result<usize, DecodeError> {
        self.decoder.read_entry_chunk(out).await
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
