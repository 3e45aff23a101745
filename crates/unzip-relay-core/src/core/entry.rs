// crates/unzip-relay-core/src/core/entry.rs
// ============================================================================
// Module: Archive Entry Model
// Description: Entry kinds and metadata produced by the archive decoder.
// Purpose: Describe one archive record independently of the wire format.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An archive entry is one logical record inside an archive: a file, a
//! directory marker, or something the extractor does not handle. Metadata is
//! available before the entry body so routing decisions never require
//! reading payload bytes.
//! Invariants:
//! - `relative_path` is the raw path recorded in the archive, unmodified.
//! - `declared_size` is `None` when the archive defers sizes to a trailing
//!   record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Entry Kind
// ============================================================================

/// Classification of an archive entry.
///
/// # Invariants
/// - Variants are stable for outcome reporting and audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file entry with a byte payload.
    File,
    /// Directory marker entry (no payload).
    Directory,
    /// Symbolic link entry.
    Symlink,
    /// Any other entry kind (device nodes, sockets, unknown records).
    Other,
}

impl EntryKind {
    /// Returns a stable label for the entry kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }
}

// ============================================================================
// SECTION: Entry Metadata
// ============================================================================

/// Metadata for one archive entry, available before its body is read.
///
/// # Invariants
/// - Exactly one entry is open per decode sequence at any time; the metadata
///   outlives the body stream it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Entry path exactly as recorded in the archive.
    pub relative_path: String,
    /// Entry classification.
    pub kind: EntryKind,
    /// Declared uncompressed size, when the archive states it up front.
    pub declared_size: Option<u64>,
}

impl EntryMetadata {
    /// Returns true when the entry is a regular file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}
