// crates/unzip-relay-core/src/interfaces/mod.rs
// ============================================================================
// Module: Store Interfaces
// Description: Backend-agnostic source and destination store contracts.
// Purpose: Define the seams the extraction pipeline uses to touch storage.
// Dependencies: async-trait, thiserror, tokio
// ============================================================================

//! ## Overview
//! The pipeline never talks to a storage backend directly: it reads archives
//! through [`SourceStore`] and writes extracted objects through
//! [`DestinationStore`]. Both sides are forward-only byte streams; writers
//! carry explicit finalize/abort so a failed write never leaves a
//! half-written object externally visible.
//! Invariants:
//! - Implementations must be safe to share across concurrent jobs.
//! - `Unavailable` and `Io` errors are the only transient-eligible kinds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Store errors for source reads and destination writes.
///
/// # Invariants
/// - Variants are stable for programmatic retry classification.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound {
        /// Bucket that was queried.
        bucket: String,
        /// Object key that was queried.
        key: String,
    },
    /// Caller is not permitted to access the object.
    #[error("access denied: {bucket}/{key}")]
    AccessDenied {
        /// Bucket that was queried.
        bucket: String,
        /// Object key that was queried.
        key: String,
    },
    /// Destination store refused the write for capacity reasons.
    #[error("storage quota exceeded for bucket {bucket}")]
    QuotaExceeded {
        /// Bucket that refused the write.
        bucket: String,
    },
    /// Backend is temporarily unreachable or overloaded.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Stream-level I/O failure during a read or write.
    #[error("store io error: {0}")]
    Io(String),
}

impl StoreError {
    /// Returns true when retrying the operation later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

// ============================================================================
// SECTION: Source Store
// ============================================================================

/// Forward-only byte stream produced by a source store.
pub type SourceStream = Pin<Box<dyn AsyncRead + Send>>;

/// Read access to the store holding source archives.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Opens a forward-only read stream for an object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::AccessDenied`] for
    /// permanent conditions and [`StoreError::Unavailable`] for transient
    /// backend failures.
    async fn open_read(&self, bucket: &str, key: &str) -> Result<SourceStream, StoreError>;
}

// ============================================================================
// SECTION: Destination Store
// ============================================================================

/// Forward-only write stream for one destination object.
///
/// # Invariants
/// - Written bytes become externally visible only after `finalize` returns.
/// - `abort` (or dropping an unfinalized writer whose backend discards
///   incomplete uploads) leaves no visible object behind.
#[async_trait]
pub trait ObjectWriter: Send {
    /// Appends a chunk of bytes to the pending object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend rejects the write.
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StoreError>;

    /// Finalizes the object, making it externally visible.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot complete the object.
    async fn finalize(self: Box<Self>) -> Result<(), StoreError>;

    /// Abandons the pending object, discarding written bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails to discard staged data;
    /// the object still must not become visible.
    async fn abort(self: Box<Self>) -> Result<(), StoreError>;
}

/// Write access to the store receiving extracted objects.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Opens a write stream for a new destination object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AccessDenied`], [`StoreError::QuotaExceeded`],
    /// or [`StoreError::Unavailable`] when the stream cannot be opened.
    async fn open_write(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn ObjectWriter>, StoreError>;
}
