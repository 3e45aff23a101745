// crates/unzip-relay-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Object Store
// Description: Map-backed store implementation for tests and local demos.
// Purpose: Provide deterministic store behavior without external deps.
// Dependencies: crate::interfaces, tokio
// ============================================================================

//! ## Overview
//! A simple in-memory implementation of both store interfaces. Writes stage
//! into a private buffer and become visible only on finalize, matching the
//! visibility contract real object stores provide for incomplete uploads.
//! Not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::interfaces::DestinationStore;
use crate::interfaces::ObjectWriter;
use crate::interfaces::SourceStore;
use crate::interfaces::SourceStream;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Shared object map keyed by `(bucket, key)`.
type ObjectMap = Arc<Mutex<BTreeMap<(String, String), Vec<u8>>>>;

/// In-memory object store for tests and local demos.
#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    /// Object map protected by a mutex.
    objects: ObjectMap,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object, making it immediately visible.
    pub fn insert_object(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert((bucket.to_string(), key.to_string()), bytes);
        }
    }

    /// Returns a finalized object's bytes.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(&(bucket.to_string(), key.to_string())).cloned())
    }

    /// Returns the finalized object keys within a bucket, in order.
    #[must_use]
    pub fn keys_in(&self, bucket: &str) -> Vec<String> {
        self.objects.lock().map_or_else(
            |_| Vec::new(),
            |objects| {
                objects
                    .keys()
                    .filter(|(object_bucket, _)| object_bucket == bucket)
                    .map(|(_, key)| key.clone())
                    .collect()
            },
        )
    }
}

#[async_trait]
impl SourceStore for InMemoryObjectStore {
    async fn open_read(&self, bucket: &str, key: &str) -> Result<SourceStream, StoreError> {
        let bytes = self
            .objects
            .lock()
            .map_err(|_| StoreError::Io("object store lock poisoned".to_string()))?
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        Ok(Box::pin(Cursor::new(bytes)))
    }
}

#[async_trait]
impl DestinationStore for InMemoryObjectStore {
    async fn open_write(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn ObjectWriter>, StoreError> {
        Ok(Box::new(InMemoryObjectWriter {
            objects: Arc::clone(&self.objects),
            bucket: bucket.to_string(),
            key: key.to_string(),
            staged: Vec::new(),
        }))
    }
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Staging writer for one in-memory object.
struct InMemoryObjectWriter {
    /// Object map shared with the owning store.
    objects: ObjectMap,
    /// Destination bucket.
    bucket: String,
    /// Destination key.
    key: String,
    /// Bytes staged before finalize.
    staged: Vec<u8>,
}

#[async_trait]
impl ObjectWriter for InMemoryObjectWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StoreError> {
        self.staged.extend_from_slice(chunk);
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<(), StoreError> {
        self.objects
            .lock()
            .map_err(|_| StoreError::Io("object store lock poisoned".to_string()))?
            .insert((self.bucket, self.key), self.staged);
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
