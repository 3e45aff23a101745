// crates/unzip-relay-core/src/core/trigger.rs
// ============================================================================
// Module: Extraction Trigger
// Description: Storage-change notification payload and extraction trigger.
// Purpose: Validate notification payloads into immutable job triggers.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A storage-change notification names an object that may be an archive. The
//! decoded payload must carry at least `name`, `bucket`, and `size`; anything
//! less is a permanent trigger failure that redelivery can never repair.
//! Invariants:
//! - A trigger is immutable and consumed by exactly one job.
//! - Payload validation happens before any store interaction.
//!
//! Security posture: notification payloads are untrusted input and are
//! validated fail-closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Archive extension recognized by the extraction filter.
pub const ARCHIVE_EXTENSION: &str = "zip";
/// Maximum accepted notification payload size in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Trigger validation errors.
///
/// # Invariants
/// - Every variant is permanent: redelivering the same payload cannot
///   produce a different result.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// Notification payload was not valid JSON or missed required fields.
    #[error("invalid notification payload: {0}")]
    InvalidPayload(String),
    /// Notification payload exceeded the accepted size limit.
    #[error("notification payload too large ({actual_bytes} > {max_bytes})")]
    PayloadTooLarge {
        /// Maximum accepted payload size.
        max_bytes: usize,
        /// Actual payload size.
        actual_bytes: usize,
    },
    /// Object name in the payload was empty.
    #[error("notification payload has an empty object name")]
    EmptyName,
    /// Bucket name in the payload was empty.
    #[error("notification payload has an empty bucket name")]
    EmptyBucket,
}

// ============================================================================
// SECTION: Notification Payload
// ============================================================================

/// Decoded storage-change notification payload.
///
/// # Invariants
/// - Mirrors the storage notification schema; unknown fields are ignored so
///   notification schema additions do not break triggers.
#[derive(Debug, Clone, Deserialize)]
struct NotificationPayload {
    /// Object key of the changed object.
    name: String,
    /// Bucket holding the changed object.
    bucket: String,
    /// Declared object size in bytes.
    size: u64,
}

// ============================================================================
// SECTION: Object Location
// ============================================================================

/// Location of an object within a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    /// Bucket (container) identifier.
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
}

// ============================================================================
// SECTION: Extraction Trigger
// ============================================================================

/// Immutable trigger for one extraction job.
///
/// # Invariants
/// - `source` names the archive object reported by the notification.
/// - `declared_size` is informational; the pipeline never trusts it for
///   memory sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTrigger {
    /// Source archive location.
    pub source: ObjectLocation,
    /// Destination bucket receiving extracted objects.
    pub destination_bucket: String,
    /// Object size declared by the notification, in bytes.
    pub declared_size: u64,
}

impl ExtractionTrigger {
    /// Builds a trigger from raw notification payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError`] when the payload is oversized, not valid
    /// JSON, or misses a required field.
    pub fn from_payload(
        payload: &[u8],
        destination_bucket: &str,
    ) -> Result<Self, TriggerError> {
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(TriggerError::PayloadTooLarge {
                max_bytes: MAX_PAYLOAD_BYTES,
                actual_bytes: payload.len(),
            });
        }
        let decoded: NotificationPayload = serde_json::from_slice(payload)
            .map_err(|err| TriggerError::InvalidPayload(err.to_string()))?;
        if decoded.name.is_empty() {
            return Err(TriggerError::EmptyName);
        }
        if decoded.bucket.is_empty() {
            return Err(TriggerError::EmptyBucket);
        }
        Ok(Self {
            source: ObjectLocation {
                bucket: decoded.bucket,
                key: decoded.name,
            },
            destination_bucket: destination_bucket.to_string(),
            declared_size: decoded.size,
        })
    }

    /// Returns the archive name used for destination key namespacing.
    ///
    /// The full source object key is used, so archives in nested prefixes
    /// remain traceable.
    #[must_use]
    pub fn archive_name(&self) -> &str {
        &self.source.key
    }

    /// Returns true when the source object carries the archive extension.
    #[must_use]
    pub fn is_archive(&self) -> bool {
        has_archive_extension(&self.source.key)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the object key ends with the recognized archive
/// extension (ASCII case-insensitive).
///
/// A leading-dot name such as `.zip` has no extension and is not an archive.
#[must_use]
pub fn has_archive_extension(key: &str) -> bool {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match file_name.rfind('.') {
        Some(index) if index > 0 => {
            file_name[index + 1 ..].eq_ignore_ascii_case(ARCHIVE_EXTENSION)
        }
        _ => false,
    }
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

    use super::ExtractionTrigger;
    use super::TriggerError;
    use super::has_archive_extension;

    #[test]
    fn payload_decodes_into_trigger() {
        let payload = br#"{"name":"archive.zip","bucket":"src","size":1024}"#;
        let trigger = ExtractionTrigger::from_payload(payload, "dst").expect("trigger");
        assert_eq!(trigger.source.bucket, "src");
        assert_eq!(trigger.source.key, "archive.zip");
        assert_eq!(trigger.destination_bucket, "dst");
        assert_eq!(trigger.declared_size, 1024);
        assert!(trigger.is_archive());
    }

    #[test]
    fn payload_with_extra_fields_is_accepted() {
        let payload =
            br#"{"name":"a.zip","bucket":"src","size":1,"contentType":"application/zip"}"#;
        assert!(ExtractionTrigger::from_payload(payload, "dst").is_ok());
    }

    #[test]
    fn invalid_json_is_rejected() {
        let result = ExtractionTrigger::from_payload(b"not json", "dst");
        assert!(matches!(result, Err(TriggerError::InvalidPayload(_))));
    }

    #[test]
    fn missing_name_is_rejected() {
        let result = ExtractionTrigger::from_payload(br#"{"bucket":"src","size":1}"#, "dst");
        assert!(matches!(result, Err(TriggerError::InvalidPayload(_))));
    }

    #[test]
    fn missing_bucket_is_rejected() {
        let result = ExtractionTrigger::from_payload(br#"{"name":"a.zip","size":1}"#, "dst");
        assert!(matches!(result, Err(TriggerError::InvalidPayload(_))));
    }

    #[test]
    fn empty_name_is_rejected() {
        let result =
            ExtractionTrigger::from_payload(br#"{"name":"","bucket":"src","size":1}"#, "dst");
        assert!(matches!(result, Err(TriggerError::EmptyName)));
    }

    #[test]
    fn archive_extension_matching() {
        assert!(has_archive_extension("a.zip"));
        assert!(has_archive_extension("A.ZIP"));
        assert!(has_archive_extension("dir/deep/a.Zip"));
        assert!(!has_archive_extension("a.tar.gz"));
        assert!(!has_archive_extension("a.zip.gpg"));
        assert!(!has_archive_extension("zip"));
        assert!(!has_archive_extension(".zip"));
        assert!(!has_archive_extension("dir/.zip"));
    }
}
