// crates/unzip-relay-core/src/audit.rs
// ============================================================================
// Module: Extraction Audit Events
// Description: Structured audit events for extraction jobs and entries.
// Purpose: Emit per-entry and per-job observability without hard deps.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The trigger transport only ever sees a coarse status code, so per-entry
//! detail is recorded through an audit sink. This module defines the event
//! payloads and the sink trait; it is intentionally dependency-light so
//! deployments can route events to their preferred logging pipeline without
//! redesign. Sinks receive paths and reasons from untrusted archives and
//! must treat them as data, never as markup or shell input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::JobStatus;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Audit event for one archive entry outcome.
#[derive(Debug, Clone, Serialize)]
pub struct EntryAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Archive the entry belongs to.
    pub archive: String,
    /// Entry path as recorded in the archive.
    pub entry_path: String,
    /// Outcome label (`written`, `skipped`, `failed`).
    pub status: &'static str,
    /// Bytes written for written entries.
    pub bytes: Option<u64>,
    /// Skip or failure reason when present.
    pub reason: Option<String>,
}

/// Audit event for one finished extraction job.
#[derive(Debug, Clone, Serialize)]
pub struct JobAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Source bucket named by the trigger.
    pub bucket: String,
    /// Archive object key named by the trigger.
    pub archive: String,
    /// Aggregated job status.
    pub status: JobStatus,
    /// Count of written entries.
    pub written: usize,
    /// Count of skipped entries.
    pub skipped: usize,
    /// Count of failed entries.
    pub failed: usize,
    /// True when the acknowledgment requests redelivery.
    pub retryable: bool,
}

/// Returns the current wall-clock timestamp in milliseconds since epoch.
#[must_use]
pub fn timestamp_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |duration| duration.as_millis())
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for extraction events.
pub trait JobAuditSink: Send + Sync {
    /// Records an entry outcome event.
    fn record_entry(&self, event: &EntryAuditEvent);

    /// Records a finished-job event.
    fn record_job(&self, event: &JobAuditEvent);
}

/// No-op audit sink.
///
/// # Invariants
/// - Events are intentionally discarded.
pub struct NoopJobAuditSink;

impl JobAuditSink for NoopJobAuditSink {
    fn record_entry(&self, _event: &EntryAuditEvent) {}

    fn record_job(&self, _event: &JobAuditEvent) {}
}
