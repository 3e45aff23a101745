// crates/unzip-relay-core/src/runtime/job.rs
// ============================================================================
// Module: Job Coordinator
// Description: End-to-end orchestration of one archive-extraction job.
// Purpose: Drive decode, routing, and fan-out writes; aggregate outcomes.
// Dependencies: crate::{audit, core, decode, interfaces, route}
// ============================================================================

//! ## Overview
//! One job moves through received → validated → (not-archive short circuit)
//! → extracting → aggregating → done. Entries are processed strictly
//! sequentially, one open entry at a time, so job memory is bounded by a
//! small constant times the configured chunk size regardless of archive or
//! entry sizes. Entry-level write failures are recorded and never abort
//! sibling entries; decode-level failures end extraction with the outcomes
//! collected so far.
//! Invariants:
//! - Every decoded entry yields exactly one outcome.
//! - A failed write is aborted before the job continues, so no half-written
//!   object becomes externally visible.
//! - Cancellation (dropping the returned future) closes the source stream
//!   and any staged write, which must not publish per the
//!   [`crate::interfaces::ObjectWriter`] contract.
//!
//! Security posture: archive contents and notification payloads are
//! untrusted; entry counts and decompressed bytes can be bounded through
//! [`ExtractionLimits`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::audit::EntryAuditEvent;
use crate::audit::JobAuditEvent;
use crate::audit::JobAuditSink;
use crate::audit::NoopJobAuditSink;
use crate::audit::timestamp_ms;
use crate::core::EntryStatus;
use crate::core::ExtractionOutcome;
use crate::core::ExtractionTrigger;
use crate::core::JobResult;
use crate::decode::DEFAULT_CHUNK_BYTES;
use crate::decode::ZipEntry;
use crate::decode::ZipEntryDecoder;
use crate::interfaces::DestinationStore;
use crate::interfaces::SourceStore;
use crate::interfaces::SourceStream;
use crate::route::RouteDecision;
use crate::route::route_entry;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Resource ceilings for one extraction job.
///
/// Entry counts and sizes inside an archive are attacker-influenced, so
/// deployments can bound them; `None` disables a ceiling.
#[derive(Debug, Clone)]
pub struct ExtractionLimits {
    /// Chunk size for decode reads and destination writes.
    pub chunk_bytes: usize,
    /// Maximum number of entries processed per job.
    pub max_entries: Option<u64>,
    /// Maximum decompressed bytes for a single entry.
    pub max_entry_bytes: Option<u64>,
    /// Maximum decompressed bytes across the whole job.
    pub max_total_bytes: Option<u64>,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            max_entries: None,
            max_entry_bytes: None,
            max_total_bytes: None,
        }
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Errors from building a job runner.
#[derive(Debug, Error)]
pub enum JobRunnerBuildError {
    /// No source store was configured.
    #[error("job runner source store is not configured")]
    MissingSourceStore,
    /// No destination store was configured.
    #[error("job runner destination store is not configured")]
    MissingDestinationStore,
    /// Destination bucket was missing or empty.
    #[error("job runner destination bucket must be set")]
    EmptyDestinationBucket,
}

/// Builder for a [`JobRunner`].
#[derive(Default)]
pub struct JobRunnerBuilder {
    /// Source store for archive reads.
    source: Option<Arc<dyn SourceStore>>,
    /// Destination store for extracted objects.
    destination: Option<Arc<dyn DestinationStore>>,
    /// Destination bucket receiving extracted objects.
    destination_bucket: Option<String>,
    /// Resource ceilings for jobs.
    limits: Option<ExtractionLimits>,
    /// Audit sink for job and entry events.
    audit: Option<Arc<dyn JobAuditSink>>,
}

impl JobRunnerBuilder {
    /// Registers the source store.
    #[must_use]
    pub fn source_store(mut self, source: impl SourceStore + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Registers an already-shared source store.
    #[must_use]
    pub fn shared_source_store(mut self, source: Arc<dyn SourceStore>) -> Self {
        self.source = Some(source);
        self
    }

    /// Registers the destination store.
    #[must_use]
    pub fn destination_store(mut self, destination: impl DestinationStore + 'static) -> Self {
        self.destination = Some(Arc::new(destination));
        self
    }

    /// Registers an already-shared destination store.
    #[must_use]
    pub fn shared_destination_store(mut self, destination: Arc<dyn DestinationStore>) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Sets the destination bucket.
    #[must_use]
    pub fn destination_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.destination_bucket = Some(bucket.into());
        self
    }

    /// Sets the extraction limits.
    #[must_use]
    pub fn limits(mut self, limits: ExtractionLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Registers the audit sink.
    #[must_use]
    pub fn audit_sink(mut self, audit: Arc<dyn JobAuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Builds the job runner.
    ///
    /// # Errors
    ///
    /// Returns [`JobRunnerBuildError`] when a store or the destination
    /// bucket is missing.
    pub fn build(self) -> Result<JobRunner, JobRunnerBuildError> {
        let destination_bucket = self
            .destination_bucket
            .filter(|bucket| !bucket.trim().is_empty())
            .ok_or(JobRunnerBuildError::EmptyDestinationBucket)?;
        Ok(JobRunner {
            source: self.source.ok_or(JobRunnerBuildError::MissingSourceStore)?,
            destination: self.destination.ok_or(JobRunnerBuildError::MissingDestinationStore)?,
            destination_bucket,
            limits: self.limits.unwrap_or_default(),
            audit: self.audit.unwrap_or_else(|| Arc::new(NoopJobAuditSink)),
        })
    }
}

// ============================================================================
// SECTION: Entry Write Result
// ============================================================================

/// Outcome of streaming one entry to the destination.
enum EntryWriteResult {
    /// Entry was written and finalized.
    Written {
        /// Decoded bytes written.
        bytes: u64,
    },
    /// Writing failed; the job continues with the next entry.
    WriteFailed {
        /// Failure reason for the outcome record.
        reason: String,
        /// True when the store failure was transient.
        transient: bool,
    },
    /// Decoding failed mid-entry; the job cannot continue.
    DecodeFailed {
        /// Failure reason for the outcome record.
        reason: String,
    },
    /// A configured ceiling was exceeded; the job cannot continue.
    CeilingExceeded {
        /// Failure reason for the outcome record.
        reason: String,
    },
}

// ============================================================================
// SECTION: Job Runner
// ============================================================================

/// Runs extraction jobs against configured stores.
///
/// Runners are cheap to share across concurrent trigger deliveries; jobs
/// hold no shared mutable state.
pub struct JobRunner {
    /// Source store for archive reads.
    source: Arc<dyn SourceStore>,
    /// Destination store for extracted objects.
    destination: Arc<dyn DestinationStore>,
    /// Destination bucket receiving extracted objects.
    destination_bucket: String,
    /// Resource ceilings for jobs.
    limits: ExtractionLimits,
    /// Audit sink for job and entry events.
    audit: Arc<dyn JobAuditSink>,
}

impl JobRunner {
    /// Returns a builder for the job runner.
    #[must_use]
    pub fn builder() -> JobRunnerBuilder {
        JobRunnerBuilder::default()
    }

    /// Runs one extraction job from raw notification payload bytes.
    ///
    /// The payload must decode into a trigger; non-archive objects short
    /// circuit to a skipped result without touching either store. The
    /// result's acknowledgment tells the trigger transport whether
    /// redelivery is desirable.
    pub async fn run(&self, payload: &[u8]) -> JobResult {
        let trigger = match ExtractionTrigger::from_payload(payload, &self.destination_bucket) {
            Ok(trigger) => trigger,
            Err(_) => {
                let result = JobResult::invalid_trigger();
                self.record_job("", &result);
                return result;
            }
        };
        if !trigger.is_archive() {
            let result = JobResult::skipped(trigger.archive_name());
            self.record_job(&trigger.source.bucket, &result);
            return result;
        }
        let result = self.extract(&trigger).await;
        self.record_job(&trigger.source.bucket, &result);
        result
    }

    /// Drives the decode → route → write pipeline for one archive.
    async fn extract(&self, trigger: &ExtractionTrigger) -> JobResult {
        let archive = trigger.archive_name();
        let mut outcomes = Vec::new();
        let stream = match self
            .source
            .open_read(&trigger.source.bucket, &trigger.source.key)
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                let retryable = err.is_transient();
                self.record_outcome(
                    archive,
                    ExtractionOutcome::failed(archive, format!("source open failed: {err}")),
                    &mut outcomes,
                );
                return JobResult::aggregate(archive, outcomes, retryable);
            }
        };
        let mut decoder = ZipEntryDecoder::with_chunk_size(stream, self.limits.chunk_bytes);
        let mut entry_count = 0u64;
        let mut total_bytes = 0u64;
        let mut transient_only = true;
        loop {
            let mut entry = match decoder.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    let path = err.entry_path().unwrap_or(archive).to_string();
                    self.record_outcome(
                        archive,
                        ExtractionOutcome::failed(path, err.to_string()),
                        &mut outcomes,
                    );
                    transient_only = false;
                    break;
                }
            };
            entry_count += 1;
            let entry_path = entry.metadata().relative_path.clone();
            if let Some(max_entries) = self.limits.max_entries
                && entry_count > max_entries
            {
                self.record_outcome(
                    archive,
                    ExtractionOutcome::failed(
                        entry_path,
                        format!("archive exceeds entry ceiling ({max_entries} entries)"),
                    ),
                    &mut outcomes,
                );
                transient_only = false;
                break;
            }
            match route_entry(archive, entry.metadata()) {
                RouteDecision::SkipDirectory => {
                    self.record_outcome(
                        archive,
                        ExtractionOutcome::skipped(entry_path, "directory entry"),
                        &mut outcomes,
                    );
                }
                RouteDecision::SkipOther {
                    reason,
                } => {
                    self.record_outcome(
                        archive,
                        ExtractionOutcome::skipped(entry_path, reason),
                        &mut outcomes,
                    );
                }
                RouteDecision::Extract {
                    destination_key,
                } => {
                    let write = self
                        .write_entry(trigger, &mut entry, &destination_key, total_bytes)
                        .await;
                    match write {
                        EntryWriteResult::Written {
                            bytes,
                        } => {
                            total_bytes += bytes;
                            self.record_outcome(
                                archive,
                                ExtractionOutcome::written(entry_path, bytes),
                                &mut outcomes,
                            );
                        }
                        EntryWriteResult::WriteFailed {
                            reason,
                            transient,
                        } => {
                            if !transient {
                                transient_only = false;
                            }
                            self.record_outcome(
                                archive,
                                ExtractionOutcome::failed(entry_path, reason),
                                &mut outcomes,
                            );
                        }
                        EntryWriteResult::DecodeFailed {
                            reason,
                        }
                        | EntryWriteResult::CeilingExceeded {
                            reason,
                        } => {
                            self.record_outcome(
                                archive,
                                ExtractionOutcome::failed(entry_path, reason),
                                &mut outcomes,
                            );
                            transient_only = false;
                            break;
                        }
                    }
                }
            }
        }
        JobResult::aggregate(archive, outcomes, transient_only)
    }

    /// Streams one entry body to a destination object.
    ///
    /// A failed write is aborted before returning so nothing half-written
    /// becomes visible; the unread remainder of the entry is drained by the
    /// decoder when the job advances.
    async fn write_entry(
        &self,
        trigger: &ExtractionTrigger,
        entry: &mut ZipEntry<'_, SourceStream>,
        destination_key: &str,
        total_so_far: u64,
    ) -> EntryWriteResult {
        let mut writer = match self
            .destination
            .open_write(&trigger.destination_bucket, destination_key)
            .await
        {
            Ok(writer) => writer,
            Err(err) => {
                return EntryWriteResult::WriteFailed {
                    reason: format!("destination open failed: {err}"),
                    transient: err.is_transient(),
                };
            }
        };
        let mut chunk = vec![0u8; self.limits.chunk_bytes];
        let mut written = 0u64;
        loop {
            let read = match entry.read_chunk(&mut chunk).await {
                Ok(read) => read,
                Err(err) => {
                    let _ = writer.abort().await;
                    return EntryWriteResult::DecodeFailed {
                        reason: err.to_string(),
                    };
                }
            };
            if read == 0 {
                break;
            }
            written += u64::try_from(read).unwrap_or(u64::MAX);
            if let Some(max_entry_bytes) = self.limits.max_entry_bytes
                && written > max_entry_bytes
            {
                let _ = writer.abort().await;
                return EntryWriteResult::CeilingExceeded {
                    reason: format!("entry exceeds size ceiling ({max_entry_bytes} bytes)"),
                };
            }
            if let Some(max_total_bytes) = self.limits.max_total_bytes
                && total_so_far + written > max_total_bytes
            {
                let _ = writer.abort().await;
                return EntryWriteResult::CeilingExceeded {
                    reason: format!("job exceeds total size ceiling ({max_total_bytes} bytes)"),
                };
            }
            if let Err(err) = writer.write_chunk(&chunk[.. read]).await {
                let _ = writer.abort().await;
                return EntryWriteResult::WriteFailed {
                    reason: format!("destination write failed: {err}"),
                    transient: err.is_transient(),
                };
            }
        }
        match writer.finalize().await {
            Ok(()) => EntryWriteResult::Written {
                bytes: written,
            },
            Err(err) => EntryWriteResult::WriteFailed {
                reason: format!("destination finalize failed: {err}"),
                transient: err.is_transient(),
            },
        }
    }

    /// Records one entry outcome and emits its audit event.
    fn record_outcome(
        &self,
        archive: &str,
        outcome: ExtractionOutcome,
        outcomes: &mut Vec<ExtractionOutcome>,
    ) {
        let (bytes, reason) = match &outcome.status {
            EntryStatus::Written {
                bytes,
            } => (Some(*bytes), None),
            EntryStatus::Skipped {
                reason,
            }
            | EntryStatus::Failed {
                reason,
            } => (None, Some(reason.clone())),
        };
        self.audit.record_entry(&EntryAuditEvent {
            event: "entry_outcome",
            timestamp_ms: timestamp_ms(),
            archive: archive.to_string(),
            entry_path: outcome.entry_path.clone(),
            status: outcome.status.as_str(),
            bytes,
            reason,
        });
        outcomes.push(outcome);
    }

    /// Emits the finished-job audit event.
    fn record_job(&self, bucket: &str, result: &JobResult) {
        self.audit.record_job(&JobAuditEvent {
            event: "job_finished",
            timestamp_ms: timestamp_ms(),
            bucket: bucket.to_string(),
            archive: result.archive_name.clone(),
            status: result.status,
            written: result.written_count(),
            skipped: result.skipped_count(),
            failed: result.failed_count(),
            retryable: result.retryable,
        });
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
