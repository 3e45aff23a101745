// crates/unzip-relay-core/src/core/outcome.rs
// ============================================================================
// Module: Extraction Outcomes
// Description: Per-entry outcomes, job status aggregation, and acknowledgment.
// Purpose: Derive the coarse acknowledgment the trigger transport receives.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every decoded entry yields exactly one [`ExtractionOutcome`]. A finished
//! job aggregates its outcomes into a [`JobResult`] whose status drives the
//! acknowledgment decision: the trigger transport retries only when a retry
//! can actually help, because at-least-once delivery would otherwise either
//! drop data silently or redeliver a poisoned trigger forever.
//! Invariants:
//! - Outcomes are immutable once recorded.
//! - `retryable` is true only when no destination write was finalized and
//!   the failure was transient.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Entry Status
// ============================================================================

/// Final status of one archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Entry bytes were streamed and the destination object was finalized.
    Written {
        /// Decoded bytes written to the destination object.
        bytes: u64,
    },
    /// Entry was intentionally not extracted.
    Skipped {
        /// Reason for skipping the entry.
        reason: String,
    },
    /// Entry extraction failed; siblings are unaffected.
    Failed {
        /// Reason for the failure.
        reason: String,
    },
}

impl EntryStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Written {
                ..
            } => "written",
            Self::Skipped {
                ..
            } => "skipped",
            Self::Failed {
                ..
            } => "failed",
        }
    }
}

/// Outcome of one archive entry within a job.
///
/// # Invariants
/// - Never mutated after creation.
/// - Entry paths are unique within a job, so outcomes are unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionOutcome {
    /// Entry path as recorded in the archive.
    pub entry_path: String,
    /// Final entry status.
    #[serde(flatten)]
    pub status: EntryStatus,
}

impl ExtractionOutcome {
    /// Builds a written outcome.
    #[must_use]
    pub fn written(entry_path: impl Into<String>, bytes: u64) -> Self {
        Self {
            entry_path: entry_path.into(),
            status: EntryStatus::Written {
                bytes,
            },
        }
    }

    /// Builds a skipped outcome.
    #[must_use]
    pub fn skipped(entry_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entry_path: entry_path.into(),
            status: EntryStatus::Skipped {
                reason: reason.into(),
            },
        }
    }

    /// Builds a failed outcome.
    #[must_use]
    pub fn failed(entry_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entry_path: entry_path.into(),
            status: EntryStatus::Failed {
                reason: reason.into(),
            },
        }
    }
}

// ============================================================================
// SECTION: Job Status
// ============================================================================

/// Terminal status of one extraction job.
///
/// # Invariants
/// - Variants are stable for audit labeling and acknowledgment mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Trigger payload never decoded into a valid trigger.
    InvalidTrigger,
    /// Source object is not an archive; nothing was extracted.
    Skipped,
    /// Every entry was written or intentionally skipped.
    Success,
    /// At least one entry was written and at least one failed.
    PartialFailure,
    /// The job failed before any entry was written, or every entry failed.
    TotalFailure,
}

impl JobStatus {
    /// Returns a stable label for the job status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTrigger => "invalid_trigger",
            Self::Skipped => "skipped",
            Self::Success => "success",
            Self::PartialFailure => "partial_failure",
            Self::TotalFailure => "total_failure",
        }
    }
}

// ============================================================================
// SECTION: Acknowledgment
// ============================================================================

/// Acknowledgment decision returned to the trigger transport.
///
/// # Invariants
/// - `RetryLater` is issued only when redelivery can plausibly succeed and
///   no destination object was finalized, so a retry cannot duplicate work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgment {
    /// Job consumed the trigger; the transport must not redeliver.
    Completed,
    /// Trigger was malformed; redelivery can never succeed.
    Rejected,
    /// Transient failure before any write; redelivery is desirable.
    RetryLater,
}

impl Acknowledgment {
    /// Returns the HTTP status code conveying this acknowledgment.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Completed => 204,
            Self::Rejected => 400,
            Self::RetryLater => 503,
        }
    }
}

// ============================================================================
// SECTION: Job Result
// ============================================================================

/// Result of one extraction job.
///
/// Exists only for the duration of one job invocation; it is never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    /// Archive name the job processed (empty for invalid triggers).
    pub archive_name: String,
    /// Ordered per-entry outcomes.
    pub outcomes: Vec<ExtractionOutcome>,
    /// Aggregated job status.
    pub status: JobStatus,
    /// True when redelivery of the trigger is desirable.
    pub retryable: bool,
}

impl JobResult {
    /// Builds a result for a trigger that never validated.
    #[must_use]
    pub fn invalid_trigger() -> Self {
        Self {
            archive_name: String::new(),
            outcomes: Vec::new(),
            status: JobStatus::InvalidTrigger,
            retryable: false,
        }
    }

    /// Builds a result for a non-archive notification.
    #[must_use]
    pub fn skipped(archive_name: impl Into<String>) -> Self {
        Self {
            archive_name: archive_name.into(),
            outcomes: Vec::new(),
            status: JobStatus::Skipped,
            retryable: false,
        }
    }

    /// Aggregates per-entry outcomes into a job status.
    ///
    /// Success requires every outcome to be written or skipped; a mix of
    /// written and failed entries is a partial failure; failures without a
    /// single written entry are a total failure.
    #[must_use]
    pub fn aggregate(
        archive_name: impl Into<String>,
        outcomes: Vec<ExtractionOutcome>,
        retryable: bool,
    ) -> Self {
        let written = outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, EntryStatus::Written { .. }))
            .count();
        let failed = outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, EntryStatus::Failed { .. }))
            .count();
        let status = if failed == 0 {
            JobStatus::Success
        } else if written > 0 {
            JobStatus::PartialFailure
        } else {
            JobStatus::TotalFailure
        };
        let retryable = retryable && written == 0 && status == JobStatus::TotalFailure;
        Self {
            archive_name: archive_name.into(),
            outcomes,
            status,
            retryable,
        }
    }

    /// Returns the count of written entries.
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, EntryStatus::Written { .. }))
            .count()
    }

    /// Returns the count of skipped entries.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, EntryStatus::Skipped { .. }))
            .count()
    }

    /// Returns the count of failed entries.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, EntryStatus::Failed { .. }))
            .count()
    }

    /// Maps the job status to the acknowledgment decision.
    ///
    /// Completed outcomes, skips, and partial failures must not be retried:
    /// redelivery would re-extract already-finalized entries and duplicate
    /// work. Corrupt archives are likewise acknowledged because redelivery
    /// can never repair them.
    #[must_use]
    pub const fn acknowledgment(&self) -> Acknowledgment {
        match self.status {
            JobStatus::InvalidTrigger => Acknowledgment::Rejected,
            JobStatus::TotalFailure if self.retryable => Acknowledgment::RetryLater,
            _ => Acknowledgment::Completed,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
