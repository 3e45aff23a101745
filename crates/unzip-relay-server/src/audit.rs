// crates/unzip-relay-server/src/audit.rs
// ============================================================================
// Module: Audit Sinks
// Description: JSON-lines audit sinks for extraction events.
// Purpose: Record per-entry and per-job detail the caller never sees.
// Dependencies: serde_json, unzip-relay-core
// ============================================================================

//! ## Overview
//! The trigger transport only receives a coarse status code, so operational
//! visibility lives here: every entry outcome and finished job is emitted as
//! one JSON line, either to stderr (collected by the platform's log
//! pipeline) or to an append-only file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use unzip_relay_core::audit::EntryAuditEvent;
use unzip_relay_core::audit::JobAuditEvent;
use unzip_relay_core::audit::JobAuditSink;

// ============================================================================
// SECTION: Stderr Sink
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrJobAuditSink;

impl JobAuditSink for StderrJobAuditSink {
    fn record_entry(&self, event: &EntryAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }

    fn record_job(&self, event: &JobAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

/// Audit sink that logs JSON lines to an append-only file.
pub struct FileJobAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileJobAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl JobAuditSink for FileJobAuditSink {
    fn record_entry(&self, event: &EntryAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }

    fn record_job(&self, event: &JobAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}
