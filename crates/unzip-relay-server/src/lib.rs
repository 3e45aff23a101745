// crates/unzip-relay-server/src/lib.rs
// ============================================================================
// Module: Unzip Relay Server Library
// Description: Push transport, S3 stores, and audit sinks for the relay.
// Purpose: Wire the extraction core to real notification and storage backends.
// Dependencies: unzip-relay-config, unzip-relay-core, axum, aws-sdk-s3
// ============================================================================

//! ## Overview
//! The server crate hosts everything outside the extraction core: decoding
//! the push notification envelope, the S3-backed store implementations, the
//! JSON-lines audit sinks, and the axum endpoint that turns a job result
//! into the acknowledgment status code the trigger transport interprets.
//!
//! Security posture: push bodies, notification payloads, and archive
//! contents are all untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod envelope;
pub mod object_store;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileJobAuditSink;
pub use audit::StderrJobAuditSink;
pub use envelope::EnvelopeError;
pub use envelope::decode_envelope;
pub use object_store::S3ObjectStore;
pub use server::RelayServer;
pub use server::RelayServerError;
