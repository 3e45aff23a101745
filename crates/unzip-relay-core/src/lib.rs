// crates/unzip-relay-core/src/lib.rs
// ============================================================================
// Module: Unzip Relay Core Library
// Description: Public API surface for the Unzip Relay extraction pipeline.
// Purpose: Expose the domain model, decoder, router, stores, and job runner.
// Dependencies: crate::{audit, core, decode, interfaces, route, runtime}
// ============================================================================

//! ## Overview
//! Unzip Relay core implements the streaming extraction pipeline: a ZIP
//! entry decoder over forward-only byte streams, a pure entry router, and a
//! job coordinator that fans entries out to independent destination writes
//! under bounded memory. It is backend-agnostic and integrates through
//! explicit store interfaces rather than embedding a storage client.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod decode;
pub mod interfaces;
pub mod route;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testfix;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use audit::EntryAuditEvent;
pub use audit::JobAuditEvent;
pub use audit::JobAuditSink;
pub use audit::NoopJobAuditSink;
pub use decode::DecodeError;
pub use decode::ZipEntry;
pub use decode::ZipEntryDecoder;
pub use interfaces::DestinationStore;
pub use interfaces::ObjectWriter;
pub use interfaces::SourceStore;
pub use interfaces::SourceStream;
pub use interfaces::StoreError;
pub use route::RouteDecision;
pub use route::destination_key;
pub use route::route_entry;
pub use runtime::ExtractionLimits;
pub use runtime::InMemoryObjectStore;
pub use runtime::JobRunner;
pub use runtime::JobRunnerBuildError;
pub use runtime::JobRunnerBuilder;
