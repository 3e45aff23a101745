// crates/unzip-relay-config/src/lib.rs
// ============================================================================
// Module: Unzip Relay Config Library
// Description: Canonical config model and validation for the relay service.
// Purpose: Single source of truth for unzip-relay.toml semantics.
// Dependencies: serde, thiserror, toml, unzip-relay-core
// ============================================================================

//! ## Overview
//! `unzip-relay-config` defines the configuration model for the relay
//! service: server binding, source and destination store settings, and the
//! extraction resource ceilings. Loading is strict and fail-closed; an
//! invalid or oversized config file never produces a running service.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
