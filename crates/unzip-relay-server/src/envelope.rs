// crates/unzip-relay-server/src/envelope.rs
// ============================================================================
// Module: Push Envelope
// Description: Push-notification envelope decoding for extraction triggers.
// Purpose: Unwrap the base64 payload carried by push deliveries.
// Dependencies: base64, serde, serde_json
// ============================================================================

//! ## Overview
//! Push deliveries wrap the storage notification in an envelope: a JSON
//! document whose `message.data` field carries the base64-encoded payload.
//! Every failure here is permanent (redelivering a malformed envelope can
//! never succeed), so all variants map to a 400-class rejection and no
//! store is touched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Envelope decoding errors.
///
/// # Invariants
/// - Every variant is permanent; redelivery cannot repair the envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Request body was not a JSON envelope.
    #[error("push body is not a valid envelope: {0}")]
    InvalidEnvelope(String),
    /// Envelope carried no message object.
    #[error("push envelope has no message")]
    MissingMessage,
    /// Message carried no data payload.
    #[error("push message has no data payload")]
    MissingData,
    /// Data payload was not valid base64.
    #[error("push message data is not valid base64")]
    InvalidBase64,
}

// ============================================================================
// SECTION: Envelope Types
// ============================================================================

/// Push delivery envelope.
///
/// Unknown fields are ignored so transport schema additions do not break
/// deliveries.
#[derive(Debug, Deserialize)]
struct PushEnvelope {
    /// Wrapped notification message.
    message: Option<PushMessage>,
}

/// Message object within a push envelope.
#[derive(Debug, Deserialize)]
struct PushMessage {
    /// Base64-encoded notification payload.
    data: Option<String>,
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes a push envelope body into raw notification payload bytes.
///
/// # Errors
///
/// Returns [`EnvelopeError`] when the body is not an envelope, the message
/// or its data field is absent, or the payload is not valid base64.
pub fn decode_envelope(body: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let envelope: PushEnvelope = serde_json::from_slice(body)
        .map_err(|err| EnvelopeError::InvalidEnvelope(err.to_string()))?;
    let message = envelope.message.ok_or(EnvelopeError::MissingMessage)?;
    let data = message.data.ok_or(EnvelopeError::MissingData)?;
    STANDARD.decode(data.as_bytes()).map_err(|_| EnvelopeError::InvalidBase64)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
