// crates/unzip-relay-server/src/server.rs
// ============================================================================
// Module: Relay Server
// Description: Push endpoint turning job results into acknowledgment codes.
// Purpose: Expose the extraction pipeline behind a single POST route.
// Dependencies: unzip-relay-config, unzip-relay-core, axum, tokio
// ============================================================================

//! ## Overview
//! The relay server accepts push deliveries on `POST /`, decodes the
//! envelope, runs one extraction job, and answers with the status code that
//! tells the trigger transport whether to redeliver: 204 consumes the
//! delivery (including partial failures, where a retry would duplicate
//! already-finalized objects), 400 rejects a malformed envelope or payload,
//! and 503 requests redelivery after a transient store failure with zero
//! writes. Each delivery runs on its own task; jobs share only the runner's
//! immutable configuration and store handles.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use thiserror::Error;
use unzip_relay_config::RelayConfig;
use unzip_relay_config::StoreProvider;
use unzip_relay_core::audit::JobAuditSink;
use unzip_relay_core::core::Acknowledgment;
use unzip_relay_core::interfaces::DestinationStore;
use unzip_relay_core::interfaces::SourceStore;
use unzip_relay_core::runtime::InMemoryObjectStore;
use unzip_relay_core::runtime::JobRunner;

use crate::envelope::decode_envelope;
use crate::object_store::S3ObjectStore;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Relay server errors.
#[derive(Debug, Error)]
pub enum RelayServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Relay Server
// ============================================================================

/// Relay server instance.
pub struct RelayServer {
    /// Service configuration.
    config: RelayConfig,
    /// Shared extraction job runner.
    runner: Arc<JobRunner>,
}

impl RelayServer {
    /// Builds a relay server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayServerError`] when the configuration is invalid or the
    /// job runner cannot be constructed.
    pub async fn from_config(
        config: RelayConfig,
        audit: Arc<dyn JobAuditSink>,
    ) -> Result<Self, RelayServerError> {
        config.validate().map_err(|err| RelayServerError::Config(err.to_string()))?;
        let source: Arc<dyn SourceStore> = match config.source.provider {
            StoreProvider::S3 => Arc::new(S3ObjectStore::from_source_config(&config.source).await),
            StoreProvider::Memory => Arc::new(InMemoryObjectStore::new()),
        };
        let destination: Arc<dyn DestinationStore> = match config.destination.provider {
            StoreProvider::S3 => {
                Arc::new(S3ObjectStore::from_destination_config(&config.destination).await)
            }
            StoreProvider::Memory => Arc::new(InMemoryObjectStore::new()),
        };
        let runner = JobRunner::builder()
            .shared_source_store(source)
            .shared_destination_store(destination)
            .destination_bucket(config.destination.bucket.clone())
            .limits(config.limits.to_extraction_limits())
            .audit_sink(audit)
            .build()
            .map_err(|err| RelayServerError::Init(err.to_string()))?;
        Ok(Self {
            config,
            runner: Arc::new(runner),
        })
    }

    /// Serves push deliveries until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`RelayServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), RelayServerError> {
        let addr = self
            .config
            .server
            .bind_addr()
            .map_err(|err| RelayServerError::Config(err.to_string()))?;
        let state = Arc::new(ServerState {
            runner: Arc::clone(&self.runner),
            max_body_bytes: self.config.server.max_body_bytes,
        });
        let app = Router::new().route("/", post(handle_push)).with_state(state);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| RelayServerError::Transport(format!("bind failed: {err}")))?;
        axum::serve(listener, app)
            .await
            .map_err(|err| RelayServerError::Transport(format!("server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Push Handling
// ============================================================================

/// Shared state for the push handler.
struct ServerState {
    /// Shared extraction job runner.
    runner: Arc<JobRunner>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Handles one push delivery.
async fn handle_push(State(state): State<Arc<ServerState>>, bytes: Bytes) -> StatusCode {
    process_push(&state, &bytes).await
}

/// Decodes the envelope, runs the job, and maps the result to a status code.
async fn process_push(state: &ServerState, body: &[u8]) -> StatusCode {
    if body.len() > state.max_body_bytes {
        return StatusCode::PAYLOAD_TOO_LARGE;
    }
    let payload = match decode_envelope(body) {
        Ok(payload) => payload,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let result = state.runner.run(&payload).await;
    status_for(result.acknowledgment())
}

/// Maps an acknowledgment decision onto an HTTP status code.
const fn status_for(acknowledgment: Acknowledgment) -> StatusCode {
    match acknowledgment {
        Acknowledgment::Completed => StatusCode::NO_CONTENT,
        Acknowledgment::Rejected => StatusCode::BAD_REQUEST,
        Acknowledgment::RetryLater => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
