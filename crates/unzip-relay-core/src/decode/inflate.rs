// crates/unzip-relay-core/src/decode/inflate.rs
// ============================================================================
// Module: Incremental Inflate
// Description: Chunked raw-deflate decompression state for entry bodies.
// Purpose: Decompress entry payloads without buffering whole streams.
// Dependencies: flate2
// ============================================================================

//! ## Overview
//! Wraps [`flate2::Decompress`] for raw deflate (no zlib wrapper, which is
//! how ZIP stores method-8 bodies) and reports exact per-step input/output
//! byte counts so the decoder can advance its buffer cursor and charge size
//! accounting precisely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use flate2::Decompress;
use flate2::FlushDecompress;
use flate2::Status;

// ============================================================================
// SECTION: Step Result
// ============================================================================

/// Result of one inflate step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InflateStep {
    /// Compressed bytes consumed from the input slice.
    pub consumed: usize,
    /// Decompressed bytes produced into the output slice.
    pub produced: usize,
    /// True once the deflate stream reached its end marker.
    pub finished: bool,
}

// ============================================================================
// SECTION: Inflate State
// ============================================================================

/// Incremental raw-deflate decompressor for one entry body.
pub(crate) struct InflateState {
    /// Underlying deflate state machine.
    decompress: Decompress,
    /// Set once the stream end marker has been observed.
    finished: bool,
}

impl InflateState {
    /// Creates a fresh raw-deflate decompressor.
    pub(crate) fn new() -> Self {
        Self {
            decompress: Decompress::new(false),
            finished: false,
        }
    }

    /// Inflates as much of `input` into `output` as fits.
    ///
    /// # Errors
    ///
    /// Returns the underlying decompressor message when the deflate data is
    /// malformed.
    pub(crate) fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<InflateStep, String> {
        let before_in = self.decompress.total_in();
        let before_out = self.decompress.total_out();
        let status = self
            .decompress
            .decompress(input, output, FlushDecompress::None)
            .map_err(|err| err.to_string())?;
        let consumed = delta_to_usize(self.decompress.total_in(), before_in);
        let produced = delta_to_usize(self.decompress.total_out(), before_out);
        if status == Status::StreamEnd {
            self.finished = true;
        }
        Ok(InflateStep {
            consumed,
            produced,
            finished: self.finished,
        })
    }
}

/// Converts a monotonic counter delta into a buffer-bounded `usize`.
fn delta_to_usize(after: u64, before: u64) -> usize {
    usize::try_from(after.saturating_sub(before)).unwrap_or(usize::MAX)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
