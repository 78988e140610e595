//! Error types for the ANIMA engine

use std::time::Duration;

use thiserror::Error;

/// Engine-wide error taxonomy
#[derive(Error, Debug)]
pub enum AnimaError {
    // Wire errors
    #[error("invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("unknown record tag: {0:#04x}")]
    UnknownRecordTag(u8),

    #[error("unknown element type: {0:#04x}")]
    UnknownElementType(u8),

    // Clip errors
    #[error("clip shape mismatch: {names} names vs {elements} elements per frame")]
    ClipShapeMismatch { names: usize, elements: usize },

    #[error("clip name lists differ: {0}")]
    ClipNameMismatch(String),

    #[error("clip slice out of range: {start}..{end} of {len}")]
    SliceOutOfRange {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("malformed clip dict: {0}")]
    MalformedDict(String),

    // Session classification errors
    #[error("generation service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Clean completion: all channels ended and nothing remains buffered
    #[error("stream ended")]
    StreamEnded,

    // Transport errors
    #[error("transport error: {0}")]
    TransportError(String),

    #[error("transport disconnected")]
    Disconnected,

    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    // Orchestration errors
    #[error("no character spawned")]
    NoCharacter,

    #[error("asset not found: {0}")]
    AssetNotFound(String),
}

impl AnimaError {
    /// Recoverable errors route through the apology path and return to idle;
    /// the rest surface a persistent notice.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AnimaError::Disconnected | AnimaError::NoCharacter | AnimaError::AssetNotFound(_)
        )
    }

    /// Clean end-of-stream is a completion signal, not a failure
    pub fn is_clean_end(&self) -> bool {
        matches!(self, AnimaError::StreamEnded)
    }
}

/// Result type for ANIMA operations
pub type AnimaResult<T> = Result<T, AnimaError>;
