//! ANIMA Stream - One streamed request/response session
//!
//! `StreamingSessionClient` owns the wire decode for one conversational
//! turn: it sends the session start record, decodes inbound tagged records
//! into clips on per-channel queues, tracks channel health, and classifies
//! the response. `BufferSizeEstimator` adapts the per-channel readiness
//! thresholds between sessions.

pub mod client;
pub mod estimator;
pub mod health;

pub use client::*;
pub use estimator::*;
pub use health::*;
