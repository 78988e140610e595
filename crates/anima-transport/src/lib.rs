//! ANIMA Transport - byte transport abstraction
//!
//! The session client neither connects nor owns sockets; it sends byte
//! records through a `Transport` and receives inbound bytes through a sink
//! callback registered on it. Decode runs synchronously inside the sink.

pub mod channel;

pub use channel::*;

use bytes::Bytes;

use anima_core::AnimaResult;

/// Inbound byte sink; invoked on the transport's delivery context
pub type ByteSink = Box<dyn FnMut(Bytes) + Send>;

/// A connected, bidirectional byte transport.
///
/// `interrupt()` on the owning session client must precede `disconnect` so
/// no orphaned sink callback fires into a dead session.
pub trait Transport: Send + Sync {
    /// Send bytes toward the service
    fn send(&self, bytes: Bytes) -> AnimaResult<()>;

    /// Register the inbound sink, replacing any previous one
    fn set_sink(&self, sink: ByteSink);

    /// Stop delivery and sending; idempotent
    fn disconnect(&self);

    fn is_connected(&self) -> bool;
}
