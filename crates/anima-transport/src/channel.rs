//! In-process channel transport
//!
//! Backs local loopback sessions and tests: the far side of the pair plays
//! the generation service, injecting inbound bytes and observing outbound
//! ones. A pump task forwards inbound bytes into the registered sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use anima_core::{AnimaError, AnimaResult};

use crate::{ByteSink, Transport};

/// Client half of an in-process transport pair
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<Bytes>,
    sink: Arc<Mutex<Option<ByteSink>>>,
    connected: Arc<AtomicBool>,
}

/// Service half of an in-process transport pair
pub struct ServiceEndpoint {
    /// Bytes the client sent
    pub outbound: mpsc::UnboundedReceiver<Bytes>,
    inbound: mpsc::UnboundedSender<Bytes>,
}

impl ServiceEndpoint {
    /// Inject bytes toward the client; they surface in its sink
    pub fn inject(&self, bytes: impl Into<Bytes>) -> AnimaResult<()> {
        self.inbound
            .send(bytes.into())
            .map_err(|_| AnimaError::Disconnected)
    }
}

impl ChannelTransport {
    /// Create a connected pair. Must run inside a tokio runtime; the pump
    /// task lives until disconnect or until the service half is dropped.
    pub fn pair() -> (Arc<ChannelTransport>, ServiceEndpoint) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, mut in_rx) = mpsc::unbounded_channel::<Bytes>();

        let transport = Arc::new(ChannelTransport {
            outbound: out_tx,
            sink: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(true)),
        });

        let sink = Arc::clone(&transport.sink);
        let connected = Arc::clone(&transport.connected);
        tokio::spawn(async move {
            while let Some(bytes) = in_rx.recv().await {
                if !connected.load(Ordering::SeqCst) {
                    break;
                }
                let mut guard = sink.lock();
                match guard.as_mut() {
                    Some(sink) => sink(bytes),
                    None => tracing::warn!("inbound bytes dropped: no sink registered"),
                }
            }
        });

        (
            transport,
            ServiceEndpoint {
                outbound: out_rx,
                inbound: in_tx,
            },
        )
    }
}

impl Transport for ChannelTransport {
    fn send(&self, bytes: Bytes) -> AnimaResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(AnimaError::Disconnected);
        }
        self.outbound
            .send(bytes)
            .map_err(|_| AnimaError::Disconnected)
    }

    fn set_sink(&self, sink: ByteSink) {
        *self.sink.lock() = Some(sink);
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        *self.sink.lock() = None;
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
