//! Incremental record reader
//!
//! The transport delivers arbitrarily-sized byte chunks; the reader
//! accumulates them and yields complete records as they become available.

use bytes::{Buf, BytesMut};

use anima_core::{AnimaError, AnimaResult};

use crate::{Record, RecordTag};

/// Framing overhead: tag byte + u32 payload length
const HEADER_SIZE: usize = 5;

/// Upper bound on a single record payload; larger lengths indicate a
/// corrupt or desynchronized stream.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Accumulates transport bytes and pulls complete records
#[derive(Debug, Default)]
pub struct RecordReader {
    buf: BytesMut,
}

impl RecordReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw transport bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pull the next complete record, or `None` if more bytes are needed
    pub fn next_record(&mut self) -> AnimaResult<Option<Record>> {
        if self.buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let tag = RecordTag::from_byte(self.buf[0])?;
        let len = u32::from_le_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]) as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(AnimaError::InvalidWireFormat(format!(
                "record payload of {len} bytes exceeds limit"
            )));
        }
        if self.buf.len() < HEADER_SIZE + len {
            return Ok(None);
        }

        self.buf.advance(HEADER_SIZE);
        let payload = self.buf.split_to(len);
        let record = Record::decode(tag, &payload)?;
        Ok(Some(record))
    }

    /// Bytes currently buffered but not yet consumed
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partially received record
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
