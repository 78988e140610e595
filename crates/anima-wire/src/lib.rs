//! ANIMA Wire - Chunked, channel-multiplexed session protocol codec
//!
//! Inbound traffic is a stream of tagged records: response classification
//! records (`Normal`, `Failed`, `Leave`, `RequestId`) and per-channel chunk
//! records (`{Audio,Motion,Face}{Start,Body,End}`). Outbound traffic is the
//! session start record plus the user audio upload records.

pub mod element;
pub mod reader;
pub mod record;

pub use element::*;
pub use reader::*;
pub use record::*;
