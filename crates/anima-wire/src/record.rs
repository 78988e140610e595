//! Tagged wire records
//!
//! Framing: `tag: u8` + `payload_len: u32 LE` + payload. Strings are
//! u16-length-prefixed UTF-8; optional fields carry a presence byte.

use bytes::Bytes;

use anima_core::{AnimaError, AnimaResult};

use crate::ElementType;

/// Record tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordTag {
    Normal = 0x01,
    Failed = 0x02,
    Leave = 0x03,
    RequestId = 0x04,

    SessionStart = 0x10,

    AudioStart = 0x20,
    AudioBody = 0x21,
    AudioEnd = 0x22,

    MotionStart = 0x30,
    MotionBody = 0x31,
    MotionEnd = 0x32,

    FaceStart = 0x40,
    FaceBody = 0x41,
    FaceEnd = 0x42,
}

impl RecordTag {
    pub fn from_byte(b: u8) -> AnimaResult<Self> {
        match b {
            0x01 => Ok(RecordTag::Normal),
            0x02 => Ok(RecordTag::Failed),
            0x03 => Ok(RecordTag::Leave),
            0x04 => Ok(RecordTag::RequestId),
            0x10 => Ok(RecordTag::SessionStart),
            0x20 => Ok(RecordTag::AudioStart),
            0x21 => Ok(RecordTag::AudioBody),
            0x22 => Ok(RecordTag::AudioEnd),
            0x30 => Ok(RecordTag::MotionStart),
            0x31 => Ok(RecordTag::MotionBody),
            0x32 => Ok(RecordTag::MotionEnd),
            0x40 => Ok(RecordTag::FaceStart),
            0x41 => Ok(RecordTag::FaceBody),
            0x42 => Ok(RecordTag::FaceEnd),
            other => Err(AnimaError::UnknownRecordTag(other)),
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Session-kind discriminator on the start record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionKind {
    /// Live conversational turn
    Conversation = 0x01,
    /// Pre-scripted line (greeting, farewell)
    Scripted = 0x02,
}

impl SessionKind {
    pub fn from_byte(b: u8) -> AnimaResult<Self> {
        match b {
            0x01 => Ok(SessionKind::Conversation),
            0x02 => Ok(SessionKind::Scripted),
            other => Err(AnimaError::InvalidWireFormat(format!(
                "unknown session kind: {other:#04x}"
            ))),
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// One decoded wire record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Normal,
    Failed {
        message: String,
    },
    Leave,
    RequestId {
        id: u64,
    },

    /// Outbound session start: kind discriminator + flat key/value payload
    SessionStart {
        kind: SessionKind,
        fields: Vec<(String, String)>,
    },

    AudioStart {
        frame_rate: u32,
        channels: u16,
        sample_width: u16,
    },
    AudioBody {
        data: Bytes,
    },
    AudioEnd,

    MotionStart {
        joint_names: Vec<String>,
        element_type: ElementType,
        restpose: Option<String>,
        timeline_offset: Option<i32>,
    },
    MotionBody {
        data: Bytes,
    },
    MotionEnd,

    FaceStart {
        blendshape_names: Vec<String>,
        element_type: ElementType,
        timeline_offset: Option<i32>,
    },
    FaceBody {
        data: Bytes,
    },
    FaceEnd,
}

impl Record {
    pub fn tag(&self) -> RecordTag {
        match self {
            Record::Normal => RecordTag::Normal,
            Record::Failed { .. } => RecordTag::Failed,
            Record::Leave => RecordTag::Leave,
            Record::RequestId { .. } => RecordTag::RequestId,
            Record::SessionStart { .. } => RecordTag::SessionStart,
            Record::AudioStart { .. } => RecordTag::AudioStart,
            Record::AudioBody { .. } => RecordTag::AudioBody,
            Record::AudioEnd => RecordTag::AudioEnd,
            Record::MotionStart { .. } => RecordTag::MotionStart,
            Record::MotionBody { .. } => RecordTag::MotionBody,
            Record::MotionEnd => RecordTag::MotionEnd,
            Record::FaceStart { .. } => RecordTag::FaceStart,
            Record::FaceBody { .. } => RecordTag::FaceBody,
            Record::FaceEnd => RecordTag::FaceEnd,
        }
    }

    /// Serialize as a complete framed record
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.encode_payload();
        let mut buf = Vec::with_capacity(5 + payload.len());
        buf.push(self.tag().to_byte());
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&payload);
        buf
    }

    fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Record::Normal | Record::Leave | Record::AudioEnd | Record::MotionEnd
            | Record::FaceEnd => {}
            Record::Failed { message } => put_str(&mut buf, message),
            Record::RequestId { id } => buf.extend_from_slice(&id.to_le_bytes()),
            Record::SessionStart { kind, fields } => {
                buf.push(kind.to_byte());
                buf.extend_from_slice(&(fields.len() as u16).to_le_bytes());
                for (key, value) in fields {
                    put_str(&mut buf, key);
                    put_str(&mut buf, value);
                }
            }
            Record::AudioStart {
                frame_rate,
                channels,
                sample_width,
            } => {
                buf.extend_from_slice(&frame_rate.to_le_bytes());
                buf.extend_from_slice(&channels.to_le_bytes());
                buf.extend_from_slice(&sample_width.to_le_bytes());
            }
            Record::AudioBody { data } | Record::MotionBody { data } | Record::FaceBody { data } => {
                buf.extend_from_slice(data);
            }
            Record::MotionStart {
                joint_names,
                element_type,
                restpose,
                timeline_offset,
            } => {
                put_names(&mut buf, joint_names);
                buf.push(element_type.to_byte());
                put_opt_str(&mut buf, restpose.as_deref());
                put_opt_i32(&mut buf, *timeline_offset);
            }
            Record::FaceStart {
                blendshape_names,
                element_type,
                timeline_offset,
            } => {
                put_names(&mut buf, blendshape_names);
                buf.push(element_type.to_byte());
                put_opt_i32(&mut buf, *timeline_offset);
            }
        }
        buf
    }

    /// Decode a record payload for a known tag
    pub fn decode(tag: RecordTag, payload: &[u8]) -> AnimaResult<Record> {
        let mut cur = Cursor::new(payload);
        let record = match tag {
            RecordTag::Normal => Record::Normal,
            RecordTag::Leave => Record::Leave,
            RecordTag::AudioEnd => Record::AudioEnd,
            RecordTag::MotionEnd => Record::MotionEnd,
            RecordTag::FaceEnd => Record::FaceEnd,
            RecordTag::Failed => Record::Failed {
                message: cur.get_str()?,
            },
            RecordTag::RequestId => Record::RequestId { id: cur.get_u64()? },
            RecordTag::SessionStart => {
                let kind = SessionKind::from_byte(cur.get_u8()?)?;
                let count = cur.get_u16()? as usize;
                let mut fields = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = cur.get_str()?;
                    let value = cur.get_str()?;
                    fields.push((key, value));
                }
                Record::SessionStart { kind, fields }
            }
            RecordTag::AudioStart => Record::AudioStart {
                frame_rate: cur.get_u32()?,
                channels: cur.get_u16()?,
                sample_width: cur.get_u16()?,
            },
            RecordTag::AudioBody => Record::AudioBody {
                data: Bytes::copy_from_slice(payload),
            },
            RecordTag::MotionBody => Record::MotionBody {
                data: Bytes::copy_from_slice(payload),
            },
            RecordTag::FaceBody => Record::FaceBody {
                data: Bytes::copy_from_slice(payload),
            },
            RecordTag::MotionStart => {
                let joint_names = cur.get_names()?;
                let element_type = ElementType::from_byte(cur.get_u8()?)?;
                let restpose = cur.get_opt_str()?;
                let timeline_offset = cur.get_opt_i32()?;
                Record::MotionStart {
                    joint_names,
                    element_type,
                    restpose,
                    timeline_offset,
                }
            }
            RecordTag::FaceStart => {
                let blendshape_names = cur.get_names()?;
                let element_type = ElementType::from_byte(cur.get_u8()?)?;
                let timeline_offset = cur.get_opt_i32()?;
                Record::FaceStart {
                    blendshape_names,
                    element_type,
                    timeline_offset,
                }
            }
        };
        match tag {
            // Body payloads are opaque; anything else must consume exactly
            RecordTag::AudioBody | RecordTag::MotionBody | RecordTag::FaceBody => {}
            _ => cur.finish()?,
        }
        Ok(record)
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u16).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn put_opt_str(buf: &mut Vec<u8>, s: Option<&str>) {
    match s {
        Some(s) => {
            buf.push(1);
            put_str(buf, s);
        }
        None => buf.push(0),
    }
}

fn put_opt_i32(buf: &mut Vec<u8>, v: Option<i32>) {
    match v {
        Some(v) => {
            buf.push(1);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        None => buf.push(0),
    }
}

fn put_names(buf: &mut Vec<u8>, names: &[String]) {
    buf.extend_from_slice(&(names.len() as u16).to_le_bytes());
    for name in names {
        put_str(buf, name);
    }
}

/// Bounds-checked payload reader
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> AnimaResult<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(AnimaError::BufferTooShort {
                expected: self.pos + n,
                actual: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn get_u8(&mut self) -> AnimaResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn get_u16(&mut self) -> AnimaResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn get_u32(&mut self) -> AnimaResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_i32(&mut self) -> AnimaResult<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_u64(&mut self) -> AnimaResult<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn get_str(&mut self) -> AnimaResult<String> {
        let len = self.get_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| AnimaError::InvalidWireFormat("string is not valid UTF-8".into()))
    }

    fn get_opt_str(&mut self) -> AnimaResult<Option<String>> {
        match self.get_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.get_str()?)),
            other => Err(AnimaError::InvalidWireFormat(format!(
                "bad presence byte: {other}"
            ))),
        }
    }

    fn get_opt_i32(&mut self) -> AnimaResult<Option<i32>> {
        match self.get_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.get_i32()?)),
            other => Err(AnimaError::InvalidWireFormat(format!(
                "bad presence byte: {other}"
            ))),
        }
    }

    fn get_names(&mut self) -> AnimaResult<Vec<String>> {
        let count = self.get_u16()? as usize;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            names.push(self.get_str()?);
        }
        Ok(names)
    }

    fn finish(&self) -> AnimaResult<()> {
        if self.pos != self.buf.len() {
            return Err(AnimaError::InvalidWireFormat(format!(
                "{} trailing bytes after payload",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}
