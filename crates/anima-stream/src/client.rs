//! Streamed session client
//!
//! One client instance serves one request/response cycle bound to a single
//! conversational turn. Decode runs synchronously inside the transport
//! sink; the state machine polls classification and drains clips from the
//! other side. Single writer (sink) / single reader (poll): a client must
//! not be polled from two concurrent logical flows.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use anima_clip::{AudioClip, AudioFormat, FaceClip, FaceFrame, Mat3, MotionClip, MotionFrame, Vec3};
use anima_core::{AnimaError, AnimaResult, CharacterId, RequestId, SessionClock, TurnId};
use anima_transport::Transport;
use anima_wire::{
    decode_elements, face_row_width, motion_row_width, row_count, ElementType, Record,
    RecordReader, SessionKind,
};

use crate::{HealthSnapshot, NetworkStream};

/// Response classification, polled by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Nothing decisive decoded yet
    Pending,
    Normal,
    Leave,
    Failed,
}

/// Per-channel readiness floors and nominal rates
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Minimum buffered audio before playback may begin
    pub min_audio_secs: f64,
    /// Minimum buffered motion frames
    pub min_motion_frames: u32,
    /// Minimum buffered face frames
    pub min_face_frames: u32,
    /// Nominal motion frame rate, for duration bookkeeping
    pub motion_fps: f64,
    /// Nominal face frame rate
    pub face_fps: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            min_audio_secs: 0.5,
            min_motion_frames: 15,
            min_face_frames: 15,
            motion_fps: 30.0,
            face_fps: 30.0,
        }
    }
}

/// Everything the session start record carries
#[derive(Debug, Clone)]
pub struct StartDescriptor {
    pub kind: SessionKind,
    pub character_id: CharacterId,
    pub turn_id: TurnId,
    pub language: String,
    pub audio: AudioFormat,
    /// Requested lead-in/lead-out extension, in seconds
    pub lead_in_secs: f64,
    pub lead_out_secs: f64,
    /// Literal line to speak instead of generating one
    pub text: Option<String>,
}

impl StartDescriptor {
    fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("character_id".to_string(), self.character_id.to_string()),
            ("turn_id".to_string(), self.turn_id.to_string()),
            ("language".to_string(), self.language.clone()),
            (
                "audio_frame_rate".to_string(),
                self.audio.frame_rate.to_string(),
            ),
            ("audio_channels".to_string(), self.audio.channels.to_string()),
            (
                "audio_sample_width".to_string(),
                self.audio.sample_width.to_string(),
            ),
            ("lead_in_secs".to_string(), self.lead_in_secs.to_string()),
            ("lead_out_secs".to_string(), self.lead_out_secs.to_string()),
        ];
        if let Some(text) = &self.text {
            fields.push(("text".to_string(), text.clone()));
        }
        fields
    }
}

/// One drain of everything buffered; empty channels are omitted
#[derive(Debug, Default)]
pub struct TurnAnimation {
    pub motion: Option<MotionClip>,
    pub face: Option<FaceClip>,
    pub audio: Option<AudioClip>,
}

impl TurnAnimation {
    pub fn is_empty(&self) -> bool {
        self.motion.is_none() && self.face.is_none() && self.audio.is_none()
    }
}

/// Timeline offsets observed on the channel start records. Audio carries
/// no offset on the wire and is treated as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineOffsets {
    pub motion: Option<i32>,
    pub face: Option<i32>,
}

impl TimelineOffsets {
    /// Per-channel presentation shift: each delay offset by the smallest
    /// observed offset and zero, so unevenly-arriving channels start in
    /// relative lock-step.
    pub fn shifts(&self) -> ChannelShifts {
        let base = [Some(0), self.motion, self.face]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(0)
            .min(0);
        ChannelShifts {
            audio: -base,
            motion: self.motion.unwrap_or(0) - base,
            face: self.face.unwrap_or(0) - base,
        }
    }
}

/// Non-negative per-channel start delays, in frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelShifts {
    pub audio: i32,
    pub motion: i32,
    pub face: i32,
}

/// Decode counters
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamStats {
    pub bytes: u64,
    pub records: u64,
    pub chunks: u64,
    pub decode_errors: u64,
}

#[derive(Debug, Clone)]
struct MotionMeta {
    joint_names: Vec<String>,
    element_type: ElementType,
    restpose: Option<String>,
    timeline_offset: Option<i32>,
    first_body_pending: bool,
}

#[derive(Debug, Clone)]
struct FaceMeta {
    blendshape_names: Vec<String>,
    element_type: ElementType,
    timeline_offset: Option<i32>,
    first_body_pending: bool,
}

#[derive(Default)]
struct ClientInner {
    reader: RecordReader,
    request_id: Option<RequestId>,
    resolved: Option<ResponseKind>,
    failure_message: Option<String>,
    /// Set when a failure arrives after normal playback began, or on any
    /// fatal decode error; every subsequent read raises it.
    unavailable: Option<String>,
    interrupted: bool,

    audio_format: Option<AudioFormat>,
    motion_meta: Option<MotionMeta>,
    face_meta: Option<FaceMeta>,

    audio_queue: VecDeque<AudioClip>,
    motion_queue: VecDeque<MotionClip>,
    face_queue: VecDeque<FaceClip>,

    audio_net: NetworkStream,
    motion_net: NetworkStream,
    face_net: NetworkStream,

    stats: StreamStats,
}

/// Wire client for one streamed session
pub struct StreamingSessionClient {
    transport: Arc<dyn Transport>,
    clock: SessionClock,
    cfg: StreamConfig,
    inner: Arc<Mutex<ClientInner>>,
}

impl StreamingSessionClient {
    /// Bind a client to a connected transport and register the decode sink
    pub fn connect(transport: Arc<dyn Transport>, clock: SessionClock, cfg: StreamConfig) -> Self {
        let client = StreamingSessionClient {
            transport,
            clock,
            cfg,
            inner: Arc::new(Mutex::new(ClientInner::default())),
        };

        let inner = Arc::clone(&client.inner);
        let sink_clock = client.clock.clone();
        client.transport.set_sink(Box::new(move |bytes| {
            Self::ingest(&inner, &sink_clock, &bytes, cfg);
        }));
        client
    }

    /// Send the session start record
    pub fn start(&self, descriptor: &StartDescriptor) -> AnimaResult<()> {
        let record = Record::SessionStart {
            kind: descriptor.kind,
            fields: descriptor.to_fields(),
        };
        self.transport.send(Bytes::from(record.encode()))
    }

    /// Upload one captured PCM frame
    pub fn send_user_audio(&self, pcm: Bytes) -> AnimaResult<()> {
        self.transport
            .send(Bytes::from(Record::AudioBody { data: pcm }.encode()))
    }

    /// Signal end of user audio for this turn
    pub fn finish_user_audio(&self) -> AnimaResult<()> {
        self.transport.send(Bytes::from(Record::AudioEnd.encode()))
    }

    /// Push inbound bytes directly; the transport sink path uses the same
    /// decode loop.
    pub fn on_bytes(&self, bytes: &[u8]) {
        Self::ingest(&self.inner, &self.clock, bytes, self.cfg);
    }

    fn ingest(inner: &Mutex<ClientInner>, clock: &SessionClock, bytes: &[u8], cfg: StreamConfig) {
        let mut inner = inner.lock();
        inner.stats.bytes += bytes.len() as u64;
        inner.reader.push(bytes);

        loop {
            match inner.reader.next_record() {
                Ok(Some(record)) => {
                    inner.stats.records += 1;
                    let now = clock.now();
                    if let Err(e) = Self::apply_record(&mut inner, now, record, cfg) {
                        tracing::warn!("fatal decode error: {e}");
                        inner.stats.decode_errors += 1;
                        inner.unavailable = Some(e.to_string());
                        inner.reader.clear();
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("wire desync: {e}");
                    inner.stats.decode_errors += 1;
                    inner.unavailable = Some(e.to_string());
                    inner.reader.clear();
                    break;
                }
            }
        }
    }

    fn apply_record(
        inner: &mut ClientInner,
        now: anima_core::SessionTime,
        record: Record,
        cfg: StreamConfig,
    ) -> AnimaResult<()> {
        match record {
            Record::Normal => {
                if inner.resolved.is_none() {
                    inner.resolved = Some(ResponseKind::Normal);
                }
            }
            Record::Leave => {
                if inner.resolved.is_none() {
                    inner.resolved = Some(ResponseKind::Leave);
                }
            }
            Record::Failed { message } => match inner.resolved {
                Some(ResponseKind::Normal) => {
                    tracing::warn!("service failed mid-stream: {message}");
                    inner.unavailable = Some(message);
                }
                Some(_) => {
                    tracing::warn!("ignoring late failure record: {message}");
                }
                None => {
                    inner.resolved = Some(ResponseKind::Failed);
                    inner.failure_message = Some(message);
                }
            },
            Record::RequestId { id } => {
                inner.request_id = Some(RequestId::new(id));
            }
            Record::SessionStart { .. } => {
                tracing::warn!("ignoring inbound session start record");
            }

            Record::AudioStart {
                frame_rate,
                channels,
                sample_width,
            } => {
                inner.audio_format = Some(AudioFormat {
                    frame_rate,
                    channels,
                    sample_width,
                });
            }
            Record::AudioBody { data } => {
                let format = inner.audio_format.ok_or_else(|| {
                    AnimaError::InvalidWireFormat("audio body before audio start".into())
                })?;
                let clip = AudioClip::new(format, data.to_vec());
                let frames = clip.frames() as u32;
                let secs = clip.duration_secs();
                inner.audio_net.record_chunk(now, frames, secs);
                inner.stats.chunks += 1;
                if !inner.interrupted {
                    inner.audio_queue.push_back(clip);
                }
            }
            Record::AudioEnd => inner.audio_net.end(now),

            Record::MotionStart {
                joint_names,
                element_type,
                restpose,
                timeline_offset,
            } => {
                match inner.motion_meta.as_mut() {
                    Some(meta) => {
                        // Offset is meaningful only on the first chunk
                        meta.joint_names = joint_names;
                        meta.element_type = element_type;
                        meta.restpose = restpose;
                    }
                    None => {
                        inner.motion_meta = Some(MotionMeta {
                            joint_names,
                            element_type,
                            restpose,
                            timeline_offset,
                            first_body_pending: true,
                        });
                    }
                }
            }
            Record::MotionBody { data } => {
                let meta = inner.motion_meta.clone().ok_or_else(|| {
                    AnimaError::InvalidWireFormat("motion body before motion start".into())
                })?;
                let elements = decode_elements(&data, meta.element_type)?;
                let width = motion_row_width(meta.joint_names.len());
                let rows = row_count(elements.len(), width)?;

                let num_joints = meta.joint_names.len();
                let mut frames = Vec::with_capacity(rows);
                for row in elements.chunks_exact(width) {
                    let mut rotations = Vec::with_capacity(num_joints);
                    for j in 0..num_joints {
                        let mut m = [0.0f32; 9];
                        m.copy_from_slice(&row[j * 9..j * 9 + 9]);
                        rotations.push(Mat3(m));
                    }
                    let t = &row[num_joints * 9..num_joints * 9 + 3];
                    let r = &row[num_joints * 9 + 3..num_joints * 9 + 6];
                    frames.push(MotionFrame {
                        rotations,
                        translation: Vec3::new(t[0], t[1], t[2]),
                        reserved: [r[0], r[1], r[2]],
                    });
                }

                let timeline_start = if meta.first_body_pending {
                    if let Some(m) = inner.motion_meta.as_mut() {
                        m.first_body_pending = false;
                    }
                    meta.timeline_offset
                } else {
                    None
                };
                let clip = MotionClip::new(
                    meta.joint_names.clone(),
                    frames,
                    0,
                    meta.restpose.clone(),
                    timeline_start,
                )?;

                let n = clip.len() as u32;
                inner
                    .motion_net
                    .record_chunk(now, n, n as f64 / cfg.motion_fps);
                inner.stats.chunks += 1;
                if !inner.interrupted {
                    inner.motion_queue.push_back(clip);
                }
            }
            Record::MotionEnd => inner.motion_net.end(now),

            Record::FaceStart {
                blendshape_names,
                element_type,
                timeline_offset,
            } => match inner.face_meta.as_mut() {
                Some(meta) => {
                    meta.blendshape_names = blendshape_names;
                    meta.element_type = element_type;
                }
                None => {
                    inner.face_meta = Some(FaceMeta {
                        blendshape_names,
                        element_type,
                        timeline_offset,
                        first_body_pending: true,
                    });
                }
            },
            Record::FaceBody { data } => {
                let meta = inner.face_meta.clone().ok_or_else(|| {
                    AnimaError::InvalidWireFormat("face body before face start".into())
                })?;
                let elements = decode_elements(&data, meta.element_type)?;
                let width = face_row_width(meta.blendshape_names.len());
                row_count(elements.len(), width)?;

                let frames: Vec<FaceFrame> = elements
                    .chunks_exact(width)
                    .map(|row| FaceFrame {
                        weights: row.to_vec(),
                    })
                    .collect();

                let timeline_start = if meta.first_body_pending {
                    if let Some(m) = inner.face_meta.as_mut() {
                        m.first_body_pending = false;
                    }
                    meta.timeline_offset
                } else {
                    None
                };
                let clip =
                    FaceClip::new(meta.blendshape_names.clone(), frames, timeline_start)?;

                let n = clip.len() as u32;
                inner.face_net.record_chunk(now, n, n as f64 / cfg.face_fps);
                inner.stats.chunks += 1;
                if !inner.interrupted {
                    inner.face_queue.push_back(clip);
                }
            }
            Record::FaceEnd => inner.face_net.end(now),
        }
        Ok(())
    }

    /// Current classification: normal, leave, failed, or still pending
    pub fn response_type(&self) -> ResponseKind {
        self.inner.lock().resolved.unwrap_or(ResponseKind::Pending)
    }

    /// Failure message from a pre-normal `Failed` record
    pub fn failure_message(&self) -> Option<String> {
        self.inner.lock().failure_message.clone()
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.inner.lock().request_id
    }

    /// True once every channel exceeds its configured minimum, or all
    /// three have already ended
    pub fn stream_ready(&self) -> bool {
        let inner = self.inner.lock();
        let audio_ok = inner.audio_net.total_secs() >= self.cfg.min_audio_secs;
        let motion_ok = inner.motion_net.total_frames() >= self.cfg.min_motion_frames as u64;
        let face_ok = inner.face_net.total_frames() >= self.cfg.min_face_frames as u64;
        let all_ended =
            inner.audio_net.ended() && inner.motion_net.ended() && inner.face_net.ended();
        (audio_ok && motion_ok && face_ok) || all_ended
    }

    /// All three channels have stamped end-of-stream
    pub fn session_ended(&self) -> bool {
        let inner = self.inner.lock();
        inner.audio_net.ended() && inner.motion_net.ended() && inner.face_net.ended()
    }

    /// Drain everything buffered into one result; each chunk is returned
    /// exactly once across calls.
    ///
    /// Raises `ServiceUnavailable` after a mid-stream failure, and
    /// `StreamEnded` once all channels ended and nothing remains. After an
    /// interrupt, reads return empty channels instead.
    pub fn get_animation(&self) -> AnimaResult<TurnAnimation> {
        let mut inner = self.inner.lock();
        if let Some(message) = &inner.unavailable {
            return Err(AnimaError::ServiceUnavailable(message.clone()));
        }

        let motion_chunks: Vec<MotionClip> = inner.motion_queue.drain(..).collect();
        let face_chunks: Vec<FaceClip> = inner.face_queue.drain(..).collect();
        let audio_chunks: Vec<AudioClip> = inner.audio_queue.drain(..).collect();

        let result = TurnAnimation {
            motion: match motion_chunks.len() {
                0 => None,
                _ => Some(MotionClip::concat(&motion_chunks)?),
            },
            face: match face_chunks.len() {
                0 => None,
                _ => Some(FaceClip::concat(&face_chunks)?),
            },
            audio: match audio_chunks.len() {
                0 => None,
                _ => Some(AudioClip::concat(&audio_chunks)?),
            },
        };

        if result.is_empty() && !inner.interrupted {
            let all_ended =
                inner.audio_net.ended() && inner.motion_net.ended() && inner.face_net.ended();
            if all_ended {
                return Err(AnimaError::StreamEnded);
            }
        }
        Ok(result)
    }

    /// Drop all undelivered data; idempotent, safe on a finished session.
    /// Does not disconnect the transport.
    pub fn interrupt(&self) {
        let mut inner = self.inner.lock();
        if !inner.interrupted {
            tracing::debug!("session interrupted, dropping undelivered chunks");
        }
        inner.interrupted = true;
        inner.audio_queue.clear();
        inner.motion_queue.clear();
        inner.face_queue.clear();
    }

    pub fn health_snapshot(&self) -> HealthSnapshot {
        let inner = self.inner.lock();
        HealthSnapshot {
            audio: inner.audio_net.snapshot(),
            motion: inner.motion_net.snapshot(),
            face: inner.face_net.snapshot(),
        }
    }

    pub fn timeline_offsets(&self) -> TimelineOffsets {
        let inner = self.inner.lock();
        TimelineOffsets {
            motion: inner.motion_meta.as_ref().and_then(|m| m.timeline_offset),
            face: inner.face_meta.as_ref().and_then(|m| m.timeline_offset),
        }
    }

    pub fn stats(&self) -> StreamStats {
        self.inner.lock().stats
    }

    /// Declared audio stream parameters, once the start record arrived
    pub fn audio_format(&self) -> Option<AudioFormat> {
        self.inner.lock().audio_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anima_transport::{ChannelTransport, Transport};

    /// Transport stub for synchronous decode tests
    struct NullTransport;

    impl Transport for NullTransport {
        fn send(&self, _bytes: Bytes) -> AnimaResult<()> {
            Ok(())
        }
        fn set_sink(&self, _sink: anima_transport::ByteSink) {}
        fn disconnect(&self) {}
        fn is_connected(&self) -> bool {
            true
        }
    }

    fn client() -> StreamingSessionClient {
        StreamingSessionClient::connect(
            Arc::new(NullTransport),
            SessionClock::start(),
            StreamConfig::default(),
        )
    }

    fn feed(client: &StreamingSessionClient, records: &[Record]) {
        for record in records {
            client.on_bytes(&record.encode());
        }
    }

    fn identity_motion_body(num_joints: usize) -> Record {
        let width = motion_row_width(num_joints);
        let mut row = vec![0.0f32; width];
        for j in 0..num_joints {
            row[j * 9] = 1.0;
            row[j * 9 + 4] = 1.0;
            row[j * 9 + 8] = 1.0;
        }
        let bytes: Vec<u8> = row.iter().flat_map(|v| v.to_le_bytes()).collect();
        Record::MotionBody {
            data: Bytes::from(bytes),
        }
    }

    fn motion_start(num_joints: usize, offset: Option<i32>) -> Record {
        Record::MotionStart {
            joint_names: (0..num_joints).map(|i| format!("j{i}")).collect(),
            element_type: ElementType::F32,
            restpose: None,
            timeline_offset: offset,
        }
    }

    #[test]
    fn test_two_joint_identity_scenario() {
        let client = client();
        feed(
            &client,
            &[Record::Normal, motion_start(2, None), identity_motion_body(2)],
        );

        // Below thresholds and nothing ended yet
        assert!(!client.stream_ready());

        let anim = client.get_animation().unwrap();
        let motion = anim.motion.unwrap();
        assert_eq!(motion.len(), 1);
        assert_eq!(motion.joint_names().len(), 2);
        let quats = motion.quats(0).unwrap();
        for q in quats {
            assert!(q.angle_to_identity() < 1e-5);
        }
        assert!(anim.face.is_none());
        assert!(anim.audio.is_none());

        feed(&client, &[Record::MotionEnd]);
        assert!(!client.stream_ready());
        feed(&client, &[Record::AudioEnd, Record::FaceEnd]);
        assert!(client.stream_ready());
    }

    #[test]
    fn test_chunks_returned_exactly_once() {
        let client = client();
        feed(&client, &[motion_start(1, None), identity_motion_body(1)]);

        assert_eq!(client.get_animation().unwrap().motion.unwrap().len(), 1);
        // Second drain with no intervening append is empty
        assert!(client.get_animation().unwrap().motion.is_none());

        feed(&client, &[identity_motion_body(1)]);
        assert_eq!(client.get_animation().unwrap().motion.unwrap().len(), 1);
    }

    #[test]
    fn test_failed_before_normal_is_classified_not_raised() {
        let client = client();
        feed(
            &client,
            &[Record::Failed {
                message: "capacity".into(),
            }],
        );
        assert_eq!(client.response_type(), ResponseKind::Failed);
        assert_eq!(client.failure_message().as_deref(), Some("capacity"));
        assert!(client.get_animation().is_ok());
    }

    #[test]
    fn test_failed_after_normal_escalates() {
        let client = client();
        feed(
            &client,
            &[
                Record::Normal,
                Record::Failed {
                    message: "backend lost".into(),
                },
            ],
        );
        assert_eq!(client.response_type(), ResponseKind::Normal);
        assert!(matches!(
            client.get_animation(),
            Err(AnimaError::ServiceUnavailable(_))
        ));
        // Every subsequent read keeps raising
        assert!(matches!(
            client.get_animation(),
            Err(AnimaError::ServiceUnavailable(_))
        ));
    }

    #[test]
    fn test_interrupt_drops_data_and_reads_stay_empty() {
        let client = client();
        feed(&client, &[motion_start(1, None), identity_motion_body(1)]);
        client.interrupt();
        client.interrupt();

        let anim = client.get_animation().unwrap();
        assert!(anim.is_empty());

        // Data arriving after the interrupt is dropped too
        feed(&client, &[identity_motion_body(1)]);
        assert!(client.get_animation().unwrap().is_empty());
    }

    #[test]
    fn test_stream_ended_raises_after_drain() {
        let client = client();
        feed(
            &client,
            &[
                motion_start(1, None),
                identity_motion_body(1),
                Record::MotionEnd,
                Record::AudioEnd,
                Record::FaceEnd,
            ],
        );
        // First drain still yields the buffered clip
        assert!(client.get_animation().unwrap().motion.is_some());
        // Nothing remains: clean completion signal
        assert!(matches!(
            client.get_animation(),
            Err(AnimaError::StreamEnded)
        ));
    }

    #[test]
    fn test_body_before_start_is_fatal() {
        let client = client();
        feed(&client, &[identity_motion_body(1)]);
        assert!(matches!(
            client.get_animation(),
            Err(AnimaError::ServiceUnavailable(_))
        ));
    }

    #[test]
    fn test_timeline_offset_only_on_first_chunk() {
        let client = client();
        feed(
            &client,
            &[
                motion_start(1, Some(6)),
                identity_motion_body(1),
                identity_motion_body(1),
            ],
        );
        let motion = client.get_animation().unwrap().motion.unwrap();
        assert_eq!(motion.len(), 2);
        assert_eq!(motion.timeline_start(), Some(6));

        // Later chunks do not restate the offset
        feed(&client, &[identity_motion_body(1)]);
        let next = client.get_animation().unwrap().motion.unwrap();
        assert_eq!(next.timeline_start(), None);
    }

    #[test]
    fn test_shift_computation() {
        let offsets = TimelineOffsets {
            motion: Some(4),
            face: Some(2),
        };
        // Smallest observed offset is 0 (audio), nothing negative
        assert_eq!(
            offsets.shifts(),
            ChannelShifts {
                audio: 0,
                motion: 4,
                face: 2
            }
        );

        let offsets = TimelineOffsets {
            motion: Some(-3),
            face: None,
        };
        // Negative minimum translates the block forward
        assert_eq!(
            offsets.shifts(),
            ChannelShifts {
                audio: 3,
                motion: 0,
                face: 3
            }
        );
    }

    #[test]
    fn test_request_id_and_audio_meta() {
        let client = client();
        feed(
            &client,
            &[
                Record::RequestId { id: 99 },
                Record::AudioStart {
                    frame_rate: 24_000,
                    channels: 1,
                    sample_width: 2,
                },
                Record::AudioBody {
                    data: Bytes::from(vec![0u8; 4800]),
                },
            ],
        );
        assert_eq!(client.request_id(), Some(RequestId::new(99)));
        assert_eq!(client.audio_format().unwrap().frame_rate, 24_000);
        let audio = client.get_animation().unwrap().audio.unwrap();
        assert_eq!(audio.frames(), 2400);
        assert!((audio.duration_secs() - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_decode_through_channel_transport() {
        let (transport, service) = ChannelTransport::pair();
        let client = StreamingSessionClient::connect(
            transport,
            SessionClock::start(),
            StreamConfig::default(),
        );

        service.inject(Record::Normal.encode()).unwrap();
        service.inject(motion_start(1, None).encode()).unwrap();
        service.inject(identity_motion_body(1).encode()).unwrap();

        // Give the pump task a moment to deliver
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(client.response_type(), ResponseKind::Normal);
        assert_eq!(client.get_animation().unwrap().motion.unwrap().len(), 1);
    }
}
