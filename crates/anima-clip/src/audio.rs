//! Audio clips - interleaved PCM segments

use serde::{Deserialize, Serialize};

use anima_core::{AnimaError, AnimaResult};

/// PCM stream parameters, as declared by the audio channel start record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Frames per second
    pub frame_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Bytes per sample
    pub sample_width: u16,
}

impl AudioFormat {
    /// Bytes per PCM frame across all channels
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.sample_width as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        AudioFormat {
            frame_rate: 16_000,
            channels: 1,
            sample_width: 2,
        }
    }
}

/// One segment of interleaved PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub format: AudioFormat,
    pub data: Vec<u8>,
}

impl AudioClip {
    pub fn new(format: AudioFormat, data: Vec<u8>) -> Self {
        AudioClip { format, data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whole PCM frames contained in the payload
    pub fn frames(&self) -> usize {
        let fb = self.format.frame_bytes();
        if fb == 0 {
            return 0;
        }
        self.data.len() / fb
    }

    pub fn duration_secs(&self) -> f64 {
        if self.format.frame_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.format.frame_rate as f64
    }

    /// Concatenate clips in order; all inputs must share the format
    pub fn concat(clips: &[AudioClip]) -> AnimaResult<AudioClip> {
        let first = clips
            .first()
            .ok_or_else(|| AnimaError::ClipNameMismatch("no clips to concatenate".into()))?;
        for clip in &clips[1..] {
            if clip.format != first.format {
                return Err(AnimaError::ClipNameMismatch(format!(
                    "audio format mismatch: {:?} vs {:?}",
                    first.format, clip.format
                )));
            }
        }
        let mut data = Vec::with_capacity(clips.iter().map(|c| c.data.len()).sum());
        for clip in clips {
            data.extend_from_slice(&clip.data);
        }
        Ok(AudioClip {
            format: first.format,
            data,
        })
    }
}
