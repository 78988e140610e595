//! Facial expression clips

use serde::{Deserialize, Serialize};

use anima_core::{AnimaError, AnimaResult};

/// One frame of facial expression: a scalar weight per blendshape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceFrame {
    pub weights: Vec<f32>,
}

impl FaceFrame {
    /// All-zero weights (neutral expression)
    pub fn neutral(num_blendshapes: usize) -> Self {
        FaceFrame {
            weights: vec![0.0; num_blendshapes],
        }
    }
}

/// One segment of facial animation for a named blendshape set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceClip {
    blendshape_names: Vec<String>,
    frames: Vec<FaceFrame>,
    timeline_start: Option<i32>,
}

impl FaceClip {
    /// Construct a clip, validating that every frame carries exactly one
    /// weight per named blendshape.
    pub fn new(
        blendshape_names: Vec<String>,
        frames: Vec<FaceFrame>,
        timeline_start: Option<i32>,
    ) -> AnimaResult<Self> {
        for frame in &frames {
            if frame.weights.len() != blendshape_names.len() {
                return Err(AnimaError::ClipShapeMismatch {
                    names: blendshape_names.len(),
                    elements: frame.weights.len(),
                });
            }
        }
        Ok(FaceClip {
            blendshape_names,
            frames,
            timeline_start,
        })
    }

    pub fn empty(blendshape_names: Vec<String>) -> Self {
        FaceClip {
            blendshape_names,
            frames: Vec::new(),
            timeline_start: None,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn blendshape_names(&self) -> &[String] {
        &self.blendshape_names
    }

    pub fn frames(&self) -> &[FaceFrame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&FaceFrame> {
        self.frames.get(index)
    }

    pub fn timeline_start(&self) -> Option<i32> {
        self.timeline_start
    }

    pub fn set_timeline_start(&mut self, start: Option<i32>) {
        self.timeline_start = start;
    }

    /// Concatenate clips in order; all inputs must share the blendshape
    /// name list. Timeline start comes from the first clip.
    pub fn concat(clips: &[FaceClip]) -> AnimaResult<FaceClip> {
        let first = clips
            .first()
            .ok_or_else(|| AnimaError::ClipNameMismatch("no clips to concatenate".into()))?;
        for clip in &clips[1..] {
            if clip.blendshape_names != first.blendshape_names {
                return Err(AnimaError::ClipNameMismatch(format!(
                    "expected {:?}, got {:?}",
                    first.blendshape_names, clip.blendshape_names
                )));
            }
        }
        let frames = clips.iter().flat_map(|c| c.frames.iter().cloned()).collect();
        Ok(FaceClip {
            blendshape_names: first.blendshape_names.clone(),
            frames,
            timeline_start: first.timeline_start,
        })
    }

    /// Copy out the frame range `start..end`
    pub fn slice(&self, start: usize, end: usize) -> AnimaResult<FaceClip> {
        if start > end || end > self.frames.len() {
            return Err(AnimaError::SliceOutOfRange {
                start,
                end,
                len: self.frames.len(),
            });
        }
        Ok(FaceClip {
            blendshape_names: self.blendshape_names.clone(),
            frames: self.frames[start..end].to_vec(),
            timeline_start: self.timeline_start,
        })
    }

    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_dict(value: &serde_json::Value) -> AnimaResult<FaceClip> {
        let clip: FaceClip = serde_json::from_value(value.clone())
            .map_err(|e| AnimaError::MalformedDict(e.to_string()))?;
        FaceClip::new(clip.blendshape_names, clip.frames, clip.timeline_start)
    }
}
