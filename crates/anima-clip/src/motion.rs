//! Skeletal motion clips

use serde::{Deserialize, Serialize};

use anima_core::{AnimaError, AnimaResult};

use crate::{Mat3, Quat, Vec3};

/// One frame of skeletal motion: a rotation per joint plus the root
/// translation. The reserved tail is decoded from the wire and preserved
/// untouched for compatibility; nothing consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionFrame {
    pub rotations: Vec<Mat3>,
    pub translation: Vec3,
    pub reserved: [f32; 3],
}

impl MotionFrame {
    /// Identity rotations, zero translation
    pub fn rest(num_joints: usize) -> Self {
        MotionFrame {
            rotations: vec![Mat3::IDENTITY; num_joints],
            translation: Vec3::ZERO,
            reserved: [0.0; 3],
        }
    }
}

/// One segment of skeletal motion for a named joint set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionClip {
    joint_names: Vec<String>,
    frames: Vec<MotionFrame>,
    pub priority: i32,
    pub restpose: Option<String>,
    timeline_start: Option<i32>,
}

impl MotionClip {
    /// Construct a clip, validating that every frame carries exactly one
    /// rotation per named joint.
    pub fn new(
        joint_names: Vec<String>,
        frames: Vec<MotionFrame>,
        priority: i32,
        restpose: Option<String>,
        timeline_start: Option<i32>,
    ) -> AnimaResult<Self> {
        for frame in &frames {
            if frame.rotations.len() != joint_names.len() {
                return Err(AnimaError::ClipShapeMismatch {
                    names: joint_names.len(),
                    elements: frame.rotations.len(),
                });
            }
        }
        Ok(MotionClip {
            joint_names,
            frames,
            priority,
            restpose,
            timeline_start,
        })
    }

    /// Empty clip over a joint set
    pub fn empty(joint_names: Vec<String>) -> Self {
        MotionClip {
            joint_names,
            frames: Vec::new(),
            priority: 0,
            restpose: None,
            timeline_start: None,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    pub fn frames(&self) -> &[MotionFrame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&MotionFrame> {
        self.frames.get(index)
    }

    /// Scheduling offset from session start; meaningful only on the first
    /// chunk of a network segment.
    pub fn timeline_start(&self) -> Option<i32> {
        self.timeline_start
    }

    /// The sole post-construction mutation
    pub fn set_timeline_start(&mut self, start: Option<i32>) {
        self.timeline_start = start;
    }

    /// Per-joint unit quaternions for one frame
    pub fn quats(&self, index: usize) -> Option<Vec<Quat>> {
        self.frames
            .get(index)
            .map(|f| f.rotations.iter().map(Mat3::to_quat).collect())
    }

    /// Concatenate clips in order. All inputs must share the same joint
    /// name list; priority, restpose, and timeline start come from the
    /// first clip.
    pub fn concat(clips: &[MotionClip]) -> AnimaResult<MotionClip> {
        let first = clips
            .first()
            .ok_or_else(|| AnimaError::ClipNameMismatch("no clips to concatenate".into()))?;
        for clip in &clips[1..] {
            if clip.joint_names != first.joint_names {
                return Err(AnimaError::ClipNameMismatch(format!(
                    "expected {:?}, got {:?}",
                    first.joint_names, clip.joint_names
                )));
            }
        }
        let frames = clips.iter().flat_map(|c| c.frames.iter().cloned()).collect();
        Ok(MotionClip {
            joint_names: first.joint_names.clone(),
            frames,
            priority: first.priority,
            restpose: first.restpose.clone(),
            timeline_start: first.timeline_start,
        })
    }

    /// Copy out the frame range `start..end`
    pub fn slice(&self, start: usize, end: usize) -> AnimaResult<MotionClip> {
        if start > end || end > self.frames.len() {
            return Err(AnimaError::SliceOutOfRange {
                start,
                end,
                len: self.frames.len(),
            });
        }
        Ok(MotionClip {
            joint_names: self.joint_names.clone(),
            frames: self.frames[start..end].to_vec(),
            priority: self.priority,
            restpose: self.restpose.clone(),
            timeline_start: self.timeline_start,
        })
    }

    /// Serialize the full numeric content; lossless for f32 inputs
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Rebuild from `to_dict` output, re-validating the shape invariant
    pub fn from_dict(value: &serde_json::Value) -> AnimaResult<MotionClip> {
        let clip: MotionClip = serde_json::from_value(value.clone())
            .map_err(|e| AnimaError::MalformedDict(e.to_string()))?;
        MotionClip::new(
            clip.joint_names,
            clip.frames,
            clip.priority,
            clip.restpose,
            clip.timeline_start,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("joint_{i}")).collect()
    }

    fn clip_with(frames: usize, joints: usize) -> MotionClip {
        let frame_data: Vec<MotionFrame> = (0..frames)
            .map(|i| {
                let mut f = MotionFrame::rest(joints);
                f.translation = Vec3::new(i as f32, 0.0, 0.0);
                f
            })
            .collect();
        MotionClip::new(names(joints), frame_data, 0, None, None).unwrap()
    }

    #[test]
    fn test_shape_mismatch_fails_construction() {
        let frames = vec![MotionFrame::rest(3)];
        let err = MotionClip::new(names(2), frames, 0, None, None).unwrap_err();
        assert!(matches!(
            err,
            AnimaError::ClipShapeMismatch {
                names: 2,
                elements: 3
            }
        ));
    }

    #[test]
    fn test_concat_length_is_sum() {
        let a = clip_with(3, 2);
        let b = clip_with(5, 2);
        let joined = MotionClip::concat(&[a, b]).unwrap();
        assert_eq!(joined.len(), 8);
    }

    #[test]
    fn test_concat_rejects_mismatched_names() {
        let a = clip_with(1, 2);
        let b = clip_with(1, 3);
        assert!(matches!(
            MotionClip::concat(&[a, b]),
            Err(AnimaError::ClipNameMismatch(_))
        ));
    }

    #[test]
    fn test_slice_then_reconcat_reproduces_clip() {
        let clip = clip_with(7, 2);
        for split in 0..=clip.len() {
            let head = clip.slice(0, split).unwrap();
            let tail = clip.slice(split, clip.len()).unwrap();
            let parts: Vec<MotionClip> = [head, tail]
                .into_iter()
                .filter(|c| !c.is_empty())
                .collect();
            let rejoined = MotionClip::concat(&parts).unwrap();
            assert_eq!(rejoined.frames(), clip.frames());
        }
    }

    #[test]
    fn test_slice_out_of_range() {
        let clip = clip_with(2, 1);
        assert!(clip.slice(1, 5).is_err());
        assert!(clip.slice(2, 1).is_err());
    }

    #[test]
    fn test_dict_roundtrip() {
        let mut clip = clip_with(3, 2);
        clip.set_timeline_start(Some(12));
        let back = MotionClip::from_dict(&clip.to_dict()).unwrap();
        assert_eq!(back, clip);
    }

    #[test]
    fn test_timeline_start_setter() {
        let mut clip = clip_with(1, 1);
        assert_eq!(clip.timeline_start(), None);
        clip.set_timeline_start(Some(-4));
        assert_eq!(clip.timeline_start(), Some(-4));
    }

    proptest! {
        #[test]
        fn prop_dict_roundtrip_preserves_values(
            tx in proptest::collection::vec(-1000.0f32..1000.0, 1..6),
        ) {
            let frames: Vec<MotionFrame> = tx
                .iter()
                .map(|&v| {
                    let mut f = MotionFrame::rest(2);
                    f.translation = Vec3::new(v, -v, v * 0.5);
                    f.reserved = [v, 0.0, -v];
                    f
                })
                .collect();
            let clip = MotionClip::new(names(2), frames, 1, Some("neutral".into()), None).unwrap();
            let back = MotionClip::from_dict(&clip.to_dict()).unwrap();
            prop_assert_eq!(back, clip);
        }

        #[test]
        fn prop_slice_reconcat_identity(len in 1usize..12, split in 0usize..12) {
            let split = split.min(len);
            let clip = clip_with(len, 2);
            let head = clip.slice(0, split).unwrap();
            let tail = clip.slice(split, len).unwrap();
            let parts: Vec<MotionClip> = [head, tail]
                .into_iter()
                .filter(|c| !c.is_empty())
                .collect();
            let rejoined = MotionClip::concat(&parts).unwrap();
            prop_assert_eq!(rejoined.frames(), clip.frames());
        }
    }
}
