//! Pose-resolution hot path benchmark
//!
//! The render loop calls `resolve_pose` every tick at display rate; this
//! tracks the per-call cost for a typical humanoid rig.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use anima_clip::{FaceClip, FaceFrame, Mat3, MotionClip, MotionFrame, Vec3};
use anima_playback::{AnimationPlaybackBuffer, PlaybackConfig, Tier};

fn rig_names(n: usize, prefix: &str) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}_{i}")).collect()
}

fn motion_clip(joints: &[String], frames: usize) -> MotionClip {
    let data: Vec<MotionFrame> = (0..frames)
        .map(|i| {
            let angle = i as f32 * 0.01;
            let (s, c) = angle.sin_cos();
            MotionFrame {
                rotations: vec![Mat3([c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0]); joints.len()],
                translation: Vec3::new(i as f32 * 0.001, 0.0, 0.0),
                reserved: [0.0; 3],
            }
        })
        .collect();
    MotionClip::new(joints.to_vec(), data, 0, None, None).unwrap()
}

fn face_clip(shapes: &[String], frames: usize) -> FaceClip {
    let data: Vec<FaceFrame> = (0..frames)
        .map(|i| FaceFrame {
            weights: vec![(i % 10) as f32 * 0.1; shapes.len()],
        })
        .collect();
    FaceClip::new(shapes.to_vec(), data, None).unwrap()
}

fn bench_resolve_pose(c: &mut Criterion) {
    let joints = rig_names(60, "joint");
    let shapes = rig_names(52, "shape");

    let mut buffer =
        AnimationPlaybackBuffer::new(joints.clone(), shapes.clone(), PlaybackConfig::default());
    buffer
        .register_motion_variant("idle", motion_clip(&joints, 120), Some((0, 120)))
        .unwrap();
    buffer.switch_joint_animation("idle", Tier::Idle).unwrap();
    buffer
        .append_streamed_motion(&motion_clip(&joints, 300))
        .unwrap();
    buffer
        .append_streamed_face(&face_clip(&shapes, 300))
        .unwrap();
    buffer.set_active_tier(Tier::Streamed);

    c.bench_function("resolve_pose 60 joints 52 shapes", |b| {
        let mut frame = 0usize;
        b.iter(|| {
            frame = (frame + 1) % 300;
            let (pose, face) = buffer.resolve_pose(black_box(frame % 120), black_box(frame), 0.7);
            black_box((pose.rotations.len(), face.weights.len()));
        })
    });
}

criterion_group!(benches, bench_resolve_pose);
criterion_main!(benches);
