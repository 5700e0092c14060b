//! Animation Data Tests
//!
//! Tests for:
//! - KeyframeTrack linear/step/cubic interpolation
//! - Interpolatable trait implementations (f32, Vec3, Quat)
//! - KeyframeCursor O(1) optimization and binary search fallback
//! - Clip validation and root-motion deltas
//! - Sample / SampleBuffer blending

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use myth_animgraph::animation::{
    Clip, Interpolatable, InterpolationMode, KeyframeCursor, KeyframeTrack, ROOT_MOTION_EPSILON,
    RootMotion, Sample, SampleBuffer, TargetPath, Track, TrackData, TrackMeta, blend_samples,
};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn sample_f32(track: &KeyframeTrack<f32>, time: f32) -> f32 {
    track.sample(time).unwrap_or(f32::NAN)
}

// ============================================================================
// KeyframeTrack: Linear Interpolation (f32)
// ============================================================================

#[test]
fn track_linear_f32_midpoint() {
    let track = KeyframeTrack::new(vec![0.0, 1.0], vec![0.0_f32, 10.0], InterpolationMode::Linear);

    let mut cursor = KeyframeCursor::default();
    let val = track.sample_with_cursor(0.5, &mut cursor);
    assert_eq!(val, Some(5.0));
}

#[test]
fn track_linear_f32_exact_keyframe() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0, 2.0],
        vec![0.0_f32, 10.0, 20.0],
        InterpolationMode::Linear,
    );

    let mut cursor = KeyframeCursor::default();
    assert_eq!(track.sample_with_cursor(0.0, &mut cursor), Some(0.0));
    assert_eq!(track.sample_with_cursor(1.0, &mut cursor), Some(10.0));
    assert_eq!(track.sample_with_cursor(2.0, &mut cursor), Some(20.0));
}

#[test]
fn track_linear_f32_clamps_outside_range() {
    let track = KeyframeTrack::new(vec![1.0, 2.0], vec![10.0_f32, 20.0], InterpolationMode::Linear);

    assert!(approx(sample_f32(&track, 0.0), 10.0));
    assert!(approx(sample_f32(&track, 5.0), 20.0));
}

#[test]
fn track_step_holds_value() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0, 2.0],
        vec![0.0_f32, 10.0, 20.0],
        InterpolationMode::Step,
    );

    assert!(approx(sample_f32(&track, 0.99), 0.0));
    assert!(approx(sample_f32(&track, 1.0), 10.0));
    assert!(approx(sample_f32(&track, 1.5), 10.0));
}

#[test]
fn track_linear_vec3() {
    let track = KeyframeTrack::new(
        vec![0.0, 2.0],
        vec![Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0)],
        InterpolationMode::Linear,
    );

    let v = track.sample(1.0).unwrap_or(Vec3::NAN);
    assert!(v.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), EPSILON));
}

#[test]
fn track_linear_quat_slerp() {
    let end = Quat::from_rotation_y(FRAC_PI_2);
    let track = KeyframeTrack::new(vec![0.0, 1.0], vec![Quat::IDENTITY, end], InterpolationMode::Linear);

    let q = track.sample(0.5).unwrap_or(Quat::NAN);
    let expected = Quat::IDENTITY.slerp(end, 0.5);
    assert!(q.angle_between(expected) < 1e-4);
}

#[test]
fn track_cubic_f32_endpoints() {
    // [in_tangent, value, out_tangent] per key.
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![0.0_f32, 0.0, 0.0, 0.0, 10.0, 0.0],
        InterpolationMode::CubicSpline,
    );

    assert!(approx(sample_f32(&track, 0.0), 0.0));
    assert!(approx(sample_f32(&track, 1.0), 10.0));
    // Flat tangents: smoothstep midpoint.
    assert!(approx(sample_f32(&track, 0.5), 5.0));
}

#[test]
fn empty_track_samples_nothing() {
    let track: KeyframeTrack<f32> = KeyframeTrack::new(Vec::new(), Vec::new(), InterpolationMode::Linear);
    assert!(!track.is_valid());
    assert_eq!(track.sample(0.0), None);

    let mut cursor = KeyframeCursor::default();
    assert_eq!(track.sample_with_cursor(0.0, &mut cursor), None);
}

// ============================================================================
// KeyframeCursor
// ============================================================================

#[test]
fn cursor_matches_stateless_sampling() {
    let times: Vec<f32> = (0..20).map(|i| i as f32).collect();
    let values: Vec<f32> = times.iter().map(|t| t * t).collect();
    let track = KeyframeTrack::new(times, values, InterpolationMode::Linear);

    let mut cursor = KeyframeCursor::default();
    let mut t = 0.0;
    while t < 20.0 {
        let with_cursor = track.sample_with_cursor(t, &mut cursor);
        assert_eq!(with_cursor, track.sample(t), "mismatch at t={t}");
        t += 0.37;
    }
}

#[test]
fn cursor_forward_then_jump_back() {
    let times: Vec<f32> = (0..100).map(|i| i as f32).collect();
    let values: Vec<f32> = times.clone();
    let track = KeyframeTrack::new(times, values, InterpolationMode::Linear);

    let mut cursor = KeyframeCursor::default();
    for i in 0..90 {
        track.sample_with_cursor(i as f32 + 0.5, &mut cursor);
    }
    assert_eq!(cursor.last_index, 89);

    // Looping back to the start falls back to binary search.
    let v = track.sample_with_cursor(2.5, &mut cursor);
    assert_eq!(v, Some(2.5));
    assert_eq!(cursor.last_index, 2);
}

#[test]
fn cursor_single_keyframe() {
    let track = KeyframeTrack::constant(7.0_f32);
    let mut cursor = KeyframeCursor::default();
    assert_eq!(track.sample_with_cursor(100.0, &mut cursor), Some(7.0));
}

// ============================================================================
// Interpolatable Implementations
// ============================================================================

#[test]
fn interpolatable_f32_linear() {
    assert!(approx(f32::interpolate_linear(0.0, 10.0, 0.25), 2.5));
}

#[test]
fn interpolatable_vec3_linear() {
    let result = Vec3::interpolate_linear(Vec3::ZERO, Vec3::new(10.0, 20.0, 30.0), 0.5);
    assert!(result.abs_diff_eq(Vec3::new(5.0, 10.0, 15.0), EPSILON));
}

#[test]
fn interpolatable_quat_linear_is_slerp() {
    let b = Quat::from_rotation_y(FRAC_PI_2);
    let result = Quat::interpolate_linear(Quat::IDENTITY, b, 0.5);
    assert!(result.angle_between(Quat::IDENTITY.slerp(b, 0.5)) < 1e-4);
}

// ============================================================================
// Clip
// ============================================================================

fn walking_root() -> RootMotion {
    // Moves 1 unit per frame along +Z and turns 90 degrees over 40 frames.
    RootMotion::new(
        KeyframeTrack::new(
            vec![0.0, 40.0],
            vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 40.0)],
            InterpolationMode::Linear,
        ),
        KeyframeTrack::new(
            vec![0.0, 40.0],
            vec![Quat::IDENTITY, Quat::from_rotation_y(FRAC_PI_2)],
            InterpolationMode::Linear,
        ),
    )
}

#[test]
fn clip_validation_rejects_bad_lengths_and_tracks() {
    assert!(Clip::new("ok", 30.0, 30.0, Vec::new()).validate().is_none());
    assert!(Clip::new("zero", 0.0, 30.0, Vec::new()).validate().is_some());
    assert!(Clip::new("nan", f32::NAN, 30.0, Vec::new()).validate().is_some());
    assert!(Clip::new("no_fps", 30.0, 0.0, Vec::new()).validate().is_some());

    let broken = Track {
        meta: TrackMeta::new("root", TargetPath::Translation),
        data: TrackData::Vector3(KeyframeTrack::new(
            vec![0.0, 1.0],
            vec![Vec3::ZERO],
            InterpolationMode::Linear,
        )),
    };
    assert!(Clip::new("broken", 30.0, 30.0, vec![broken]).validate().is_some());
}

#[test]
fn clip_validation_rejects_keys_past_length() {
    let track = |end: f32| Track {
        meta: TrackMeta::new("root", TargetPath::Translation),
        data: TrackData::Vector3(KeyframeTrack::new(
            vec![0.0, end],
            vec![Vec3::ZERO, Vec3::X],
            InterpolationMode::Linear,
        )),
    };
    assert_eq!(track(45.0).data.end_time(), 45.0);
    assert!(Clip::new("exact", 30.0, 30.0, vec![track(30.0)]).validate().is_none());
    assert!(Clip::new("short", 30.0, 30.0, vec![track(20.0)]).validate().is_none());

    let reason = Clip::new("long", 30.0, 30.0, vec![track(45.0)]).validate();
    assert!(reason.is_some_and(|r| r.contains("45")));

    let clip = Clip::new("walk", 30.0, 30.0, Vec::new()).with_root_motion(walking_root());
    assert!(clip.validate().is_some());
}

#[test]
fn root_motion_without_curves_is_none() {
    let clip = Clip::new("idle", 40.0, 30.0, Vec::new());
    assert!(!clip.has_root_motion());
    assert!(clip.root_motion_delta(0.0, 10.0).is_none());
}

#[test]
fn root_motion_forward_window() {
    let clip = Clip::new("walk", 40.0, 30.0, Vec::new()).with_root_motion(walking_root());
    let delta = clip.root_motion_delta(10.0, 20.0).unwrap_or(Sample::IDENTITY);

    assert!(delta.translation.abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-4));
    let expected = Quat::from_rotation_y(FRAC_PI_2 * 0.25);
    assert!(delta.rotation.angle_between(expected) < 1e-4);
    assert!(delta.scale.abs_diff_eq(Vec3::ZERO, EPSILON));
}

#[test]
fn root_motion_degenerate_window_is_identity() {
    let clip = Clip::new("walk", 40.0, 30.0, Vec::new()).with_root_motion(walking_root());
    let delta = clip.root_motion_delta(12.0, 12.0 + ROOT_MOTION_EPSILON * 0.5);
    assert_eq!(delta, Some(Sample::DELTA_IDENTITY));
}

#[test]
fn root_motion_wrapping_window_composes_both_spans() {
    let clip = Clip::new("walk", 40.0, 30.0, Vec::new()).with_root_motion(walking_root());
    let delta = clip.root_motion_delta(35.0, 5.0).unwrap_or(Sample::IDENTITY);

    // 5 frames to the loop point plus 5 frames after it.
    assert!(delta.translation.abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-4));
    let expected = Quat::from_rotation_y(FRAC_PI_2 * 0.25);
    assert!(delta.rotation.angle_between(expected) < 1e-4);
}

#[test]
fn root_motion_round_trip() {
    let clip = Clip::new("walk", 40.0, 30.0, Vec::new()).with_root_motion(walking_root());
    for t in [3.0_f32, 7.5, 12.0, 18.0] {
        let end = (2.0 * t) % clip.length;
        let (Some(first), Some(second), Some(whole)) = (
            clip.root_motion_delta(0.0, t),
            clip.root_motion_delta(t, end),
            clip.root_motion_delta(0.0, end),
        ) else {
            panic!("clip has root motion");
        };
        assert!(first.then(&second).abs_diff_eq(&whole, 1e-4), "t={t}");
    }
}

// ============================================================================
// Blending
// ============================================================================

fn pose(offset: f32) -> SampleBuffer {
    SampleBuffer::from_samples(vec![
        Sample::new(Vec3::splat(offset), Quat::from_rotation_x(offset * 0.1), Vec3::ONE),
        Sample::new(Vec3::Y * offset, Quat::from_rotation_z(offset * 0.2), Vec3::splat(1.0 + offset)),
    ])
}

#[test]
fn blend_endpoints_are_exact() {
    let a = pose(1.0);
    let b = pose(3.0);
    let mut out = SampleBuffer::new(2);

    blend_samples(&a, &b, &mut out, 0.0);
    assert_eq!(out, a);

    blend_samples(&a, &b, &mut out, 1.0);
    assert_eq!(out, b);
}

#[test]
fn blend_midpoint_lerps_and_slerps() {
    let a = pose(0.0);
    let b = pose(2.0);
    let mut out = SampleBuffer::new(2);

    blend_samples(&a, &b, &mut out, 0.5);
    assert!(out.samples[0].translation.abs_diff_eq(Vec3::ONE, EPSILON));
    assert!(out.samples[1].scale.abs_diff_eq(Vec3::splat(2.0), EPSILON));
    let expected = Quat::IDENTITY.slerp(Quat::from_rotation_z(0.4), 0.5);
    assert!(out.samples[1].rotation.angle_between(expected) < 1e-4);
}

#[test]
fn blend_root_motion_against_identity() {
    let motion = Sample::new(Vec3::new(0.0, 0.0, 4.0), Quat::IDENTITY, Vec3::ZERO);

    let mut a = pose(0.0);
    let b = pose(0.0);
    let mut out = SampleBuffer::new(2);

    blend_samples(&a, &b, &mut out, 0.5);
    assert_eq!(out.root_motion, None);

    a.root_motion = Some(motion);
    blend_samples(&a, &b, &mut out, 0.25);
    let blended = out.root_motion.unwrap_or(Sample::IDENTITY);
    assert!(blended.translation.abs_diff_eq(Vec3::new(0.0, 0.0, 3.0), EPSILON));
    assert!(blended.scale.abs_diff_eq(Vec3::ZERO, EPSILON));
}
