use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::animation::binding::TargetPath;
use crate::animation::sample::Sample;
use crate::animation::timeline::{AudioCue, EventKey, HitboxKey, Timeline};
use crate::animation::tracks::KeyframeTrack;

/// Below this window size a root-motion delta is the identity.
pub const ROOT_MOTION_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct TrackMeta {
    pub node_name: String,
    pub target: TargetPath,
}

impl TrackMeta {
    #[must_use]
    pub fn new(node_name: impl Into<String>, target: TargetPath) -> Self {
        Self {
            node_name: node_name.into(),
            target,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TrackData {
    Vector3(KeyframeTrack<Vec3>),
    Quaternion(KeyframeTrack<Quat>),
}

impl TrackData {
    /// Whether this data type can drive `target`.
    #[must_use]
    pub fn matches(&self, target: TargetPath) -> bool {
        matches!(
            (self, target),
            (Self::Vector3(_), TargetPath::Translation | TargetPath::Scale)
                | (Self::Quaternion(_), TargetPath::Rotation)
        )
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Vector3(_) => "vector3",
            Self::Quaternion(_) => "quaternion",
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Vector3(t) => t.is_valid(),
            Self::Quaternion(t) => t.is_valid(),
        }
    }

    /// Frame of the last key.
    #[must_use]
    pub fn end_time(&self) -> f32 {
        match self {
            Self::Vector3(t) => t.end_time(),
            Self::Quaternion(t) => t.end_time(),
        }
    }
}

/// A track definition: target metadata plus keyframe data.
#[derive(Debug, Clone)]
pub struct Track {
    pub meta: TrackMeta,
    pub data: TrackData,
}

/// Dedicated curves describing character movement rather than a bone pose.
#[derive(Debug, Clone)]
pub struct RootMotion {
    pub translation: KeyframeTrack<Vec3>,
    pub rotation: KeyframeTrack<Quat>,
    pub scale: Option<KeyframeTrack<Vec3>>,
}

impl RootMotion {
    #[must_use]
    pub fn new(translation: KeyframeTrack<Vec3>, rotation: KeyframeTrack<Quat>) -> Self {
        Self {
            translation,
            rotation,
            scale: None,
        }
    }

    /// Absolute root transform at `frame`.
    #[must_use]
    pub fn sample(&self, frame: f32) -> Sample {
        Sample {
            translation: self.translation.sample(frame).unwrap_or(Vec3::ZERO),
            rotation: self.rotation.sample(frame).unwrap_or(Quat::IDENTITY),
            scale: self
                .scale
                .as_ref()
                .and_then(|s| s.sample(frame))
                .unwrap_or(Vec3::ONE),
        }
    }
}

/// An animation asset. Read-only at runtime and shared through `Arc`.
///
/// `length` and every curve key are in frames; `fps` converts seconds.
#[derive(Debug, Clone)]
pub struct Clip {
    pub name: String,
    pub length: f32,
    pub fps: f32,
    pub tracks: Vec<Track>,
    pub root_motion: Option<RootMotion>,
    pub hitbox_tracks: Vec<Arc<Timeline<HitboxKey>>>,
    pub audio: Option<Arc<Timeline<AudioCue>>>,
    pub events: Option<Arc<Timeline<EventKey>>>,
}

impl Clip {
    #[must_use]
    pub fn new(name: impl Into<String>, length: f32, fps: f32, tracks: Vec<Track>) -> Self {
        Self {
            name: name.into(),
            length,
            fps,
            tracks,
            root_motion: None,
            hitbox_tracks: Vec::new(),
            audio: None,
            events: None,
        }
    }

    #[must_use]
    pub fn with_root_motion(mut self, root_motion: RootMotion) -> Self {
        self.root_motion = Some(root_motion);
        self
    }

    #[must_use]
    pub fn with_hitbox_track(mut self, timeline: Timeline<HitboxKey>) -> Self {
        self.hitbox_tracks.push(Arc::new(timeline));
        self
    }

    #[must_use]
    pub fn with_audio(mut self, timeline: Timeline<AudioCue>) -> Self {
        self.audio = Some(Arc::new(timeline));
        self
    }

    #[must_use]
    pub fn with_events(mut self, timeline: Timeline<EventKey>) -> Self {
        self.events = Some(Arc::new(timeline));
        self
    }

    #[inline]
    #[must_use]
    pub fn has_root_motion(&self) -> bool {
        self.root_motion.is_some()
    }

    /// Reason this clip cannot be played, if any.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if !(self.length > 0.0) {
            return Some(format!("length must be positive, got {}", self.length));
        }
        if !(self.fps > 0.0) {
            return Some(format!("fps must be positive, got {}", self.fps));
        }
        if let Some(i) = self.tracks.iter().position(|t| !t.data.is_valid()) {
            return Some(format!("track {i} has no keys or mismatched values"));
        }
        if let Some(i) = self
            .tracks
            .iter()
            .position(|t| t.data.end_time() > self.length)
        {
            return Some(format!(
                "track {i} ends at frame {} past the clip length {}",
                self.tracks[i].data.end_time(),
                self.length
            ));
        }
        let root_end = self.root_motion.as_ref().map_or(0.0, |r| {
            r.translation.end_time().max(r.rotation.end_time())
        });
        (root_end > self.length).then(|| {
            format!("root motion ends at frame {root_end} past the clip length {}", self.length)
        })
    }

    /// Root-motion delta over the playback window `from -> to`.
    ///
    /// A window with `to < from` crosses the loop point and is split into
    /// `[from, length]` followed by `[0, to]`. Returns `None` if the clip
    /// carries no root motion.
    #[must_use]
    pub fn root_motion_delta(&self, from: f32, to: f32) -> Option<Sample> {
        let root = self.root_motion.as_ref()?;

        if (to - from).abs() <= ROOT_MOTION_EPSILON {
            return Some(Sample::DELTA_IDENTITY);
        }

        let span = |a: f32, b: f32| root.sample(a).delta_to(&root.sample(b));

        if from <= to {
            Some(span(from, to))
        } else {
            let before_loop = span(from.min(self.length), self.length);
            let after_loop = span(0.0, to);
            Some(before_loop.then(&after_loop))
        }
    }
}
