//! Poses and pose blending.
//!
//! A [`SampleBuffer`] is one evaluated pose: a [`Sample`] per skeleton node,
//! index-aligned with the [`SkeletonLayout`](super::skeleton::SkeletonLayout),
//! plus an optional root-motion delta.

use glam::{Quat, Vec3};

/// Local transform of one skeleton node.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Sample {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Sample {
    /// Identity pose transform.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Identity delta: no movement, no rotation, no scale change.
    pub const DELTA_IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ZERO,
    };

    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Interpolates towards `other`: lerp for translation and scale, slerp
    /// for rotation. `t <= 0` and `t >= 1` return the endpoints exactly.
    #[must_use]
    pub fn blend(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *other;
        }
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    /// Delta between two samples of the same curve: `self` then `later`.
    #[must_use]
    pub fn delta_to(&self, later: &Self) -> Self {
        Self {
            translation: later.translation - self.translation,
            rotation: self.rotation.inverse() * later.rotation,
            scale: later.scale - self.scale,
        }
    }

    /// Composes two consecutive deltas: `self` happened first, then `later`.
    #[must_use]
    pub fn then(&self, later: &Self) -> Self {
        Self {
            translation: self.translation + later.translation,
            rotation: self.rotation * later.rotation,
            scale: self.scale + later.scale,
        }
    }

    /// Component-wise comparison within `epsilon`.
    #[must_use]
    pub fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, epsilon)
            && self.scale.abs_diff_eq(other.scale, epsilon)
            && (self.rotation.abs_diff_eq(other.rotation, epsilon)
                || self.rotation.abs_diff_eq(-other.rotation, epsilon))
    }
}

/// One evaluated pose.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleBuffer {
    pub samples: Vec<Sample>,
    pub root_motion: Option<Sample>,
}

impl SampleBuffer {
    /// A buffer of `len` identity samples.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![Sample::IDENTITY; len],
            root_motion: None,
        }
    }

    #[must_use]
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            root_motion: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copies `other` into `self`, reusing the allocation.
    pub fn copy_from(&mut self, other: &SampleBuffer) {
        self.samples.clone_from(&other.samples);
        self.root_motion = other.root_motion;
    }
}

/// Blends two poses into `out` by `factor` (0 = `a`, 1 = `b`).
///
/// Both inputs must have the same length; the skeleton binding at compile
/// time guarantees it. Root motion present on only one side is blended
/// against the identity delta.
pub fn blend_samples(a: &SampleBuffer, b: &SampleBuffer, out: &mut SampleBuffer, factor: f32) {
    debug_assert_eq!(a.len(), b.len(), "blended sample buffers differ in length");

    out.samples.clear();
    out.samples.extend(
        a.samples
            .iter()
            .zip(&b.samples)
            .map(|(sa, sb)| sa.blend(sb, factor)),
    );

    out.root_motion = match (a.root_motion, b.root_motion) {
        (None, None) => None,
        (Some(ra), Some(rb)) => Some(ra.blend(&rb, factor)),
        (Some(ra), None) => Some(ra.blend(&Sample::DELTA_IDENTITY, factor)),
        (None, Some(rb)) => Some(Sample::DELTA_IDENTITY.blend(&rb, factor)),
    };
}
