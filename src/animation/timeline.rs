//! Discrete keyframed timelines (events, audio cues, hitboxes).
//!
//! A [`Timeline`] is sampled over the window a clip cursor moved through
//! during one frame. The window is half-open, `(from, to]`, and may cross the
//! loop point, in which case sampling continues from keyframe 0.

use std::sync::Arc;

use glam::Vec3;

/// One keyed payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe<T> {
    pub frame: f32,
    pub payload: T,
}

/// A circular sequence of keyframes sorted ascending by frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timeline<T> {
    length: f32,
    keys: Vec<Keyframe<T>>,
}

impl<T> Timeline<T> {
    /// An empty timeline looping every `length` frames.
    #[must_use]
    pub fn new(length: f32) -> Self {
        Self {
            length,
            keys: Vec::new(),
        }
    }

    /// Builds a timeline from `(frame, payload)` pairs in any order.
    #[must_use]
    pub fn from_keys(length: f32, keys: impl IntoIterator<Item = (f32, T)>) -> Self {
        let mut timeline = Self {
            length,
            keys: keys
                .into_iter()
                .map(|(frame, payload)| Keyframe { frame, payload })
                .collect(),
        };
        timeline.sort();
        timeline
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_length(&mut self, length: f32) {
        self.length = length;
    }

    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Inserts a keyframe, keeping the timeline sorted.
    ///
    /// Keys sharing a frame keep their insertion order.
    pub fn insert(&mut self, frame: f32, payload: T) {
        self.keys.push(Keyframe { frame, payload });
        self.sort();
    }

    pub fn remove(&mut self, index: usize) -> Option<Keyframe<T>> {
        (index < self.keys.len()).then(|| self.keys.remove(index))
    }

    /// Moves the keyframe at `index` to `frame`.
    pub fn move_key(&mut self, index: usize, frame: f32) {
        if let Some(key) = self.keys.get_mut(index) {
            key.frame = frame;
            self.sort();
        }
    }

    fn sort(&mut self) {
        self.keys.sort_by(|a, b| a.frame.total_cmp(&b.frame));
    }

    /// Converts every payload, keeping frames and length.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Timeline<U> {
        Timeline {
            length: self.length,
            keys: self
                .keys
                .iter()
                .map(|k| Keyframe {
                    frame: k.frame,
                    payload: f(&k.payload),
                })
                .collect(),
        }
    }

    /// Finds the keyframes surrounding `cursor` as `(left, right)`.
    ///
    /// `left` is the last key at or before `cursor`, `right` the one after it.
    /// Past the last key `right == len()`, meaning keyframe 0 of the next
    /// loop; before the first key `left == len() - 1`, the last key of the
    /// previous loop. Returns `None` for an empty timeline.
    #[must_use]
    pub fn locate(&self, cursor: f32) -> Option<(usize, usize)> {
        let n = self.keys.len();
        if n == 0 {
            return None;
        }
        let right = self.keys.partition_point(|k| k.frame <= cursor);
        let left = if right == 0 { n - 1 } else { right - 1 };
        Some((left, right))
    }

    /// Emits every keyframe with a frame in `(from, to]`, in playback order.
    ///
    /// Both cursors are brought into `[0, length)` by subtracting `length`
    /// once. If `to < from` afterwards, the window wraps the loop point.
    pub fn sample(&self, from: f32, to: f32, mut emit: impl FnMut(&Keyframe<T>)) {
        let n = self.keys.len();
        if n == 0 || from == to {
            return;
        }

        let from = self.normalize(from);
        let to = self.normalize(to);
        if from == to {
            return;
        }

        let Some((_, first)) = self.locate(from) else {
            return;
        };
        let Some((left, right)) = self.locate(to) else {
            return;
        };

        let n = n as isize;
        let first = first as isize;
        let mut last = if right == 0 { -1 } else { left as isize };
        if to < from {
            last += n;
        }

        for i in first..=last {
            emit(&self.keys[(i % n) as usize]);
        }
    }

    /// Like [`sample`](Self::sample), collecting cloned payloads into `out`.
    pub fn sample_into<B: Extend<T>>(&self, out: &mut B, from: f32, to: f32)
    where
        T: Clone,
    {
        self.sample(from, to, |k| out.extend(std::iter::once(k.payload.clone())));
    }

    #[inline]
    fn normalize(&self, cursor: f32) -> f32 {
        if self.length > 0.0 && cursor >= self.length {
            cursor - self.length
        } else {
            cursor
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// A named gameplay event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventKey {
    pub name: Arc<str>,
}

impl EventKey {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

/// A sound to trigger.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioCue {
    pub sound: Arc<str>,
    pub volume: f32,
}

impl AudioCue {
    #[must_use]
    pub fn new(sound: &str, volume: f32) -> Self {
        Self {
            sound: sound.into(),
            volume,
        }
    }
}

/// Collision volume, in the space of `HitboxKey::node`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HitboxShape {
    Sphere { center: Vec3, radius: f32 },
    Box { center: Vec3, half_extents: Vec3 },
    Capsule { a: Vec3, b: Vec3, radius: f32 },
}

/// A hitbox activation lasting `duration` frames.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitboxKey {
    pub shape: HitboxShape,
    pub duration: f32,
    pub node: Option<Arc<str>>,
}

impl HitboxKey {
    #[must_use]
    pub fn new(shape: HitboxShape, duration: f32) -> Self {
        Self {
            shape,
            duration,
            node: None,
        }
    }

    /// Attaches the hitbox to a skeleton node.
    #[must_use]
    pub fn on_node(mut self, node: &str) -> Self {
        self.node = Some(node.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> Timeline<u32> {
        Timeline::from_keys(60.0, [(30.0, 30), (10.0, 10), (50.0, 50)])
    }

    fn collect(t: &Timeline<u32>, from: f32, to: f32) -> Vec<u32> {
        let mut out = Vec::new();
        t.sample_into(&mut out, from, to);
        out
    }

    #[test]
    fn keys_stay_sorted() {
        let mut t = events();
        t.insert(20.0, 20);
        let frames: Vec<f32> = t.keys().iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![10.0, 20.0, 30.0, 50.0]);

        t.move_key(0, 55.0);
        assert_eq!(t.keys().last().map(|k| k.payload), Some(10));
    }

    #[test]
    fn locate_wraps_at_both_ends() {
        let t = events();
        assert_eq!(t.locate(5.0), Some((2, 0)));
        assert_eq!(t.locate(10.0), Some((0, 1)));
        assert_eq!(t.locate(35.0), Some((1, 2)));
        assert_eq!(t.locate(55.0), Some((2, 3)));
        assert_eq!(Timeline::<u32>::new(10.0).locate(1.0), None);
    }

    #[test]
    fn window_is_left_exclusive_right_inclusive() {
        let t = events();
        assert_eq!(collect(&t, 0.0, 10.0), vec![10]);
        assert_eq!(collect(&t, 10.0, 30.0), vec![30]);
        assert_eq!(collect(&t, 11.0, 29.0), Vec::<u32>::new());
    }

    #[test]
    fn wrapping_window() {
        let t = events();
        assert_eq!(collect(&t, 55.0, 15.0), vec![10]);
        assert_eq!(collect(&t, 45.0, 35.0), vec![50, 10, 30]);
        assert_eq!(collect(&t, 55.0, 5.0), Vec::<u32>::new());
    }

    #[test]
    fn cursor_past_length_is_normalized_once() {
        let t = events();
        assert_eq!(collect(&t, 55.0, 72.0), vec![10]);
    }

    #[test]
    fn zero_window_emits_nothing() {
        let t = events();
        assert!(collect(&t, 10.0, 10.0).is_empty());
        assert!(collect(&t, 30.0, 90.0).is_empty());
    }
}
