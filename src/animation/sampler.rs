use std::sync::Arc;

use crate::animation::binding::{TargetPath, TrackBinding};
use crate::animation::clip::{Clip, TrackData};
use crate::animation::sample::{Sample, SampleBuffer};
use crate::animation::tracks::KeyframeCursor;

/// Influence at or below which a sampler advances without sampling.
pub const INFLUENCE_EPSILON: f32 = 1e-4;

/// Playback cursor and sampled pose of one clip.
#[derive(Debug, Clone)]
pub struct ClipSampler {
    clip: Arc<Clip>,
    bindings: Arc<[TrackBinding]>,
    track_cursors: Vec<KeyframeCursor>,

    cursor: f32,
    cursor_prev: f32,
    total_influence: f32,
    length_scaled: f32,

    buffer: SampleBuffer,
}

impl ClipSampler {
    /// Creates a sampler at frame 0. `rest` seeds the nodes the clip does
    /// not animate.
    #[must_use]
    pub fn new(clip: Arc<Clip>, bindings: Arc<[TrackBinding]>, rest: SampleBuffer) -> Self {
        let track_count = clip.tracks.len();
        let length_scaled = clip.length;
        Self {
            clip,
            bindings,
            track_cursors: vec![KeyframeCursor::default(); track_count],
            cursor: 0.0,
            cursor_prev: 0.0,
            total_influence: 0.0,
            length_scaled,
            buffer: rest,
        }
    }

    #[must_use]
    pub fn clip(&self) -> &Arc<Clip> {
        &self.clip
    }

    #[inline]
    #[must_use]
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    /// Cursor at the start of this frame's window.
    #[inline]
    #[must_use]
    pub fn cursor_prev(&self) -> f32 {
        self.cursor_prev
    }

    #[inline]
    #[must_use]
    pub fn total_influence(&self) -> f32 {
        self.total_influence
    }

    #[inline]
    #[must_use]
    pub fn native_length(&self) -> f32 {
        self.clip.length
    }

    #[inline]
    #[must_use]
    pub fn length_scaled(&self) -> f32 {
        self.length_scaled
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn add_influence(&mut self, influence: f32) {
        self.total_influence += influence;
    }

    pub fn clear_influence(&mut self) {
        self.total_influence = 0.0;
    }

    pub fn set_length_scaled(&mut self, length: f32) {
        self.length_scaled = length;
    }

    /// Jumps to `frame`; the next window starts there.
    pub fn seek(&mut self, frame: f32) {
        self.cursor = frame;
        self.cursor_prev = frame;
    }

    /// Samples the pose at the current cursor, then advances it by `dt`
    /// seconds at the rate set by `length_scaled`.
    ///
    /// With `sample_new == false` the buffer is left untouched but the cursor
    /// still moves, so a faded-out clip resumes in step.
    pub fn sample_and_advance(&mut self, dt: f32, sample_new: bool) {
        // Single subtraction: a dt spanning several loops under-wraps.
        if self.cursor > self.clip.length {
            self.cursor -= self.clip.length;
        }

        if sample_new {
            self.sample_pose();
            if self.clip.has_root_motion() {
                self.buffer.root_motion = self.sample_root_motion(self.cursor_prev, self.cursor);
            }
        }

        self.cursor_prev = self.cursor;

        if self.length_scaled > 0.0 {
            self.cursor += (self.clip.length / self.length_scaled) * dt * self.clip.fps;
        }
    }

    /// Root-motion delta between two cursor values; see [`Clip::root_motion_delta`].
    #[must_use]
    pub fn sample_root_motion(&self, from: f32, to: f32) -> Option<Sample> {
        self.clip.root_motion_delta(from, to)
    }

    fn sample_pose(&mut self) {
        let time = self.cursor;
        for binding in self.bindings.iter() {
            let track = &self.clip.tracks[binding.track_index];
            let cursor = &mut self.track_cursors[binding.track_index];
            let Some(sample) = self.buffer.samples.get_mut(binding.node_index) else {
                continue;
            };

            match (&track.data, binding.target) {
                (TrackData::Vector3(t), TargetPath::Translation) => {
                    if let Some(v) = t.sample_with_cursor(time, cursor) {
                        sample.translation = v;
                    }
                }
                (TrackData::Vector3(t), TargetPath::Scale) => {
                    if let Some(v) = t.sample_with_cursor(time, cursor) {
                        sample.scale = v;
                    }
                }
                (TrackData::Quaternion(t), TargetPath::Rotation) => {
                    if let Some(v) = t.sample_with_cursor(time, cursor) {
                        sample.rotation = v;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Writes the pose of `clip` at `frame` into `out` without any cursor state.
pub fn sample_clip_pose(clip: &Clip, bindings: &[TrackBinding], frame: f32, out: &mut SampleBuffer) {
    for binding in bindings {
        let Some(sample) = out.samples.get_mut(binding.node_index) else {
            continue;
        };
        match (&clip.tracks[binding.track_index].data, binding.target) {
            (TrackData::Vector3(t), TargetPath::Translation) => {
                if let Some(v) = t.sample(frame) {
                    sample.translation = v;
                }
            }
            (TrackData::Vector3(t), TargetPath::Scale) => {
                if let Some(v) = t.sample(frame) {
                    sample.scale = v;
                }
            }
            (TrackData::Quaternion(t), TargetPath::Rotation) => {
                if let Some(v) = t.sample(frame) {
                    sample.rotation = v;
                }
            }
            _ => {}
        }
    }
}
