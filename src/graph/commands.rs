//! Per-frame command buffers handed to gameplay, physics and audio.

use std::sync::Arc;

use crate::animation::ids::{SamplerId, SyncGroupId};
use crate::animation::timeline::{AudioCue, HitboxShape};

/// Inline capacity of the audio command buffer before it spills to the heap.
pub const AUDIO_COMMAND_CAPACITY: usize = 8;

/// A hitbox that became active this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HitboxCommand {
    pub sync_group: SyncGroupId,
    /// Index of the hitbox track within its sync group.
    pub track: usize,
    /// The sampler whose cursor crossed the key.
    pub sampler: SamplerId,
    pub shape: HitboxShape,
    pub duration: f32,
    pub node: Option<Arc<str>>,
}

/// A sound cue reached this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCommand {
    pub sync_group: SyncGroupId,
    pub sampler: SamplerId,
    pub cue: AudioCue,
}
