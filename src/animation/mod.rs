mod values;
pub mod tracks;
pub mod clip;
pub mod binding;
pub mod binder;
pub mod ids;
pub mod sample;
pub mod sampler;
pub mod skeleton;
pub mod sync_group;
pub mod timeline;

pub use binder::Binder;
pub use binding::{TargetPath, TrackBinding};
pub use clip::{Clip, ROOT_MOTION_EPSILON, RootMotion, Track, TrackData, TrackMeta};
pub use ids::{FeedbackEventId, ParamId, SamplerId, SignalId, SyncGroupId};
pub use sample::{Sample, SampleBuffer, blend_samples};
pub use sampler::{ClipSampler, INFLUENCE_EPSILON, sample_clip_pose};
pub use skeleton::SkeletonLayout;
pub use sync_group::SyncGroup;
pub use timeline::{AudioCue, EventKey, HitboxKey, HitboxShape, Keyframe, Timeline};
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
pub use values::Interpolatable;
