use crate::animation::binding::TrackBinding;
use crate::animation::clip::{Clip, TrackData};
use crate::animation::skeleton::SkeletonLayout;

pub struct Binder;

impl Binder {
    /// Resolves a clip's tracks against a skeleton by node name.
    ///
    /// Tracks naming an unknown node, or whose value type does not match
    /// their target, are skipped with a warning.
    #[must_use]
    pub fn bind(skeleton: &SkeletonLayout, clip: &Clip) -> Vec<TrackBinding> {
        let mut bindings = Vec::with_capacity(clip.tracks.len());

        for (track_idx, track) in clip.tracks.iter().enumerate() {
            let node_name = &track.meta.node_name;
            let target = track.meta.target;

            let Some(node_index) = skeleton.index_of(node_name) else {
                log::warn!(
                    "Clip '{}': track {} targets unknown node '{}', skipped",
                    clip.name,
                    track_idx,
                    node_name
                );
                continue;
            };

            if !track.data.matches(target) {
                log::warn!(
                    "Clip '{}': track {} has {} data for {:?} target, skipped",
                    clip.name,
                    track_idx,
                    track.data.kind_name(),
                    target
                );
                continue;
            }

            bindings.push(TrackBinding {
                track_index: track_idx,
                node_index,
                target,
            });
        }

        bindings
    }
}
