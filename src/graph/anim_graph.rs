use std::sync::Arc;

use slotmap::SecondaryMap;

use crate::animation::binding::TrackBinding;
use crate::animation::clip::Clip;
use crate::animation::ids::{FeedbackEventId, ParamId, SamplerId, SignalId, SyncGroupId};
use crate::animation::skeleton::SkeletonLayout;
use crate::animation::timeline::{AudioCue, HitboxKey, Timeline};
use crate::expr::ExpressionVm;
use crate::graph::NodeKey;
use crate::graph::instance::AnimGraphInstance;
use crate::graph::node::{BlendNode, NodeId};
use crate::utils::IdTable;

/// A timeline sampled alongside a sync group.
///
/// `owner` is set for timelines that came with a sampler's clip; those only
/// fire while that sampler leads the group.
#[derive(Debug, Clone)]
pub(crate) struct AttachedTimeline<T> {
    pub(crate) timeline: Arc<Timeline<T>>,
    pub(crate) owner: Option<SamplerId>,
}

impl<T> AttachedTimeline<T> {
    pub(crate) fn shared(timeline: Arc<Timeline<T>>) -> Self {
        Self {
            timeline,
            owner: None,
        }
    }

    pub(crate) fn owned(timeline: Arc<Timeline<T>>, owner: SamplerId) -> Self {
        Self {
            timeline,
            owner: Some(owner),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SamplerDef {
    pub(crate) name: String,
    pub(crate) clip: Arc<Clip>,
    pub(crate) bindings: Arc<[TrackBinding]>,
    pub(crate) sync_group: SyncGroupId,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SyncGroupDef {
    pub(crate) name: String,
    pub(crate) members: Vec<SamplerId>,
    pub(crate) hitbox_tracks: Vec<AttachedTimeline<HitboxKey>>,
    pub(crate) audio: Vec<AttachedTimeline<AudioCue>>,
    pub(crate) events: Vec<AttachedTimeline<FeedbackEventId>>,
}

/// Compiled, immutable animation graph.
///
/// One template is shared by every character using it; per-character state
/// lives in [`AnimGraphInstance`]s created with [`create_instance`](Self::create_instance).
#[derive(Debug)]
pub struct AnimGraph {
    pub(crate) skeleton: SkeletonLayout,
    /// Holds every compiled program; instances evaluate against forks.
    pub(crate) vm: Box<dyn ExpressionVm>,

    pub(crate) nodes: Vec<BlendNode>,
    pub(crate) node_keys: Vec<NodeKey>,
    pub(crate) node_ids: SecondaryMap<NodeKey, NodeId>,
    pub(crate) exec_chain: Vec<NodeId>,
    pub(crate) exec_priority: Vec<u32>,
    pub(crate) output: NodeId,

    pub(crate) samplers: Vec<SamplerDef>,
    pub(crate) sync_groups: Vec<SyncGroupDef>,

    pub(crate) params: IdTable<ParamId>,
    pub(crate) param_defaults: Vec<f32>,
    pub(crate) signals: IdTable<SignalId>,
    pub(crate) feedback_events: IdTable<FeedbackEventId>,
    pub(crate) sampler_names: IdTable<SamplerId>,
    pub(crate) sync_group_names: IdTable<SyncGroupId>,
}

impl AnimGraph {
    /// Creates a fresh runtime instance of this graph.
    #[must_use]
    pub fn create_instance(self: &Arc<Self>) -> AnimGraphInstance {
        AnimGraphInstance::new(Arc::clone(self))
    }

    #[must_use]
    pub fn skeleton(&self) -> &SkeletonLayout {
        &self.skeleton
    }

    /// Number of compiled (reachable) nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Compiled id of an authoring node; `None` if it was not reachable from
    /// the output.
    #[must_use]
    pub fn node_id(&self, key: NodeKey) -> Option<NodeId> {
        self.node_ids.get(key).copied()
    }

    #[must_use]
    pub fn node_key(&self, id: NodeId) -> Option<NodeKey> {
        self.node_keys.get(id.index()).copied()
    }

    #[must_use]
    pub fn output_node(&self) -> NodeId {
        self.output
    }

    /// Nodes in evaluation order: every node follows all of its inputs.
    #[must_use]
    pub fn exec_chain(&self) -> &[NodeId] {
        &self.exec_chain
    }

    /// Largest distance from the output the node was reached at.
    #[must_use]
    pub fn exec_priority(&self, id: NodeId) -> Option<u32> {
        self.exec_priority.get(id.index()).copied()
    }

    /// Capacity of an instance's hitbox command buffer: the most hitbox
    /// tracks any single sync group carries.
    #[must_use]
    pub fn hitbox_capacity(&self) -> usize {
        self.sync_groups
            .iter()
            .map(|g| g.hitbox_tracks.len())
            .max()
            .unwrap_or(0)
    }

    // ========================================================================
    // Name lookups
    // ========================================================================

    #[must_use]
    pub fn param_id(&self, name: &str) -> Option<ParamId> {
        self.params.get(name)
    }

    #[must_use]
    pub fn param_default(&self, id: ParamId) -> Option<f32> {
        self.param_defaults.get(id.0 as usize).copied()
    }

    #[must_use]
    pub fn signal_id(&self, name: &str) -> Option<SignalId> {
        self.signals.get(name)
    }

    #[must_use]
    pub fn feedback_event_id(&self, name: &str) -> Option<FeedbackEventId> {
        self.feedback_events.get(name)
    }

    #[must_use]
    pub fn feedback_event_name(&self, id: FeedbackEventId) -> Option<&str> {
        self.feedback_events.resolve(id)
    }

    #[must_use]
    pub fn sampler_id(&self, name: &str) -> Option<SamplerId> {
        self.sampler_names.get(name)
    }

    #[must_use]
    pub fn sampler_name(&self, id: SamplerId) -> Option<&str> {
        self.samplers.get(id.0 as usize).map(|s| s.name.as_str())
    }

    #[must_use]
    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    /// Sync group a sampler belongs to. Samplers registered without a group
    /// get a private one.
    #[must_use]
    pub fn sampler_group(&self, id: SamplerId) -> Option<SyncGroupId> {
        self.samplers.get(id.0 as usize).map(|s| s.sync_group)
    }

    /// Id of a named sync group. Private groups have no name entry.
    #[must_use]
    pub fn sync_group_id(&self, name: &str) -> Option<SyncGroupId> {
        self.sync_group_names.get(name)
    }

    #[must_use]
    pub fn sync_group_count(&self) -> usize {
        self.sync_groups.len()
    }

    #[must_use]
    pub fn sync_group_name(&self, id: SyncGroupId) -> Option<&str> {
        self.sync_groups.get(id.0 as usize).map(|g| g.name.as_str())
    }
}
