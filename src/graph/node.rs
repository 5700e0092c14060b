//! Blend graph nodes.
//!
//! Authoring uses [`NodeDesc`] values stored in a slotmap arena and
//! addressed by [`NodeKey`]. Compilation keeps only the nodes reachable from
//! the output and turns them into dense [`BlendNode`]s addressed by
//! [`NodeId`].

use std::sync::Arc;

use crate::animation::clip::Clip;
use crate::animation::sample::SampleBuffer;
use crate::expr::ProgramAddr;
use crate::graph::NodeKey;
use crate::graph::fsm::{FsmState, StateMachine, StateMachineDesc};

/// Index of a compiled node inside an [`AnimGraph`](super::AnimGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Authoring-time description of a blend node.
#[derive(Debug, Clone)]
pub enum NodeDesc {
    /// Plays a sampler's pose directly.
    Clip { sampler: String },
    /// Blends two inputs by a weight expression (0 = A, 1 = B).
    Blend2 {
        input_a: Option<NodeKey>,
        input_b: Option<NodeKey>,
        weight: String,
    },
    /// A single static frame of a clip.
    Frame { clip: Arc<Clip>, frame: f32 },
    /// A state machine over child subtrees.
    Fsm(StateMachineDesc),
}

impl NodeDesc {
    #[must_use]
    pub fn clip(sampler: &str) -> Self {
        Self::Clip {
            sampler: sampler.to_owned(),
        }
    }

    #[must_use]
    pub fn blend2(input_a: NodeKey, input_b: NodeKey, weight: &str) -> Self {
        Self::Blend2 {
            input_a: Some(input_a),
            input_b: Some(input_b),
            weight: weight.to_owned(),
        }
    }

    #[must_use]
    pub fn frame(clip: Arc<Clip>, frame: f32) -> Self {
        Self::Frame { clip, frame }
    }

    /// Child nodes in evaluation-input order. Unconnected slots are `None`.
    pub(crate) fn inputs(&self) -> Vec<Option<NodeKey>> {
        match self {
            Self::Clip { .. } | Self::Frame { .. } => Vec::new(),
            Self::Blend2 {
                input_a, input_b, ..
            } => vec![*input_a, *input_b],
            Self::Fsm(fsm) => fsm.states.iter().map(|s| Some(s.node)).collect(),
        }
    }
}

/// A compiled node. Immutable and shared by every instance.
#[derive(Debug, Clone)]
pub(crate) enum BlendNode {
    Clip {
        sampler: crate::animation::ids::SamplerId,
    },
    Blend2 {
        inputs: [NodeId; 2],
        weight: ProgramAddr,
    },
    Frame {
        pose: SampleBuffer,
    },
    Fsm(StateMachine),
}

/// Per-instance runtime state of one node.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeState {
    pub(crate) total_influence: f32,
    /// Weight evaluated during propagation, consumed during evaluation.
    pub(crate) cached_weight: f32,
    /// Output pose of blending nodes; unused by leaves.
    pub(crate) buffer: SampleBuffer,
    /// Set once this node's per-frame side effects ran.
    pub(crate) visited: bool,
    /// Latched once a weight or predicate evaluated to NaN or infinity.
    pub(crate) fault_logged: bool,
    pub(crate) fsm: Option<FsmState>,
}
