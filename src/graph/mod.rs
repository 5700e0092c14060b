//! Blend Graph
//!
//! An animation graph is authored with an [`AnimGraphBuilder`]: named
//! parameters, signals and feedback events, clip samplers grouped into sync
//! groups, and a DAG of blend nodes ending in one output node.
//!
//! [`AnimGraphBuilder::compile`] validates the description and produces an
//! immutable [`AnimGraph`] template. Every animated character then owns an
//! [`AnimGraphInstance`] created from the shared template and calls
//! [`AnimGraphInstance::update`] once per frame.
//!
//! # Node kinds
//!
//! - **Clip**: a leaf forwarding one sampler's pose
//! - **Blend2**: two inputs mixed by a weight expression
//! - **Frame**: a leaf holding one static frame of a clip
//! - **Fsm**: a state machine cross-fading between child subtrees

pub mod anim_graph;
pub mod builder;
pub mod commands;
pub mod fsm;
pub mod instance;
pub mod node;

slotmap::new_key_type! {
    /// Authoring-time handle of a blend node.
    pub struct NodeKey;
}

pub use anim_graph::AnimGraph;
pub use builder::AnimGraphBuilder;
pub use commands::{AUDIO_COMMAND_CAPACITY, AudioCommand, HitboxCommand};
pub use fsm::{FsmState, StateDesc, StateMachineDesc, TransitionDesc};
pub use instance::AnimGraphInstance;
pub use node::{NodeDesc, NodeId};
