#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod errors;
pub mod expr;
pub mod graph;
pub mod utils;

pub use animation::{
    Clip, ClipSampler, KeyframeTrack, Sample, SampleBuffer, SkeletonLayout, SyncGroup, Timeline,
};
pub use errors::{AnimError, Result};
pub use expr::{ExprVm, ExpressionVm};
pub use graph::{
    AnimGraph, AnimGraphBuilder, AnimGraphInstance, NodeDesc, NodeKey, StateMachineDesc,
};
