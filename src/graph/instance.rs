//! Per-character runtime state of a compiled [`AnimGraph`].
//!
//! # Frame update
//!
//! [`AnimGraphInstance::update`] always runs the same phases in the same
//! order:
//!
//! 1. Clear feedback-event flags and last frame's commands
//! 2. Clear the influence of every sync group member
//! 3. Propagate influence from the output node (1.0) down the graph
//! 4. Recompute per-sampler playback lengths in every sync group
//! 5. Advance and sample every sync group's clips
//! 6. Evaluate the execution chain into the output pose
//! 7. Sample hitbox timelines into the hitbox command buffer
//! 8. Sample audio timelines into the audio command buffer, then event
//!    timelines into the feedback flags
//! 9. Clear triggered signals
//!
//! Evaluating before sampling would read last frame's poses, so the order is
//! fixed.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::animation::ids::{FeedbackEventId, ParamId, SamplerId, SignalId, SyncGroupId};
use crate::animation::sample::{Sample, SampleBuffer, blend_samples};
use crate::animation::sampler::ClipSampler;
use crate::animation::sync_group::SyncGroup;
use crate::expr::{ExpressionVm, VariableId, finite_or_zero};
use crate::graph::NodeKey;
use crate::graph::anim_graph::{AnimGraph, AttachedTimeline};
use crate::graph::commands::{AUDIO_COMMAND_CAPACITY, AudioCommand, HitboxCommand};
use crate::graph::fsm::{FsmState, StateMachine};
use crate::graph::node::{BlendNode, NodeId, NodeState};

/// Runtime state of one animated character.
///
/// Owns its samplers, sync group state, node state, expression variables and
/// output buffers; the template it was created from is shared read-only.
#[derive(Debug)]
pub struct AnimGraphInstance {
    graph: Arc<AnimGraph>,
    vm: Box<dyn ExpressionVm>,

    params: Vec<f32>,
    signals: Vec<bool>,
    feedback: Vec<bool>,

    samplers: Vec<ClipSampler>,
    sync_groups: Vec<SyncGroup>,
    states: Vec<NodeState>,

    output: SampleBuffer,
    hitbox_commands: Vec<HitboxCommand>,
    audio_commands: SmallVec<[AudioCommand; AUDIO_COMMAND_CAPACITY]>,
}

impl AnimGraphInstance {
    pub(crate) fn new(graph: Arc<AnimGraph>) -> Self {
        let mut vm = graph.vm.fork();
        for (i, &default) in graph.param_defaults.iter().enumerate() {
            vm.set_variable(VariableId(i as u32), default);
        }
        let param_count = graph.param_defaults.len() as u32;
        for j in 0..graph.signals.len() as u32 {
            vm.set_variable(VariableId(param_count + j), 0.0);
        }

        let samplers = graph
            .samplers
            .iter()
            .map(|def| {
                ClipSampler::new(
                    Arc::clone(&def.clip),
                    Arc::clone(&def.bindings),
                    graph.skeleton.rest_buffer(),
                )
            })
            .collect();

        let sync_groups = graph
            .sync_groups
            .iter()
            .map(|def| SyncGroup::new(def.members.iter().copied()))
            .collect();

        let states = graph
            .nodes
            .iter()
            .map(|node| match node {
                BlendNode::Clip { .. } | BlendNode::Frame { .. } => NodeState::default(),
                BlendNode::Blend2 { .. } => NodeState {
                    buffer: graph.skeleton.rest_buffer(),
                    ..NodeState::default()
                },
                BlendNode::Fsm(machine) => NodeState {
                    buffer: graph.skeleton.rest_buffer(),
                    fsm: Some(FsmState::new(machine.initial, graph.skeleton.rest_buffer())),
                    ..NodeState::default()
                },
            })
            .collect();

        Self {
            vm,
            params: graph.param_defaults.clone(),
            signals: vec![false; graph.signals.len()],
            feedback: vec![false; graph.feedback_events.len()],
            samplers,
            sync_groups,
            states,
            output: graph.skeleton.rest_buffer(),
            hitbox_commands: Vec::with_capacity(graph.hitbox_capacity()),
            audio_commands: SmallVec::new(),
            graph,
        }
    }

    #[must_use]
    pub fn graph(&self) -> &Arc<AnimGraph> {
        &self.graph
    }

    /// Advances the graph by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        // 1.
        self.feedback.fill(false);
        self.hitbox_commands.clear();
        self.audio_commands.clear();

        // 2.
        for group in &self.sync_groups {
            group.clear_influence(&mut self.samplers);
        }

        // 3.
        self.propagate_influence();

        // 4.
        for group in &mut self.sync_groups {
            group.update_lengths(&mut self.samplers);
        }

        // 5.
        for group in &self.sync_groups {
            group.sample_clips(&mut self.samplers, dt);
        }

        // 6.
        self.evaluate_chain(dt);

        // 7. and 8.
        self.sample_timelines();

        // 9.
        self.clear_signals();
    }

    fn propagate_influence(&mut self) {
        for state in &mut self.states {
            state.total_influence = 0.0;
            state.visited = false;
        }

        let mut pass = Propagation {
            graph: &self.graph,
            vm: self.vm.as_ref(),
            states: &mut self.states,
            samplers: &mut self.samplers,
            feedback: &mut self.feedback,
        };
        pass.visit(self.graph.output, 1.0);
    }

    fn evaluate_chain(&mut self, dt: f32) {
        let graph = &*self.graph;

        for &id in &graph.exec_chain {
            let mut state = std::mem::take(&mut self.states[id.index()]);

            match &graph.nodes[id.index()] {
                BlendNode::Clip { .. } | BlendNode::Frame { .. } => {}
                BlendNode::Blend2 { inputs, .. } => {
                    let a = node_output(graph, &self.states, &self.samplers, inputs[0]);
                    let b = node_output(graph, &self.states, &self.samplers, inputs[1]);
                    blend_samples(a, b, &mut state.buffer, state.cached_weight);
                }
                BlendNode::Fsm(machine) => {
                    if let Some(fsm) = state.fsm.as_mut() {
                        let current = machine.current_node(fsm);
                        let current = node_output(graph, &self.states, &self.samplers, current);
                        StateMachine::evaluate(fsm, current, &mut state.buffer, dt);
                    }
                }
            }

            self.states[id.index()] = state;
        }

        let out = node_output(graph, &self.states, &self.samplers, graph.output);
        self.output.copy_from(out);
    }

    fn sample_timelines(&mut self) {
        let graph = &*self.graph;

        for (index, (group, def)) in self.sync_groups.iter().zip(&graph.sync_groups).enumerate() {
            let Some(top) = group.top_level_sampler() else {
                continue;
            };
            let Some(sampler) = self.samplers.get(top.0 as usize) else {
                continue;
            };
            if sampler.total_influence() == 0.0 || sampler.length_scaled() <= 0.0 {
                continue;
            }
            let sync_group = SyncGroupId(index as u32);
            let window = |attached_len: f32| {
                let scale = attached_len / sampler.length_scaled();
                (sampler.cursor_prev() * scale, sampler.cursor() * scale)
            };

            for (track, attached) in def.hitbox_tracks.iter().enumerate() {
                if !fires_for(attached, top) {
                    continue;
                }
                let (from, to) = window(attached.timeline.length());
                attached.timeline.sample(from, to, |key| {
                    self.hitbox_commands.push(HitboxCommand {
                        sync_group,
                        track,
                        sampler: top,
                        shape: key.payload.shape,
                        duration: key.payload.duration,
                        node: key.payload.node.clone(),
                    });
                });
            }

            for attached in &def.audio {
                if !fires_for(attached, top) {
                    continue;
                }
                let (from, to) = window(attached.timeline.length());
                attached.timeline.sample(from, to, |key| {
                    self.audio_commands.push(AudioCommand {
                        sync_group,
                        sampler: top,
                        cue: key.payload.clone(),
                    });
                });
            }

            for attached in &def.events {
                if !fires_for(attached, top) {
                    continue;
                }
                let (from, to) = window(attached.timeline.length());
                attached.timeline.sample(from, to, |key| {
                    if let Some(flag) = self.feedback.get_mut(key.payload.0 as usize) {
                        *flag = true;
                    }
                });
            }
        }
    }

    fn clear_signals(&mut self) {
        let param_count = self.params.len() as u32;
        for (j, raised) in self.signals.iter_mut().enumerate() {
            if std::mem::take(raised) {
                self.vm.set_variable(VariableId(param_count + j as u32), 0.0);
            }
        }
    }

    // ========================================================================
    // Parameters, signals and feedback
    // ========================================================================

    pub fn set_parameter(&mut self, id: ParamId, value: f32) {
        let index = id.0 as usize;
        if !check_id(index < self.params.len(), "parameter", id.0) {
            return;
        }
        self.params[index] = value;
        self.vm.set_variable(VariableId(id.0), value);
    }

    /// Sets a parameter by name. Returns `false` for an unknown name.
    pub fn set_parameter_by_name(&mut self, name: &str, value: f32) -> bool {
        match self.graph.param_id(name) {
            Some(id) => {
                self.set_parameter(id, value);
                true
            }
            None => {
                log::warn!("AnimGraphInstance: unknown parameter '{name}'");
                false
            }
        }
    }

    #[must_use]
    pub fn parameter(&self, id: ParamId) -> f32 {
        let index = id.0 as usize;
        if !check_id(index < self.params.len(), "parameter", id.0) {
            return 0.0;
        }
        self.params[index]
    }

    /// Raises a signal for the next update only.
    pub fn trigger_signal(&mut self, id: SignalId) {
        let index = id.0 as usize;
        if !check_id(index < self.signals.len(), "signal", id.0) {
            return;
        }
        self.signals[index] = true;
        let param_count = self.params.len() as u32;
        self.vm.set_variable(VariableId(param_count + id.0), 1.0);
    }

    /// Whether a signal is raised and waiting for the next update.
    #[must_use]
    pub fn signal(&self, id: SignalId) -> bool {
        let index = id.0 as usize;
        check_id(index < self.signals.len(), "signal", id.0) && self.signals[index]
    }

    /// Whether a feedback event was raised by the last update.
    #[must_use]
    pub fn feedback_event(&self, id: FeedbackEventId) -> bool {
        let index = id.0 as usize;
        check_id(index < self.feedback.len(), "feedback event", id.0) && self.feedback[index]
    }

    /// Feedback events raised by the last update.
    pub fn raised_feedback_events(&self) -> impl Iterator<Item = FeedbackEventId> + '_ {
        self.feedback
            .iter()
            .enumerate()
            .filter(|(_, raised)| **raised)
            .map(|(i, _)| FeedbackEventId(i as u32))
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    /// The blended pose of the last update.
    #[must_use]
    pub fn output(&self) -> &SampleBuffer {
        &self.output
    }

    /// Root-motion delta of the last update, if any contributing clip has one.
    #[must_use]
    pub fn root_motion(&self) -> Option<Sample> {
        self.output.root_motion
    }

    #[must_use]
    pub fn hitbox_commands(&self) -> &[HitboxCommand] {
        &self.hitbox_commands
    }

    #[must_use]
    pub fn audio_commands(&self) -> &[AudioCommand] {
        &self.audio_commands
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    #[must_use]
    pub fn sampler(&self, id: SamplerId) -> Option<&ClipSampler> {
        self.samplers.get(id.0 as usize)
    }

    /// Moves a sampler's cursor; the next window starts at `frame`.
    pub fn seek_sampler(&mut self, id: SamplerId, frame: f32) {
        let exists = (id.0 as usize) < self.samplers.len();
        if check_id(exists, "sampler", id.0) {
            self.samplers[id.0 as usize].seek(frame);
        }
    }

    #[must_use]
    pub fn sync_group(&self, id: SyncGroupId) -> Option<&SyncGroup> {
        self.sync_groups.get(id.0 as usize)
    }

    /// Runtime state of a state machine node.
    #[must_use]
    pub fn fsm_state(&self, node: NodeKey) -> Option<&FsmState> {
        let id = self.graph.node_id(node)?;
        self.states.get(id.index())?.fsm.as_ref()
    }

    /// Name of the state a state machine node is in.
    #[must_use]
    pub fn fsm_state_name(&self, node: NodeKey) -> Option<&str> {
        let id = self.graph.node_id(node)?;
        let BlendNode::Fsm(machine) = self.graph.nodes.get(id.index())? else {
            return None;
        };
        let fsm = self.states.get(id.index())?.fsm.as_ref()?;
        machine.state_name(fsm.current_state())
    }

    /// Influence a blend or state machine node received this frame.
    #[must_use]
    pub fn node_influence(&self, node: NodeKey) -> f32 {
        self.graph
            .node_id(node)
            .and_then(|id| self.states.get(id.index()))
            .map_or(0.0, |s| s.total_influence)
    }

    /// Clamped weight a blend node evaluated this frame.
    #[must_use]
    pub fn blend_weight(&self, node: NodeKey) -> f32 {
        self.graph
            .node_id(node)
            .and_then(|id| self.states.get(id.index()))
            .map_or(0.0, |s| s.cached_weight)
    }
}

/// Top-down influence pass over the compiled nodes.
struct Propagation<'a> {
    graph: &'a AnimGraph,
    vm: &'a dyn ExpressionVm,
    states: &'a mut [NodeState],
    samplers: &'a mut [ClipSampler],
    feedback: &'a mut [bool],
}

impl Propagation<'_> {
    fn visit(&mut self, id: NodeId, influence: f32) {
        let graph = self.graph;
        let Some(node) = graph.nodes.get(id.index()) else {
            return;
        };

        match node {
            BlendNode::Clip { sampler } => {
                if let Some(s) = self.samplers.get_mut(sampler.0 as usize) {
                    s.add_influence(influence);
                }
            }
            BlendNode::Frame { .. } => {
                self.states[id.index()].total_influence += influence;
            }
            BlendNode::Blend2 { inputs, weight } => {
                let state = &mut self.states[id.index()];
                state.total_influence += influence;
                if !state.visited {
                    state.visited = true;
                    let raw = self.vm.evaluate(*weight);
                    state.cached_weight =
                        finite_or_zero(raw, &mut state.fault_logged, "Blend2 weight").clamp(0.0, 1.0);
                }
                let w = state.cached_weight;

                self.visit(inputs[0], influence * (1.0 - w));
                self.visit(inputs[1], influence * w);
            }
            BlendNode::Fsm(machine) => {
                let NodeState {
                    total_influence,
                    buffer,
                    visited,
                    fault_logged,
                    fsm,
                    ..
                } = &mut self.states[id.index()];
                *total_influence += influence;
                let Some(fsm) = fsm.as_mut() else {
                    return;
                };

                if !*visited {
                    *visited = true;
                    let entered = machine.check_transitions(fsm, buffer, self.vm, fault_logged);
                    if let Some(event) = entered.and_then(|s| machine.states[s].on_enter) {
                        if let Some(flag) = self.feedback.get_mut(event.0 as usize) {
                            *flag = true;
                        }
                    }
                }

                let child = machine.current_node(fsm);
                self.visit(child, influence);
            }
        }
    }
}

/// The pose a node exposes to its consumers.
fn node_output<'a>(
    graph: &'a AnimGraph,
    states: &'a [NodeState],
    samplers: &'a [ClipSampler],
    id: NodeId,
) -> &'a SampleBuffer {
    match &graph.nodes[id.index()] {
        BlendNode::Clip { sampler } => samplers[sampler.0 as usize].buffer(),
        BlendNode::Frame { pose } => pose,
        BlendNode::Blend2 { .. } | BlendNode::Fsm(_) => &states[id.index()].buffer,
    }
}

/// Clip-attached timelines only fire while their sampler leads the group.
#[inline]
fn fires_for<T>(attached: &AttachedTimeline<T>, top: SamplerId) -> bool {
    attached.owner.is_none_or(|owner| owner == top)
}

fn check_id(exists: bool, kind: &str, index: u32) -> bool {
    if !exists {
        log::error!("AnimGraphInstance: unknown {kind} id {index}");
    }
    debug_assert!(exists, "unknown {kind} id {index}");
    exists
}
