use std::sync::Arc;

use slotmap::{SecondaryMap, SlotMap};
use smallvec::SmallVec;

use crate::animation::binder::Binder;
use crate::animation::clip::Clip;
use crate::animation::ids::{FeedbackEventId, ParamId, SamplerId, SignalId, SyncGroupId};
use crate::animation::sampler::sample_clip_pose;
use crate::animation::skeleton::SkeletonLayout;
use crate::animation::timeline::{AudioCue, EventKey, HitboxKey, Timeline};
use crate::errors::{AnimError, Result};
use crate::expr::{ExprVm, ExpressionVm, ProgramAddr, VariableId};
use crate::graph::NodeKey;
use crate::graph::anim_graph::{AnimGraph, AttachedTimeline, SamplerDef, SyncGroupDef};
use crate::graph::fsm::{State, StateMachine, StateMachineDesc, Transition};
use crate::graph::node::{BlendNode, NodeDesc, NodeId};
use crate::utils::IdTable;

#[derive(Debug, Clone)]
struct SamplerDesc {
    clip: Arc<Clip>,
    group: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct GroupTimelines {
    hitbox_tracks: Vec<Arc<Timeline<HitboxKey>>>,
    audio: Vec<Arc<Timeline<AudioCue>>>,
    events: Vec<Arc<Timeline<EventKey>>>,
}

/// Authoring-time graph description; [`compile`](Self::compile) turns it
/// into a shareable [`AnimGraph`].
///
/// ```rust,ignore
/// let mut b = AnimGraphBuilder::new(skeleton);
/// b.parameter("speed", 0.0);
/// let loco = b.sync_group("locomotion");
/// b.sampler("walk", walk_clip, Some("locomotion"));
/// b.sampler("run", run_clip, Some("locomotion"));
///
/// let walk = b.add_node(NodeDesc::clip("walk"));
/// let run = b.add_node(NodeDesc::clip("run"));
/// let blend = b.add_node(NodeDesc::blend2(walk, run, "speed"));
/// b.set_output(blend);
///
/// let graph = Arc::new(b.compile()?);
/// let mut instance = AnimGraph::create_instance(&graph);
/// ```
#[derive(Debug)]
pub struct AnimGraphBuilder {
    skeleton: SkeletonLayout,
    vm: Box<dyn ExpressionVm>,

    nodes: SlotMap<NodeKey, NodeDesc>,
    output: Option<NodeKey>,

    params: IdTable<ParamId>,
    param_defaults: Vec<f32>,
    signals: IdTable<SignalId>,
    feedback_events: IdTable<FeedbackEventId>,

    sync_groups: IdTable<SyncGroupId>,
    group_timelines: Vec<GroupTimelines>,

    samplers: IdTable<SamplerId>,
    sampler_descs: Vec<SamplerDesc>,
}

impl AnimGraphBuilder {
    /// A builder evaluating expressions with the built-in [`ExprVm`].
    #[must_use]
    pub fn new(skeleton: SkeletonLayout) -> Self {
        Self::with_vm(skeleton, Box::new(ExprVm::new()))
    }

    #[must_use]
    pub fn with_vm(skeleton: SkeletonLayout, vm: Box<dyn ExpressionVm>) -> Self {
        Self {
            skeleton,
            vm,
            nodes: SlotMap::with_key(),
            output: None,
            params: IdTable::new(),
            param_defaults: Vec::new(),
            signals: IdTable::new(),
            feedback_events: IdTable::new(),
            sync_groups: IdTable::new(),
            group_timelines: Vec::new(),
            samplers: IdTable::new(),
            sampler_descs: Vec::new(),
        }
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// Declares a float parameter. Redeclaring updates the default.
    pub fn parameter(&mut self, name: &str, default: f32) -> ParamId {
        let id = self.params.intern(name);
        if id.0 as usize == self.param_defaults.len() {
            self.param_defaults.push(default);
        } else {
            self.param_defaults[id.0 as usize] = default;
        }
        id
    }

    pub fn signal(&mut self, name: &str) -> SignalId {
        self.signals.intern(name)
    }

    pub fn feedback_event(&mut self, name: &str) -> FeedbackEventId {
        self.feedback_events.intern(name)
    }

    pub fn sync_group(&mut self, name: &str) -> SyncGroupId {
        let id = self.sync_groups.intern(name);
        if id.0 as usize == self.group_timelines.len() {
            self.group_timelines.push(GroupTimelines::default());
        }
        id
    }

    /// Registers a sampler playing `clip`. Without a group the sampler gets
    /// a private one.
    pub fn sampler(&mut self, name: &str, clip: Arc<Clip>, group: Option<&str>) -> SamplerId {
        let id = self.samplers.intern(name);
        let desc = SamplerDesc {
            clip,
            group: group.map(str::to_owned),
        };
        if id.0 as usize == self.sampler_descs.len() {
            self.sampler_descs.push(desc);
        } else {
            self.sampler_descs[id.0 as usize] = desc;
        }
        id
    }

    // ========================================================================
    // Group timelines
    // ========================================================================

    pub fn attach_hitbox_track(&mut self, group: SyncGroupId, timeline: Timeline<HitboxKey>) {
        if let Some(g) = self.group_timelines.get_mut(group.0 as usize) {
            g.hitbox_tracks.push(Arc::new(timeline));
        }
    }

    pub fn attach_audio(&mut self, group: SyncGroupId, timeline: Timeline<AudioCue>) {
        if let Some(g) = self.group_timelines.get_mut(group.0 as usize) {
            g.audio.push(Arc::new(timeline));
        }
    }

    pub fn attach_events(&mut self, group: SyncGroupId, timeline: Timeline<EventKey>) {
        if let Some(g) = self.group_timelines.get_mut(group.0 as usize) {
            g.events.push(Arc::new(timeline));
        }
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    pub fn add_node(&mut self, desc: NodeDesc) -> NodeKey {
        self.nodes.insert(desc)
    }

    pub fn add_state_machine(&mut self, desc: StateMachineDesc) -> NodeKey {
        self.nodes.insert(NodeDesc::Fsm(desc))
    }

    pub fn remove_node(&mut self, key: NodeKey) -> Option<NodeDesc> {
        if self.output == Some(key) {
            self.output = None;
        }
        self.nodes.remove(key)
    }

    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&NodeDesc> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut NodeDesc> {
        self.nodes.get_mut(key)
    }

    /// Connects `input` to slot 0 (A) or 1 (B) of a blend node.
    ///
    /// Returns `false` if `node` is not a blend node or `slot` is out of range.
    pub fn connect(&mut self, node: NodeKey, slot: usize, input: NodeKey) -> bool {
        match (self.nodes.get_mut(node), slot) {
            (Some(NodeDesc::Blend2 { input_a, .. }), 0) => *input_a = Some(input),
            (Some(NodeDesc::Blend2 { input_b, .. }), 1) => *input_b = Some(input),
            _ => return false,
        }
        true
    }

    pub fn set_output(&mut self, node: NodeKey) {
        self.output = Some(node);
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Validates the description and compiles it.
    ///
    /// Any error means the graph is unusable; the error is also logged.
    pub fn compile(self) -> Result<AnimGraph> {
        self.compile_inner().inspect_err(|err| {
            log::error!("AnimGraph compile failed: {err}");
        })
    }

    fn compile_inner(self) -> Result<AnimGraph> {
        let Self {
            skeleton,
            mut vm,
            nodes,
            output,
            params,
            param_defaults,
            signals,
            mut feedback_events,
            sync_groups,
            group_timelines,
            samplers,
            sampler_descs,
        } = self;

        let output = output.ok_or(AnimError::MissingOutputNode)?;

        // 1. Samplers and sync groups.
        let (sampler_defs, group_defs) = compile_samplers(
            &skeleton,
            &samplers,
            &sampler_descs,
            &sync_groups,
            &group_timelines,
            &mut feedback_events,
        )?;

        // 2. Execution priorities over the nodes reachable from the output.
        let mut order = PriorityPass::default();
        order.visit(&nodes, output, 0)?;

        let mut node_ids: SecondaryMap<NodeKey, NodeId> = SecondaryMap::new();
        for (i, &key) in order.visit_order.iter().enumerate() {
            node_ids.insert(key, NodeId(i as u32));
        }

        // 3. Compiled nodes.
        let param_count = params.len() as u32;
        let resolve = |name: &str| -> Option<VariableId> {
            params
                .get(name)
                .map(|p| VariableId(p.0))
                .or_else(|| signals.get(name).map(|s| VariableId(param_count + s.0)))
        };
        let compile_expr = |vm: &mut dyn ExpressionVm, source: &str| -> Result<ProgramAddr> {
            vm.compile(source, &resolve).map_err(|e| AnimError::Expression {
                expr: source.to_owned(),
                offset: e.offset,
                message: e.message,
            })
        };

        let mut compiled = Vec::with_capacity(order.visit_order.len());
        for &key in &order.visit_order {
            let node = match &nodes[key] {
                NodeDesc::Clip { sampler } => BlendNode::Clip {
                    sampler: samplers
                        .get(sampler)
                        .ok_or_else(|| AnimError::UnresolvedSampler(sampler.clone()))?,
                },
                NodeDesc::Blend2 {
                    input_a,
                    input_b,
                    weight,
                } => {
                    let a = input_a.ok_or(AnimError::MissingBlendInput { node: key, slot: 0 })?;
                    let b = input_b.ok_or(AnimError::MissingBlendInput { node: key, slot: 1 })?;
                    BlendNode::Blend2 {
                        inputs: [node_ids[a], node_ids[b]],
                        weight: compile_expr(vm.as_mut(), weight.as_str())?,
                    }
                }
                NodeDesc::Frame { clip, frame } => {
                    validate_clip(clip)?;
                    if !(0.0..=clip.length).contains(frame) {
                        return Err(AnimError::InvalidFrame {
                            node: key,
                            frame: *frame,
                            length: clip.length,
                        });
                    }
                    let bindings = Binder::bind(&skeleton, clip);
                    let mut pose = skeleton.rest_buffer();
                    sample_clip_pose(clip, &bindings, *frame, &mut pose);
                    BlendNode::Frame { pose }
                }
                NodeDesc::Fsm(desc) => {
                    if desc.states.is_empty() {
                        return Err(AnimError::EmptyStateMachine(key));
                    }
                    let find = |name: &str| {
                        desc.state_index(name).ok_or_else(|| AnimError::UnknownState {
                            node: key,
                            state: name.to_owned(),
                        })
                    };
                    let initial = desc.initial.as_deref().map_or(Ok(0), find)?;

                    let mut states: Vec<State> = desc
                        .states
                        .iter()
                        .map(|s| State {
                            name: s.name.clone(),
                            node: node_ids[s.node],
                            on_enter: s.on_enter.as_deref().map(|e| feedback_events.intern(e)),
                            transitions: SmallVec::new(),
                        })
                        .collect();

                    for t in &desc.transitions {
                        let from = find(&t.from)?;
                        let target = find(&t.to)?;
                        let predicate = compile_expr(vm.as_mut(), t.predicate.as_str())?;
                        states[from].transitions.push(Transition {
                            target,
                            predicate,
                            duration: t.duration,
                        });
                    }

                    BlendNode::Fsm(StateMachine { states, initial })
                }
            };
            compiled.push(node);
        }

        // 4. Execution chain: deepest first, so inputs always precede consumers.
        let mut exec_chain: Vec<NodeId> = (0..compiled.len() as u32).map(NodeId).collect();
        exec_chain.sort_by(|a, b| {
            let pa = order.priority[order.visit_order[a.index()]];
            let pb = order.priority[order.visit_order[b.index()]];
            pb.cmp(&pa)
        });
        let exec_priority = order
            .visit_order
            .iter()
            .map(|&key| order.priority[key])
            .collect();

        let output = node_ids[output];

        log::debug!(
            "AnimGraph compiled: {} nodes, {} samplers, {} sync groups",
            compiled.len(),
            sampler_defs.len(),
            group_defs.len()
        );

        Ok(AnimGraph {
            skeleton,
            vm,
            nodes: compiled,
            node_keys: order.visit_order,
            node_ids,
            exec_chain,
            exec_priority,
            output,
            samplers: sampler_defs,
            sync_groups: group_defs,
            params,
            param_defaults,
            signals,
            feedback_events,
            sampler_names: samplers,
            sync_group_names: sync_groups,
        })
    }
}

fn validate_clip(clip: &Clip) -> Result<()> {
    match clip.validate() {
        Some(reason) => Err(AnimError::InvalidClip {
            name: clip.name.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

fn compile_samplers(
    skeleton: &SkeletonLayout,
    samplers: &IdTable<SamplerId>,
    descs: &[SamplerDesc],
    sync_groups: &IdTable<SyncGroupId>,
    group_timelines: &[GroupTimelines],
    feedback_events: &mut IdTable<FeedbackEventId>,
) -> Result<(Vec<SamplerDef>, Vec<SyncGroupDef>)> {
    let mut groups: Vec<SyncGroupDef> = sync_groups
        .iter()
        .zip(group_timelines)
        .map(|((_, name), timelines)| SyncGroupDef {
            name: name.to_owned(),
            members: Vec::new(),
            hitbox_tracks: timelines
                .hitbox_tracks
                .iter()
                .map(|t| AttachedTimeline::shared(t.clone()))
                .collect(),
            audio: timelines
                .audio
                .iter()
                .map(|t| AttachedTimeline::shared(t.clone()))
                .collect(),
            events: timelines
                .events
                .iter()
                .map(|t| AttachedTimeline::shared(Arc::new(t.map(|e| feedback_events.intern(&e.name)))))
                .collect(),
        })
        .collect();

    let mut defs = Vec::with_capacity(descs.len());
    for ((id, name), desc) in samplers.iter().zip(descs) {
        validate_clip(&desc.clip)?;

        let group = match &desc.group {
            Some(group_name) => sync_groups.get(group_name).ok_or_else(|| AnimError::UnknownSyncGroup {
                sampler: name.to_owned(),
                group: group_name.clone(),
            })?,
            None => {
                groups.push(SyncGroupDef {
                    name: name.to_owned(),
                    ..SyncGroupDef::default()
                });
                SyncGroupId(groups.len() as u32 - 1)
            }
        };

        let def = &mut groups[group.0 as usize];
        def.members.push(id);

        let clip = &desc.clip;
        def.hitbox_tracks
            .extend(clip.hitbox_tracks.iter().map(|t| AttachedTimeline::owned(t.clone(), id)));
        if let Some(audio) = &clip.audio {
            def.audio.push(AttachedTimeline::owned(audio.clone(), id));
        }
        if let Some(events) = &clip.events {
            let mapped = events.map(|e| feedback_events.intern(&e.name));
            def.events.push(AttachedTimeline::owned(Arc::new(mapped), id));
        }

        defs.push(SamplerDef {
            name: name.to_owned(),
            clip: clip.clone(),
            bindings: Binder::bind(skeleton, clip).into(),
            sync_group: group,
        });
    }

    Ok((defs, groups))
}

/// First compile pass: assigns every reachable node the largest distance
/// from the output it is reached at.
#[derive(Default)]
struct PriorityPass {
    priority: SecondaryMap<NodeKey, u32>,
    visit_order: Vec<NodeKey>,
    on_path: SecondaryMap<NodeKey, ()>,
}

impl PriorityPass {
    fn visit(&mut self, nodes: &SlotMap<NodeKey, NodeDesc>, key: NodeKey, order: u32) -> Result<()> {
        let desc = nodes.get(key).ok_or(AnimError::UnknownNode(key))?;
        if self.on_path.contains_key(key) {
            return Err(AnimError::CyclicGraph(key));
        }

        match self.priority.get(key) {
            // Subtree already carries larger priorities.
            Some(&p) if p >= order => return Ok(()),
            Some(_) => {}
            None => self.visit_order.push(key),
        }
        self.priority.insert(key, order);

        self.on_path.insert(key, ());
        for (slot, input) in desc.inputs().into_iter().enumerate() {
            let input = input.ok_or(AnimError::MissingBlendInput { node: key, slot })?;
            self.visit(nodes, input, order + 1)?;
        }
        self.on_path.remove(key);
        Ok(())
    }
}
