//! Animation Graph Tests
//!
//! Tests for:
//! - Compilation: execution order, priorities, wiring diagnostics
//! - Influence propagation into sync groups
//! - Blend2 weights driven by parameters
//! - State machines: cuts, cross-fades, signals, on-enter events
//! - Hitbox / audio / event timelines sampled per sync group
//! - Template sharing between instances

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use anyhow::Result;
use glam::{Quat, Vec3};

use myth_animgraph::animation::{
    AudioCue, Clip, EventKey, HitboxKey, HitboxShape, InterpolationMode, KeyframeTrack, Sample,
    SamplerId, SkeletonLayout, TargetPath, Timeline, Track, TrackData, TrackMeta,
};
use myth_animgraph::graph::{
    AnimGraph, AnimGraphBuilder, AnimGraphInstance, NodeDesc, NodeKey, StateMachineDesc,
};
use myth_animgraph::AnimError;

const EPSILON: f32 = 1e-4;
const FRAME: f32 = 1.0 / 30.0;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn skeleton() -> SkeletonLayout {
    SkeletonLayout::new(["root", "arm"])
}

/// `length` frames at 30 fps; the arm turns 90 degrees about Z and the root
/// slides 3 units along +X over the clip.
fn wave_clip(name: &str, length: f32) -> Clip {
    Clip::new(
        name,
        length,
        30.0,
        vec![
            Track {
                meta: TrackMeta::new("arm", TargetPath::Rotation),
                data: TrackData::Quaternion(KeyframeTrack::new(
                    vec![0.0, length],
                    vec![Quat::IDENTITY, Quat::from_rotation_z(FRAC_PI_2)],
                    InterpolationMode::Linear,
                )),
            },
            Track {
                meta: TrackMeta::new("root", TargetPath::Translation),
                data: TrackData::Vector3(KeyframeTrack::new(
                    vec![0.0, length],
                    vec![Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)],
                    InterpolationMode::Linear,
                )),
            },
        ],
    )
}

fn arm_rotation(instance: &AnimGraphInstance) -> Quat {
    instance.output().samples[1].rotation
}

fn assert_arm(instance: &AnimGraphInstance, degrees: f32) {
    let expected = Quat::from_rotation_z(degrees.to_radians());
    let angle = arm_rotation(instance).angle_between(expected);
    assert!(angle < EPSILON, "arm off by {angle} rad from {degrees} deg");
}

fn clip_graph(builder: &mut AnimGraphBuilder, names: &[&str]) -> Vec<NodeKey> {
    names
        .iter()
        .map(|name| {
            builder.sampler(name, Arc::new(wave_clip(name, 30.0)), None);
            builder.add_node(NodeDesc::clip(name))
        })
        .collect()
}

// ============================================================================
// Compilation
// ============================================================================

#[test]
fn diamond_executes_inputs_first() -> Result<()> {
    init_logger();
    let mut b = AnimGraphBuilder::new(skeleton());
    let [a, bb, c] = clip_graph(&mut b, &["a", "b", "c"])[..] else {
        unreachable!()
    };
    let x = b.add_node(NodeDesc::blend2(a, bb, "0.5"));
    let y = b.add_node(NodeDesc::blend2(x, c, "0.5"));
    b.set_output(y);

    let graph = b.compile()?;
    let position = |key: NodeKey| {
        let id = graph.node_id(key).expect("reachable");
        graph.exec_chain().iter().position(|&n| n == id).expect("in chain")
    };

    assert_eq!(graph.node_count(), 5);
    assert!(position(a) < position(x));
    assert!(position(bb) < position(x));
    assert!(position(x) < position(y));
    assert!(position(c) < position(y));
    assert_eq!(graph.exec_chain().last().copied(), Some(graph.output_node()));
    Ok(())
}

#[test]
fn shared_node_takes_deepest_priority() -> Result<()> {
    let mut b = AnimGraphBuilder::new(skeleton());
    let [a, bb] = clip_graph(&mut b, &["a", "b"])[..] else {
        unreachable!()
    };
    // `a` is reached at depth 1 first, then at depth 2 through `x`.
    let x = b.add_node(NodeDesc::blend2(a, bb, "0.5"));
    let y = b.add_node(NodeDesc::blend2(a, x, "0.5"));
    b.set_output(y);

    let graph = b.compile()?;
    let priority = |key| graph.node_id(key).and_then(|id| graph.exec_priority(id));
    assert_eq!(priority(y), Some(0));
    assert_eq!(priority(x), Some(1));
    assert_eq!(priority(a), Some(2));
    assert_eq!(priority(bb), Some(2));
    Ok(())
}

#[test]
fn unreachable_nodes_are_not_compiled() -> Result<()> {
    let mut b = AnimGraphBuilder::new(skeleton());
    let [a, orphan] = clip_graph(&mut b, &["a", "orphan"])[..] else {
        unreachable!()
    };
    b.set_output(a);

    let graph = b.compile()?;
    assert_eq!(graph.node_count(), 1);
    assert!(graph.node_id(orphan).is_none());
    // The sampler itself still exists and plays in its own group.
    assert_eq!(graph.sampler_count(), 2);
    Ok(())
}

#[test]
fn compile_reports_wiring_errors() {
    init_logger();

    let b = AnimGraphBuilder::new(skeleton());
    assert_eq!(b.compile().err(), Some(AnimError::MissingOutputNode));

    let mut b = AnimGraphBuilder::new(skeleton());
    let [a] = clip_graph(&mut b, &["a"])[..] else {
        unreachable!()
    };
    let blend = b.add_node(NodeDesc::Blend2 {
        input_a: Some(a),
        input_b: None,
        weight: "0.5".into(),
    });
    b.set_output(blend);
    assert!(matches!(
        b.compile(),
        Err(AnimError::MissingBlendInput { slot: 1, .. })
    ));

    let mut b = AnimGraphBuilder::new(skeleton());
    let ghost = b.add_node(NodeDesc::clip("ghost"));
    b.set_output(ghost);
    assert_eq!(
        b.compile().err(),
        Some(AnimError::UnresolvedSampler("ghost".into()))
    );

    let mut b = AnimGraphBuilder::new(skeleton());
    b.sampler("walk", Arc::new(wave_clip("walk", 30.0)), Some("locomotion"));
    let walk = b.add_node(NodeDesc::clip("walk"));
    b.set_output(walk);
    assert!(matches!(b.compile(), Err(AnimError::UnknownSyncGroup { .. })));
}

#[test]
fn compile_rejects_cycles() {
    let mut b = AnimGraphBuilder::new(skeleton());
    let [a, bb] = clip_graph(&mut b, &["a", "b"])[..] else {
        unreachable!()
    };
    let x = b.add_node(NodeDesc::blend2(a, bb, "0.5"));
    let y = b.add_node(NodeDesc::blend2(x, a, "0.5"));
    assert!(b.connect(x, 1, y));
    b.set_output(y);

    assert!(matches!(b.compile(), Err(AnimError::CyclicGraph(_))));
}

#[test]
fn compile_rejects_removed_inputs() {
    let mut b = AnimGraphBuilder::new(skeleton());
    let [a, bb] = clip_graph(&mut b, &["a", "b"])[..] else {
        unreachable!()
    };
    let x = b.add_node(NodeDesc::blend2(a, bb, "0.5"));
    b.set_output(x);
    b.remove_node(bb);

    assert_eq!(b.compile().err(), Some(AnimError::UnknownNode(bb)));
}

#[test]
fn compile_reports_bad_expressions() {
    let mut b = AnimGraphBuilder::new(skeleton());
    let [a, bb] = clip_graph(&mut b, &["a", "b"])[..] else {
        unreachable!()
    };
    let x = b.add_node(NodeDesc::blend2(a, bb, "speed * 2"));
    b.set_output(x);

    match b.compile() {
        Err(AnimError::Expression { expr, offset, .. }) => {
            assert_eq!(expr, "speed * 2");
            assert_eq!(offset, 0);
        }
        other => panic!("expected expression error, got {other:?}"),
    }
}

#[test]
fn compile_reports_state_machine_errors() {
    let mut b = AnimGraphBuilder::new(skeleton());
    let fsm = b.add_state_machine(StateMachineDesc::new());
    b.set_output(fsm);
    assert_eq!(b.compile().err(), Some(AnimError::EmptyStateMachine(fsm)));

    let mut b = AnimGraphBuilder::new(skeleton());
    let [a] = clip_graph(&mut b, &["a"])[..] else {
        unreachable!()
    };
    let fsm = b.add_state_machine(
        StateMachineDesc::new()
            .state("idle", a)
            .transition("idle", "nowhere", "1", 0.0),
    );
    b.set_output(fsm);
    assert!(matches!(
        b.compile(),
        Err(AnimError::UnknownState { state, .. }) if state == "nowhere"
    ));
}

#[test]
fn compile_validates_clips_and_frames() {
    let mut b = AnimGraphBuilder::new(skeleton());
    b.sampler("broken", Arc::new(Clip::new("broken", 0.0, 30.0, Vec::new())), None);
    let node = b.add_node(NodeDesc::clip("broken"));
    b.set_output(node);
    assert!(matches!(b.compile(), Err(AnimError::InvalidClip { .. })));

    let mut b = AnimGraphBuilder::new(skeleton());
    let frame = b.add_node(NodeDesc::frame(Arc::new(wave_clip("wave", 30.0)), 45.0));
    b.set_output(frame);
    assert!(matches!(
        b.compile(),
        Err(AnimError::InvalidFrame { frame: 45.0, .. })
    ));
}

// ============================================================================
// Blending
// ============================================================================

fn frame_blend_graph() -> Result<(Arc<AnimGraph>, NodeKey)> {
    let mut b = AnimGraphBuilder::new(skeleton());
    b.parameter("w", 0.25);
    let clip = Arc::new(wave_clip("wave", 30.0));
    let start = b.add_node(NodeDesc::frame(clip.clone(), 0.0));
    let end = b.add_node(NodeDesc::frame(clip, 30.0));
    let blend = b.add_node(NodeDesc::blend2(start, end, "w"));
    b.set_output(blend);
    Ok((Arc::new(b.compile()?), blend))
}

#[test]
fn output_starts_at_rest_pose() -> Result<()> {
    let (graph, _) = frame_blend_graph()?;
    let instance = graph.create_instance();
    assert_eq!(instance.output(), &skeleton().rest_buffer());
    Ok(())
}

#[test]
fn blend_weight_comes_from_parameter() -> Result<()> {
    let (graph, blend) = frame_blend_graph()?;
    let mut instance = graph.create_instance();

    instance.update(FRAME);
    assert_arm(&instance, 22.5);
    let root = instance.output().samples[0].translation;
    assert!(root.abs_diff_eq(Vec3::new(0.75, 0.0, 0.0), EPSILON));
    assert_eq!(instance.blend_weight(blend), 0.25);

    let w = graph.param_id("w").expect("declared");
    instance.set_parameter(w, 1.0);
    instance.update(FRAME);
    assert_arm(&instance, 90.0);
    Ok(())
}

#[test]
fn blend_weight_is_clamped() -> Result<()> {
    let (graph, blend) = frame_blend_graph()?;
    let mut instance = graph.create_instance();

    assert!(instance.set_parameter_by_name("w", 3.0));
    instance.update(FRAME);
    assert_eq!(instance.blend_weight(blend), 1.0);
    assert_arm(&instance, 90.0);

    assert!(instance.set_parameter_by_name("w", -2.0));
    instance.update(FRAME);
    assert_eq!(instance.blend_weight(blend), 0.0);
    assert_arm(&instance, 0.0);

    assert!(!instance.set_parameter_by_name("missing", 1.0));
    Ok(())
}

fn assert_pose_finite(instance: &AnimGraphInstance) {
    for (i, s) in instance.output().samples.iter().enumerate() {
        assert!(
            s.translation.is_finite() && s.rotation.is_finite() && s.scale.is_finite(),
            "node {i} has a non-finite transform: {s:?}"
        );
    }
}

#[test]
fn non_finite_blend_weight_falls_back_to_zero() -> Result<()> {
    init_logger();
    let mut b = AnimGraphBuilder::new(skeleton());
    b.parameter("w", 0.0);
    b.parameter("d", 0.0);
    let clip = Arc::new(wave_clip("wave", 30.0));
    let start = b.add_node(NodeDesc::frame(clip.clone(), 0.0));
    let end = b.add_node(NodeDesc::frame(clip, 30.0));
    let blend = b.add_node(NodeDesc::blend2(start, end, "w / d"));
    b.set_output(blend);
    let graph = Arc::new(b.compile()?);
    let mut instance = graph.create_instance();

    // 0 / 0
    instance.update(FRAME);
    assert_eq!(instance.blend_weight(blend), 0.0);
    assert_pose_finite(&instance);
    assert_arm(&instance, 0.0);

    // 1 / 0 would otherwise clamp to a full blend.
    assert!(instance.set_parameter_by_name("w", 1.0));
    instance.update(FRAME);
    assert_eq!(instance.blend_weight(blend), 0.0);
    assert_pose_finite(&instance);
    assert_arm(&instance, 0.0);

    assert!(instance.set_parameter_by_name("d", 2.0));
    instance.update(FRAME);
    assert_eq!(instance.blend_weight(blend), 0.5);
    assert_arm(&instance, 45.0);
    Ok(())
}

#[test]
fn non_finite_blend_weight_keeps_samplers_finite() -> Result<()> {
    let mut b = AnimGraphBuilder::new(skeleton());
    b.parameter("w", 0.0);
    b.parameter("d", 0.0);
    b.sync_group("locomotion");
    let walk_id = b.sampler("walk", Arc::new(wave_clip("walk", 30.0)), Some("locomotion"));
    let run_id = b.sampler("run", Arc::new(wave_clip("run", 60.0)), Some("locomotion"));
    let walk = b.add_node(NodeDesc::clip("walk"));
    let run = b.add_node(NodeDesc::clip("run"));
    let blend = b.add_node(NodeDesc::blend2(walk, run, "w / d"));
    b.set_output(blend);
    let graph = Arc::new(b.compile()?);
    let mut instance = graph.create_instance();

    for _ in 0..3 {
        instance.update(FRAME);
    }

    let walk = instance.sampler(walk_id).expect("walk");
    let run = instance.sampler(run_id).expect("run");
    assert_eq!(walk.total_influence(), 1.0);
    assert_eq!(run.total_influence(), 0.0);
    assert!(walk.length_scaled().is_finite() && walk.cursor().is_finite());
    assert!(run.length_scaled().is_finite() && run.cursor().is_finite());
    assert_pose_finite(&instance);
    Ok(())
}

#[test]
fn instances_do_not_share_state() -> Result<()> {
    let (graph, _) = frame_blend_graph()?;
    let mut first = graph.create_instance();
    let mut second = graph.create_instance();
    let w = graph.param_id("w").expect("declared");

    first.set_parameter(w, 1.0);
    first.update(FRAME);
    second.update(FRAME);

    assert_eq!(second.parameter(w), 0.25);
    assert_arm(&first, 90.0);
    assert_arm(&second, 22.5);
    Ok(())
}

#[test]
fn graph_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    fn assert_send<T: Send>() {}
    assert_send_sync::<AnimGraph>();
    assert_send::<AnimGraphInstance>();
}

// ============================================================================
// Sync groups
// ============================================================================

fn locomotion_graph(walk: Clip, run: Clip) -> Result<(Arc<AnimGraph>, SamplerId, SamplerId)> {
    let mut b = AnimGraphBuilder::new(skeleton());
    b.parameter("speed", 0.75);
    b.sync_group("locomotion");
    let walk_id = b.sampler("walk", Arc::new(walk), Some("locomotion"));
    let run_id = b.sampler("run", Arc::new(run), Some("locomotion"));
    let walk = b.add_node(NodeDesc::clip("walk"));
    let run = b.add_node(NodeDesc::clip("run"));
    let blend = b.add_node(NodeDesc::blend2(walk, run, "speed"));
    b.set_output(blend);
    Ok((Arc::new(b.compile()?), walk_id, run_id))
}

#[test]
fn influence_reaches_samplers() -> Result<()> {
    let (graph, walk, run) = locomotion_graph(wave_clip("walk", 30.0), wave_clip("run", 60.0))?;
    let mut instance = graph.create_instance();
    instance.update(FRAME);

    let walk = instance.sampler(walk).expect("walk");
    let run = instance.sampler(run).expect("run");
    assert!((walk.total_influence() - 0.25).abs() < EPSILON);
    assert!((run.total_influence() - 0.75).abs() < EPSILON);
    assert!((walk.length_scaled() - 37.5).abs() < EPSILON);
    assert!((run.length_scaled() - 52.5).abs() < EPSILON);

    let group = graph.sync_group_id("locomotion").expect("group");
    assert_eq!(
        instance.sync_group(group).and_then(|g| g.top_level_sampler()),
        graph.sampler_id("run")
    );
    Ok(())
}

#[test]
fn unweighted_group_stays_inert() -> Result<()> {
    let mut b = AnimGraphBuilder::new(skeleton());
    let [a, bb] = clip_graph(&mut b, &["a", "b"])[..] else {
        unreachable!()
    };
    let blend = b.add_node(NodeDesc::blend2(a, bb, "0"));
    b.set_output(blend);
    let graph = Arc::new(b.compile()?);

    // Each sampler got its own group.
    assert_eq!(graph.sync_group_count(), 2);
    assert!(graph.sync_group_id("a").is_none());

    let mut instance = graph.create_instance();
    for _ in 0..5 {
        instance.update(FRAME);
    }

    let a = graph.sampler_id("a").and_then(|id| instance.sampler(id)).expect("a");
    let b = graph.sampler_id("b").and_then(|id| instance.sampler(id)).expect("b");
    assert!((a.cursor() - 5.0).abs() < EPSILON);
    assert_eq!(b.cursor(), 0.0);
    Ok(())
}

#[test]
fn root_motion_flows_to_output() -> Result<()> {
    let walk = wave_clip("walk", 30.0).with_root_motion(myth_animgraph::animation::RootMotion::new(
        KeyframeTrack::new(
            vec![0.0, 30.0],
            vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 30.0)],
            InterpolationMode::Linear,
        ),
        KeyframeTrack::constant(Quat::IDENTITY),
    ));
    let mut b = AnimGraphBuilder::new(skeleton());
    b.sampler("walk", Arc::new(walk), None);
    let node = b.add_node(NodeDesc::clip("walk"));
    b.set_output(node);
    let graph = Arc::new(b.compile()?);
    let mut instance = graph.create_instance();

    instance.update(FRAME);
    instance.update(FRAME);
    let motion = instance.root_motion().unwrap_or(Sample::IDENTITY);
    assert!(motion.translation.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), EPSILON));
    Ok(())
}

// ============================================================================
// State machines
// ============================================================================

struct FsmFixture {
    graph: Arc<AnimGraph>,
    fsm: NodeKey,
}

/// `idle` holds frame 10 (arm at 30 deg), `wave` frame 30 (arm at 90 deg).
fn fsm_graph(predicate: &str, duration: f32) -> Result<FsmFixture> {
    let mut b = AnimGraphBuilder::new(skeleton());
    b.parameter("go", 0.0);
    b.signal("attack");
    let clip = Arc::new(wave_clip("wave", 30.0));
    let idle = b.add_node(NodeDesc::frame(clip.clone(), 10.0));
    let wave = b.add_node(NodeDesc::frame(clip, 30.0));
    let fsm = b.add_state_machine(
        StateMachineDesc::new()
            .state("idle", idle)
            .state_with_event("wave", wave, "waved")
            .transition("idle", "wave", predicate, duration)
            .initial("idle"),
    );
    b.set_output(fsm);
    Ok(FsmFixture {
        graph: Arc::new(b.compile()?),
        fsm,
    })
}

#[test]
fn signal_cuts_to_new_state() -> Result<()> {
    init_logger();
    let FsmFixture { graph, fsm } = fsm_graph("attack", 0.0)?;
    let attack = graph.signal_id("attack").expect("signal");
    let waved = graph.feedback_event_id("waved").expect("event");
    let mut instance = graph.create_instance();

    instance.update(FRAME);
    assert_eq!(instance.fsm_state_name(fsm), Some("idle"));
    assert_arm(&instance, 30.0);

    instance.trigger_signal(attack);
    assert!(instance.signal(attack));
    instance.update(FRAME);
    assert_eq!(instance.fsm_state_name(fsm), Some("wave"));
    assert!(!instance.fsm_state(fsm).is_some_and(|s| s.is_transitioning()));
    assert_arm(&instance, 90.0);
    assert!(instance.feedback_event(waved));
    assert!(!instance.signal(attack));

    instance.update(FRAME);
    assert!(!instance.feedback_event(waved));
    assert_eq!(instance.raised_feedback_events().count(), 0);
    Ok(())
}

#[test]
fn untriggered_signal_keeps_state() -> Result<()> {
    let FsmFixture { graph, fsm } = fsm_graph("attack", 0.0)?;
    let mut instance = graph.create_instance();
    for _ in 0..10 {
        instance.update(FRAME);
    }
    assert_eq!(instance.fsm_state_name(fsm), Some("idle"));
    Ok(())
}

#[test]
fn non_finite_predicate_is_false() -> Result<()> {
    init_logger();
    // 1 / 0 is infinite, which would read as true.
    let FsmFixture { graph, fsm } = fsm_graph("1 / go", 0.0)?;
    let go = graph.param_id("go").expect("param");
    let mut instance = graph.create_instance();

    for _ in 0..3 {
        instance.update(FRAME);
    }
    assert_eq!(instance.fsm_state_name(fsm), Some("idle"));
    assert_arm(&instance, 30.0);

    instance.set_parameter(go, 1.0);
    instance.update(FRAME);
    assert_eq!(instance.fsm_state_name(fsm), Some("wave"));
    assert_arm(&instance, 90.0);
    Ok(())
}

#[test]
fn transition_cross_fades_from_snapshot() -> Result<()> {
    let FsmFixture { graph, fsm } = fsm_graph("go > 0.5", 0.5)?;
    let go = graph.param_id("go").expect("param");
    let mut instance = graph.create_instance();

    instance.update(0.25);
    assert_arm(&instance, 30.0);

    instance.set_parameter(go, 1.0);
    instance.update(0.25);
    let state = instance.fsm_state(fsm).expect("fsm");
    assert!(state.is_transitioning());
    assert!((state.transition_factor() - 0.5).abs() < EPSILON);
    assert_eq!(state.transition_rate(), 2.0);
    assert_arm(&instance, 60.0);

    instance.update(0.25);
    let state = instance.fsm_state(fsm).expect("fsm");
    assert!(!state.is_transitioning());
    assert_eq!(state.transition_factor(), 1.0);
    assert_arm(&instance, 90.0);
    Ok(())
}

// ============================================================================
// Timelines
// ============================================================================

fn sphere() -> HitboxShape {
    HitboxShape::Sphere {
        center: Vec3::ZERO,
        radius: 0.5,
    }
}

#[test]
fn hitbox_timeline_fires_once_per_loop() -> Result<()> {
    let mut b = AnimGraphBuilder::new(skeleton());
    let combat = b.sync_group("combat");
    let swing = b.sampler("swing", Arc::new(wave_clip("swing", 30.0)), Some("combat"));
    b.attach_hitbox_track(
        combat,
        Timeline::from_keys(30.0, [(10.0, HitboxKey::new(sphere(), 4.0).on_node("arm"))]),
    );
    let node = b.add_node(NodeDesc::clip("swing"));
    b.set_output(node);
    let graph = Arc::new(b.compile()?);
    assert_eq!(graph.hitbox_capacity(), 1);

    let mut instance = graph.create_instance();
    let mut fired = Vec::new();
    for _ in 0..4 {
        instance.update(0.5);
        fired.push(instance.hitbox_commands().len());
    }
    // Windows: (0, 15], (15, 30], (0, 15], (15, 30].
    assert_eq!(fired, vec![1, 0, 1, 0]);

    instance.update(0.5);
    let command = &instance.hitbox_commands()[0];
    assert_eq!(command.sync_group, combat);
    assert_eq!(command.sampler, swing);
    assert_eq!(command.track, 0);
    assert_eq!(command.duration, 4.0);
    assert_eq!(command.node.as_deref(), Some("arm"));
    Ok(())
}

#[test]
fn clip_audio_fires_only_while_leading() -> Result<()> {
    let run = wave_clip("run", 30.0)
        .with_audio(Timeline::from_keys(30.0, [(10.0, AudioCue::new("stomp", 0.8))]));
    let (graph, _, run_id) = locomotion_graph(wave_clip("walk", 30.0), run)?;
    let speed = graph.param_id("speed").expect("param");

    let mut trailing = graph.create_instance();
    trailing.set_parameter(speed, 0.2);
    let mut leading = graph.create_instance();
    leading.set_parameter(speed, 0.8);

    let mut heard = 0;
    for _ in 0..2 {
        trailing.update(0.25);
        assert!(trailing.audio_commands().is_empty());

        leading.update(0.25);
        for command in leading.audio_commands() {
            assert_eq!(command.sampler, run_id);
            assert_eq!(&*command.cue.sound, "stomp");
            heard += 1;
        }
    }
    assert_eq!(heard, 1);
    Ok(())
}

#[test]
fn event_timeline_raises_feedback_for_one_frame() -> Result<()> {
    let mut b = AnimGraphBuilder::new(skeleton());
    let combat = b.sync_group("combat");
    b.sampler("swing", Arc::new(wave_clip("swing", 30.0)), Some("combat"));
    b.attach_events(
        combat,
        Timeline::from_keys(30.0, [(10.0, EventKey::new("footstep"))]),
    );
    let node = b.add_node(NodeDesc::clip("swing"));
    b.set_output(node);
    let graph = Arc::new(b.compile()?);
    let footstep = graph.feedback_event_id("footstep").expect("interned");
    assert_eq!(graph.feedback_event_name(footstep), Some("footstep"));

    let mut instance = graph.create_instance();
    instance.update(0.5);
    assert!(instance.feedback_event(footstep));
    assert_eq!(instance.raised_feedback_events().collect::<Vec<_>>(), vec![footstep]);

    instance.update(0.5);
    assert!(!instance.feedback_event(footstep));
    Ok(())
}
