//! State machine blend node.
//!
//! Only the current state's subtree receives influence. Switching states
//! freezes the machine's last output pose and cross-fades from that snapshot
//! into the new state over the transition's duration.

use smallvec::SmallVec;

use crate::animation::ids::FeedbackEventId;
use crate::animation::sample::{SampleBuffer, blend_samples};
use crate::expr::{ExpressionVm, ProgramAddr, finite_or_zero, truthy};
use crate::graph::NodeKey;
use crate::graph::node::NodeId;

// ============================================================================
// Authoring
// ============================================================================

#[derive(Debug, Clone)]
pub struct StateDesc {
    pub name: String,
    pub node: NodeKey,
    /// Feedback event raised when the state is entered.
    pub on_enter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransitionDesc {
    pub from: String,
    pub to: String,
    pub predicate: String,
    /// Cross-fade length in seconds; `<= 0` cuts immediately.
    pub duration: f32,
}

/// Authoring description of a state machine node.
///
/// ```rust,ignore
/// let fsm = StateMachineDesc::new()
///     .state("idle", idle)
///     .state("run", run)
///     .transition("idle", "run", "speed > 0.1", 0.2)
///     .transition("run", "idle", "speed <= 0.1", 0.3)
///     .initial("idle");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StateMachineDesc {
    pub states: Vec<StateDesc>,
    pub transitions: Vec<TransitionDesc>,
    pub initial: Option<String>,
}

impl StateMachineDesc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(mut self, name: &str, node: NodeKey) -> Self {
        self.states.push(StateDesc {
            name: name.to_owned(),
            node,
            on_enter: None,
        });
        self
    }

    #[must_use]
    pub fn state_with_event(mut self, name: &str, node: NodeKey, on_enter: &str) -> Self {
        self.states.push(StateDesc {
            name: name.to_owned(),
            node,
            on_enter: Some(on_enter.to_owned()),
        });
        self
    }

    #[must_use]
    pub fn transition(mut self, from: &str, to: &str, predicate: &str, duration: f32) -> Self {
        self.transitions.push(TransitionDesc {
            from: from.to_owned(),
            to: to.to_owned(),
            predicate: predicate.to_owned(),
            duration,
        });
        self
    }

    /// Starting state; defaults to the first declared state.
    #[must_use]
    pub fn initial(mut self, name: &str) -> Self {
        self.initial = Some(name.to_owned());
        self
    }

    pub(crate) fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }
}

// ============================================================================
// Compiled
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Transition {
    pub(crate) target: usize,
    pub(crate) predicate: ProgramAddr,
    pub(crate) duration: f32,
}

#[derive(Debug, Clone)]
pub(crate) struct State {
    pub(crate) name: String,
    pub(crate) node: NodeId,
    pub(crate) on_enter: Option<FeedbackEventId>,
    pub(crate) transitions: SmallVec<[Transition; 4]>,
}

#[derive(Debug, Clone)]
pub(crate) struct StateMachine {
    pub(crate) states: Vec<State>,
    pub(crate) initial: usize,
}

/// Runtime state of a state machine node.
#[derive(Debug, Clone, Default)]
pub struct FsmState {
    current_state: usize,
    is_transitioning: bool,
    transition_rate: f32,
    transition_factor: f32,
    snapshot: SampleBuffer,
}

impl FsmState {
    pub(crate) fn new(initial: usize, snapshot: SampleBuffer) -> Self {
        Self {
            current_state: initial,
            is_transitioning: false,
            transition_rate: 0.0,
            transition_factor: 0.0,
            snapshot,
        }
    }

    #[inline]
    #[must_use]
    pub fn current_state(&self) -> usize {
        self.current_state
    }

    #[inline]
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.is_transitioning
    }

    /// Cross-fade progress in `[0, 1]`.
    #[inline]
    #[must_use]
    pub fn transition_factor(&self) -> f32 {
        self.transition_factor
    }

    #[inline]
    #[must_use]
    pub fn transition_rate(&self) -> f32 {
        self.transition_rate
    }
}

impl StateMachine {
    pub(crate) fn current_node(&self, fsm: &FsmState) -> NodeId {
        self.states[fsm.current_state].node
    }

    pub(crate) fn state_name(&self, index: usize) -> Option<&str> {
        self.states.get(index).map(|s| s.name.as_str())
    }

    /// Fires the first outgoing transition whose predicate holds.
    ///
    /// `last_output` is the pose this node produced last frame; it becomes
    /// the cross-fade source. A non-finite predicate counts as false.
    /// Returns the entered state.
    pub(crate) fn check_transitions(
        &self,
        fsm: &mut FsmState,
        last_output: &SampleBuffer,
        vm: &dyn ExpressionVm,
        fault_logged: &mut bool,
    ) -> Option<usize> {
        let state = &self.states[fsm.current_state];
        let transition = state.transitions.iter().find(|t| {
            truthy(finite_or_zero(
                vm.evaluate(t.predicate),
                fault_logged,
                "FSM transition predicate",
            ))
        })?;

        log::debug!(
            "FSM transition '{}' -> '{}' over {}s",
            state.name,
            self.states[transition.target].name,
            transition.duration
        );

        fsm.current_state = transition.target;
        fsm.transition_factor = 0.0;
        if transition.duration > 0.0 {
            fsm.is_transitioning = true;
            fsm.transition_rate = 1.0 / transition.duration;
            fsm.snapshot.copy_from(last_output);
        } else {
            fsm.is_transitioning = false;
            fsm.transition_rate = 0.0;
        }
        Some(transition.target)
    }

    /// Writes this frame's output: the current state's pose, cross-faded from
    /// the snapshot while a transition is running.
    pub(crate) fn evaluate(fsm: &mut FsmState, current: &SampleBuffer, out: &mut SampleBuffer, dt: f32) {
        if !fsm.is_transitioning {
            out.copy_from(current);
            return;
        }

        fsm.transition_factor = (fsm.transition_factor + fsm.transition_rate * dt).min(1.0);
        blend_samples(&fsm.snapshot, current, out, fsm.transition_factor);

        if fsm.transition_factor >= 1.0 {
            fsm.is_transitioning = false;
        }
    }
}
