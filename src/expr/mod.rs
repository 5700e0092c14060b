//! Expression Evaluation
//!
//! Blend weights and state machine transition predicates are small programs
//! evaluated once per frame. The animation graph only talks to them through
//! the narrow [`ExpressionVm`] interface:
//!
//! - [`ExpressionVm::compile`]: source text to a [`ProgramAddr`]
//! - [`ExpressionVm::evaluate`]: run the program at an address
//! - [`ExpressionVm::set_variable`]: write a parameter or signal value
//!
//! [`ExprVm`] is the built-in implementation. Any other evaluator can be
//! plugged into [`AnimGraphBuilder::with_vm`](crate::graph::AnimGraphBuilder::with_vm).

mod compiler;
mod lexer;
pub mod vm;

use std::fmt;

pub use vm::{ExprVm, truthy};
pub(crate) use vm::finite_or_zero;

/// Address of a compiled program inside a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramAddr(pub u32);

/// Index of a variable slot inside a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(pub u32);

/// Compilation failure with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    pub offset: usize,
    pub message: String,
}

impl ExprError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expr error at byte {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for ExprError {}

/// Pluggable evaluator for weight expressions and transition predicates.
///
/// A graph template owns one VM holding every compiled program. Each graph
/// instance evaluates against its own [`fork`](ExpressionVm::fork), so
/// variable writes never leak between instances.
pub trait ExpressionVm: fmt::Debug + Send + Sync {
    /// Compiles `source`, resolving variable names through `resolve`.
    fn compile(
        &mut self,
        source: &str,
        resolve: &dyn Fn(&str) -> Option<VariableId>,
    ) -> Result<ProgramAddr, ExprError>;

    fn evaluate(&self, program: ProgramAddr) -> f32;

    fn set_variable(&mut self, id: VariableId, value: f32);

    /// Clones compiled programs and variable state into a new VM.
    fn fork(&self) -> Box<dyn ExpressionVm>;
}
