use smallvec::SmallVec;

use crate::expr::compiler::{Builtin, Op, compile_into};
use crate::expr::{ExprError, ExpressionVm, ProgramAddr, VariableId};

/// Default [`ExpressionVm`]: an `f32` stack machine.
///
/// All programs share one code arena; a [`ProgramAddr`] is the offset of a
/// program's first op. Booleans are `0.0` / `1.0`.
#[derive(Debug, Clone, Default)]
pub struct ExprVm {
    code: Vec<Op>,
    variables: Vec<f32>,
}

impl ExprVm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ops in the code arena.
    #[must_use]
    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    #[must_use]
    pub fn variable(&self, id: VariableId) -> f32 {
        self.variables.get(id.0 as usize).copied().unwrap_or(0.0)
    }

    fn run(&self, start: usize) -> f32 {
        let mut stack: SmallVec<[f32; 16]> = SmallVec::new();

        for &op in self.code.get(start..).unwrap_or_default() {
            match op {
                Op::Push(v) => stack.push(v),
                Op::Load(id) => stack.push(self.variable(id)),

                Op::Neg => unary(&mut stack, |a| -a),
                Op::Not => unary(&mut stack, |a| bool_value(!truthy(a))),
                Op::Add => binary(&mut stack, |a, b| a + b),
                Op::Sub => binary(&mut stack, |a, b| a - b),
                Op::Mul => binary(&mut stack, |a, b| a * b),
                Op::Div => binary(&mut stack, |a, b| a / b),
                Op::Mod => binary(&mut stack, |a, b| a % b),

                Op::Eq => binary(&mut stack, |a, b| bool_value(a == b)),
                Op::Ne => binary(&mut stack, |a, b| bool_value(a != b)),
                Op::Lt => binary(&mut stack, |a, b| bool_value(a < b)),
                Op::Le => binary(&mut stack, |a, b| bool_value(a <= b)),
                Op::Gt => binary(&mut stack, |a, b| bool_value(a > b)),
                Op::Ge => binary(&mut stack, |a, b| bool_value(a >= b)),
                Op::And => binary(&mut stack, |a, b| bool_value(truthy(a) && truthy(b))),
                Op::Or => binary(&mut stack, |a, b| bool_value(truthy(a) || truthy(b))),

                Op::Call(builtin) => call_builtin(&mut stack, builtin),
                Op::Ret => break,
            }
        }

        stack.pop().unwrap_or(0.0)
    }
}

impl ExpressionVm for ExprVm {
    fn compile(
        &mut self,
        source: &str,
        resolve: &dyn Fn(&str) -> Option<VariableId>,
    ) -> Result<ProgramAddr, ExprError> {
        let addr = ProgramAddr(self.code.len() as u32);
        compile_into(&mut self.code, source, resolve)?;
        Ok(addr)
    }

    fn evaluate(&self, program: ProgramAddr) -> f32 {
        self.run(program.0 as usize)
    }

    fn set_variable(&mut self, id: VariableId, value: f32) {
        let index = id.0 as usize;
        if index >= self.variables.len() {
            self.variables.resize(index + 1, 0.0);
        }
        self.variables[index] = value;
    }

    fn fork(&self) -> Box<dyn ExpressionVm> {
        Box::new(self.clone())
    }
}

/// Truthiness threshold shared by predicates and logical operators.
#[inline]
#[must_use]
pub fn truthy(v: f32) -> bool {
    v > 0.5
}

/// Replaces a non-finite program result with `0.0`.
///
/// `reported` latches after the first fault so a broken expression logs once
/// per node instead of every frame.
#[inline]
pub(crate) fn finite_or_zero(value: f32, reported: &mut bool, context: &str) -> f32 {
    if value.is_finite() {
        return value;
    }
    if !*reported {
        *reported = true;
        log::error!("{context}: expression produced {value}, using 0");
    }
    0.0
}

#[inline]
fn bool_value(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

#[inline]
fn unary(stack: &mut SmallVec<[f32; 16]>, f: impl Fn(f32) -> f32) {
    let a = stack.pop().unwrap_or(0.0);
    stack.push(f(a));
}

#[inline]
fn binary(stack: &mut SmallVec<[f32; 16]>, f: impl Fn(f32, f32) -> f32) {
    let b = stack.pop().unwrap_or(0.0);
    let a = stack.pop().unwrap_or(0.0);
    stack.push(f(a, b));
}

fn call_builtin(stack: &mut SmallVec<[f32; 16]>, builtin: Builtin) {
    match builtin {
        Builtin::Abs => unary(stack, f32::abs),
        Builtin::Min => binary(stack, f32::min),
        Builtin::Max => binary(stack, f32::max),
        Builtin::Clamp => {
            let hi = stack.pop().unwrap_or(0.0);
            let lo = stack.pop().unwrap_or(0.0);
            let v = stack.pop().unwrap_or(0.0);
            stack.push(v.max(lo).min(hi));
        }
        Builtin::Lerp => {
            let t = stack.pop().unwrap_or(0.0);
            let b = stack.pop().unwrap_or(0.0);
            let a = stack.pop().unwrap_or(0.0);
            stack.push(a + (b - a) * t);
        }
    }
}
