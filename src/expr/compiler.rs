use crate::expr::lexer::{Token, TokenKind, lex};
use crate::expr::{ExprError, VariableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Min,
    Max,
    Clamp,
    Abs,
    Lerp,
}

impl Builtin {
    fn lookup(name: &str) -> Option<(Self, usize)> {
        Some(match name {
            "min" => (Self::Min, 2),
            "max" => (Self::Max, 2),
            "clamp" => (Self::Clamp, 3),
            "abs" => (Self::Abs, 1),
            "lerp" => (Self::Lerp, 3),
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Op {
    Push(f32),
    Load(VariableId),

    Neg,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,

    Call(Builtin),
    Ret,
}

/// Compiles `src` to stack bytecode, appending it to `code`.
///
/// Nothing is appended when compilation fails.
pub(crate) fn compile_into(
    code: &mut Vec<Op>,
    src: &str,
    resolve: &dyn Fn(&str) -> Option<VariableId>,
) -> Result<(), ExprError> {
    let tokens = lex(src)?;
    let mut c = Compiler {
        tokens,
        pos: 0,
        out: Vec::new(),
        resolve,
    };
    c.parse_or()?;
    c.expect(&TokenKind::Eof)?;
    c.out.push(Op::Ret);
    code.extend(c.out);
    Ok(())
}

struct Compiler<'r> {
    tokens: Vec<Token>,
    pos: usize,
    out: Vec<Op>,
    resolve: &'r dyn Fn(&str) -> Option<VariableId>,
}

impl Compiler<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if t.kind != TokenKind::Eof {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ExprError> {
        if self.consume(kind) {
            Ok(())
        } else {
            let t = self.peek();
            Err(ExprError::new(
                t.offset,
                format!("expected {kind:?}, found {:?}", t.kind),
            ))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Parses one level of left-associative binary operators.
    fn binary_level(
        &mut self,
        ops: &[(TokenKind, Op)],
        next: fn(&mut Self) -> Result<(), ExprError>,
    ) -> Result<(), ExprError> {
        next(self)?;
        'outer: loop {
            for (kind, op) in ops {
                if self.consume(kind) {
                    next(self)?;
                    self.out.push(*op);
                    continue 'outer;
                }
            }
            return Ok(());
        }
    }

    fn parse_or(&mut self) -> Result<(), ExprError> {
        self.binary_level(&[(TokenKind::OrOr, Op::Or)], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<(), ExprError> {
        self.binary_level(&[(TokenKind::AndAnd, Op::And)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<(), ExprError> {
        self.binary_level(
            &[(TokenKind::EqEq, Op::Eq), (TokenKind::Ne, Op::Ne)],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<(), ExprError> {
        self.binary_level(
            &[
                (TokenKind::Lt, Op::Lt),
                (TokenKind::Le, Op::Le),
                (TokenKind::Gt, Op::Gt),
                (TokenKind::Ge, Op::Ge),
            ],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<(), ExprError> {
        self.binary_level(
            &[(TokenKind::Plus, Op::Add), (TokenKind::Minus, Op::Sub)],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<(), ExprError> {
        self.binary_level(
            &[
                (TokenKind::Star, Op::Mul),
                (TokenKind::Slash, Op::Div),
                (TokenKind::Percent, Op::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<(), ExprError> {
        if self.consume(&TokenKind::Minus) {
            self.parse_unary()?;
            self.out.push(Op::Neg);
            return Ok(());
        }
        if self.consume(&TokenKind::Bang) {
            self.parse_unary()?;
            self.out.push(Op::Not);
            return Ok(());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<(), ExprError> {
        let t = self.bump();
        match t.kind {
            TokenKind::Number(v) => self.out.push(Op::Push(v)),
            TokenKind::True => self.out.push(Op::Push(1.0)),
            TokenKind::False => self.out.push(Op::Push(0.0)),
            TokenKind::Ident(name) => {
                if self.consume(&TokenKind::LParen) {
                    return self.parse_call(&name, t.offset);
                }
                let id = (self.resolve)(&name).ok_or_else(|| {
                    ExprError::new(t.offset, format!("unknown variable '{name}'"))
                })?;
                self.out.push(Op::Load(id));
            }
            TokenKind::LParen => {
                self.parse_or()?;
                self.expect(&TokenKind::RParen)?;
            }
            other => {
                return Err(ExprError::new(
                    t.offset,
                    format!("unexpected token {other:?}"),
                ));
            }
        }
        Ok(())
    }

    fn parse_call(&mut self, name: &str, offset: usize) -> Result<(), ExprError> {
        let (builtin, arity) = Builtin::lookup(name)
            .ok_or_else(|| ExprError::new(offset, format!("unknown function '{name}'")))?;

        let mut argc = 0usize;
        if !self.consume(&TokenKind::RParen) {
            loop {
                self.parse_or()?;
                argc += 1;
                if self.consume(&TokenKind::Comma) {
                    continue;
                }
                self.expect(&TokenKind::RParen)?;
                break;
            }
        }

        if argc != arity {
            return Err(ExprError::new(
                offset,
                format!("'{name}' expects {arity} arguments, got {argc}"),
            ));
        }
        self.out.push(Op::Call(builtin));
        Ok(())
    }
}
