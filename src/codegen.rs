//! Code generation: lower the expression tree into Intel-syntax x86-64.
//!
//! The emitter is a plain stack machine. Every subtree leaves exactly one
//! value pushed on the hardware stack; a binary node pops its right operand
//! into `rdi`, its left operand into `rax`, and pushes the result back. The
//! final value is popped into `rax` before `ret`.

use std::io::Write;

use snafu::ResultExt;

use crate::error::{CompileResult, EmitSnafu};
use crate::parser::{AstNode, BinaryOp};

/// Symbol exported as the entry point.
pub const ENTRY_LABEL: &str = "main";

/// Register holding the result when the routine returns.
pub const RETURN_REGISTER: &str = "rax";

/// Emit a complete program for `node` into `out`.
pub fn generate(node: &AstNode, out: &mut impl Write) -> CompileResult<()> {
  let mut emitter = Emitter::new(out);
  emitter.prologue()?;
  emitter.emit_expr(node)?;
  emitter.pop(RETURN_REGISTER)?;
  emitter.line("ret")?;
  debug_assert_eq!(emitter.depth, 0, "stack must be balanced after return");
  log::debug!("emitted {} instructions", emitter.instructions);
  Ok(())
}

struct Emitter<'w, W: Write> {
  out: &'w mut W,
  /// Values currently on the evaluation stack.
  depth: usize,
  instructions: usize,
}

impl<'w, W: Write> Emitter<'w, W> {
  fn new(out: &'w mut W) -> Self {
    Self {
      out,
      depth: 0,
      instructions: 0,
    }
  }

  fn prologue(&mut self) -> CompileResult<()> {
    writeln!(self.out, ".intel_syntax noprefix").context(EmitSnafu)?;
    writeln!(self.out, ".global {ENTRY_LABEL}").context(EmitSnafu)?;
    writeln!(self.out, "{ENTRY_LABEL}:").context(EmitSnafu)
  }

  fn line(&mut self, insn: &str) -> CompileResult<()> {
    self.instructions += 1;
    writeln!(self.out, "  {insn}").context(EmitSnafu)
  }

  fn push(&mut self, operand: &str) -> CompileResult<()> {
    self.depth += 1;
    self.line(&format!("push {operand}"))
  }

  fn pop(&mut self, reg: &str) -> CompileResult<()> {
    debug_assert!(self.depth > 0, "pop from an empty evaluation stack");
    self.depth -= 1;
    self.line(&format!("pop {reg}"))
  }

  /// Post-order walk: both operands first, then the operator.
  fn emit_expr(&mut self, node: &AstNode) -> CompileResult<()> {
    match node {
      // `push imm` only sign-extends a 32-bit immediate.
      AstNode::Num { value } if i32::try_from(*value).is_ok() => self.push(&value.to_string()),
      AstNode::Num { value } => {
        self.line(&format!("mov rax, {value}"))?;
        self.push("rax")
      }
      AstNode::Binary { op, lhs, rhs } => {
        self.emit_expr(lhs)?;
        self.emit_expr(rhs)?;
        self.pop("rdi")?;
        self.pop("rax")?;
        self.emit_op(*op)?;
        self.push("rax")
      }
    }
  }

  /// Combine `rax` (left) and `rdi` (right) into `rax`.
  fn emit_op(&mut self, op: BinaryOp) -> CompileResult<()> {
    match op {
      BinaryOp::Add => self.line("add rax, rdi"),
      BinaryOp::Sub => self.line("sub rax, rdi"),
      BinaryOp::Mul => self.line("imul rax, rdi"),
      BinaryOp::Div => {
        self.line("cqo")?;
        self.line("idiv rdi")
      }
      BinaryOp::Eq => self.compare("sete"),
      BinaryOp::Ne => self.compare("setne"),
      BinaryOp::Lt => self.compare("setl"),
      BinaryOp::Le => self.compare("setle"),
    }
  }

  fn compare(&mut self, set: &str) -> CompileResult<()> {
    self.line("cmp rax, rdi")?;
    self.line(&format!("{set} al"))?;
    self.line("movzb rax, al")
  }
}
