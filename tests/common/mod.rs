//! Tiny interpreter for the Intel subset the code generator emits.
//!
//! Lets the integration tests check what a program returns without an
//! assembler or linker on the test machine.

use std::collections::HashMap;

#[derive(Default)]
struct Machine {
  regs: HashMap<&'static str, i64>,
  stack: Vec<i64>,
  /// Operands of the last `cmp`, left then right.
  flags: Option<(i64, i64)>,
  al: Option<bool>,
}

fn reg_name(name: &str) -> &'static str {
  match name {
    "rax" => "rax",
    "rdi" => "rdi",
    "rdx" => "rdx",
    other => panic!("unexpected register {other}"),
  }
}

impl Machine {
  fn get(&self, reg: &str) -> i64 {
    self.regs.get(reg_name(reg)).copied().unwrap_or(0)
  }

  fn set(&mut self, reg: &str, value: i64) {
    self.regs.insert(reg_name(reg), value);
  }

  fn operand(&self, text: &str) -> i64 {
    text.parse().unwrap_or_else(|_| self.get(text))
  }

  fn compare(&self, pred: fn(i64, i64) -> bool) -> bool {
    let (l, r) = self.flags.expect("setcc before cmp");
    pred(l, r)
  }
}

/// Run the assembly in `asm` and return `rax` at `ret`.
///
/// Panics on anything the generator should never produce, and when the stack
/// is not empty on return.
pub fn execute(asm: &str) -> i64 {
  let mut lines = asm.lines();
  assert_eq!(lines.next(), Some(".intel_syntax noprefix"));
  assert_eq!(lines.next(), Some(".global main"));
  assert_eq!(lines.next(), Some("main:"));

  let mut m = Machine::default();
  for line in lines {
    let line = line.trim();
    let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
    let args: Vec<&str> = rest.split(',').map(str::trim).filter(|a| !a.is_empty()).collect();

    match (mnemonic, args.as_slice()) {
      ("push", [src]) => {
        let value = m.operand(src);
        m.stack.push(value);
      }
      ("pop", [dst]) => {
        let value = m.stack.pop().expect("pop from empty stack");
        m.set(dst, value);
      }
      ("mov", [dst, src]) => {
        let value = m.operand(src);
        m.set(dst, value);
      }
      ("add", [dst, src]) => {
        let value = m.get(dst).wrapping_add(m.operand(src));
        m.set(dst, value);
      }
      ("sub", [dst, src]) => {
        let value = m.get(dst).wrapping_sub(m.operand(src));
        m.set(dst, value);
      }
      ("imul", [dst, src]) => {
        let value = m.get(dst).wrapping_mul(m.operand(src));
        m.set(dst, value);
      }
      ("cqo", []) => {
        let sign = if m.get("rax") < 0 { -1 } else { 0 };
        m.set("rdx", sign);
      }
      ("idiv", [src]) => {
        let divisor = m.operand(src);
        assert_ne!(divisor, 0, "division by zero");
        let dividend = m.get("rax");
        m.set("rax", dividend.wrapping_div(divisor));
        m.set("rdx", dividend.wrapping_rem(divisor));
      }
      ("cmp", [l, r]) => m.flags = Some((m.operand(l), m.operand(r))),
      ("sete", ["al"]) => m.al = Some(m.compare(|l, r| l == r)),
      ("setne", ["al"]) => m.al = Some(m.compare(|l, r| l != r)),
      ("setl", ["al"]) => m.al = Some(m.compare(|l, r| l < r)),
      ("setle", ["al"]) => m.al = Some(m.compare(|l, r| l <= r)),
      ("movzb", ["rax", "al"]) => {
        let bit = m.al.take().expect("movzb before setcc");
        m.set("rax", i64::from(bit));
      }
      ("ret", []) => {
        assert!(m.stack.is_empty(), "stack not balanced: {:?}", m.stack);
        return m.get("rax");
      }
      _ => panic!("unsupported instruction: {line}"),
    }
  }

  panic!("program fell off the end without ret")
}
