//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` turns the input into punctuator and number tokens.
//! - `parser` builds an expression tree with six precedence tiers.
//! - `codegen` lowers the tree into stack-machine x86-64 assembly.
//! - `error` carries caret diagnostics back to the driver.

pub mod codegen;
pub mod error;
pub mod parser;
pub mod tokenizer;

use std::io::Write;

pub use error::{CompileError, CompileResult};
pub use parser::{AstNode, BinaryOp};

/// Compile `expr` and write the assembly to `out`.
///
/// Nothing is written unless tokenizing and parsing both succeed.
pub fn compile(expr: &str, out: &mut impl Write) -> CompileResult<()> {
  let tokens = tokenizer::tokenize(expr)?;
  let tree = parser::parse(tokens, expr)?;
  codegen::generate(&tree, out)
}

/// Compile a source string into Intel-syntax assembly.
pub fn generate_assembly(expr: &str) -> CompileResult<String> {
  let mut asm = Vec::new();
  compile(expr, &mut asm)?;
  Ok(String::from_utf8_lossy(&asm).into_owned())
}
