//! Diagnostics shared by every stage of the pipeline.
//!
//! Errors are plain values; only the driver decides to print them and exit.
//! Located errors render chibicc-style: the input line, then a caret under
//! the offending byte followed by the message.

use snafu::Snafu;
use std::io;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  /// A character (or literal) the tokenizer cannot turn into a token.
  #[snafu(display("{}", render(input, *loc, message)))]
  Lex {
    input: String,
    loc: usize,
    message: String,
  },

  /// The token stream does not match the expression grammar.
  #[snafu(display("{}", render(input, *loc, message)))]
  Syntax {
    input: String,
    loc: usize,
    message: String,
  },

  #[snafu(display("failed to write assembly: {source}"))]
  Emit { source: io::Error },
}

impl CompileError {
  /// Lexical error anchored at byte offset `loc` of `input`.
  pub fn lex(input: &str, loc: usize, message: impl Into<String>) -> Self {
    LexSnafu {
      input,
      loc: loc.min(input.len()),
      message,
    }
    .build()
  }

  /// Syntax error anchored at byte offset `loc` of `input`.
  pub fn syntax(input: &str, loc: usize, message: impl Into<String>) -> Self {
    SyntaxSnafu {
      input,
      loc: loc.min(input.len()),
      message,
    }
    .build()
  }

  /// Byte offset the diagnostic points at, if it has one.
  pub fn loc(&self) -> Option<usize> {
    match self {
      Self::Lex { loc, .. } | Self::Syntax { loc, .. } => Some(*loc),
      Self::Emit { .. } => None,
    }
  }

  pub fn message(&self) -> String {
    match self {
      Self::Lex { message, .. } | Self::Syntax { message, .. } => message.clone(),
      Self::Emit { source } => source.to_string(),
    }
  }
}

fn render(input: &str, loc: usize, message: &str) -> String {
  let safe_loc = loc.min(input.len());
  let column = input
    .get(..safe_loc)
    .map_or(safe_loc, |prefix| prefix.chars().count());
  format!("{input}\n{}^ {message}", " ".repeat(column))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caret_sits_under_offset() {
    let err = CompileError::syntax("1+", 2, "expected a number, but got \"EOF\"");
    assert_eq!(
      err.to_string(),
      "1+\n  ^ expected a number, but got \"EOF\""
    );
  }

  #[test]
  fn caret_at_start() {
    let err = CompileError::lex("?", 0, "invalid token: '?'");
    assert_eq!(err.to_string(), "?\n^ invalid token: '?'");
  }

  #[test]
  fn offset_is_clamped_to_input() {
    let err = CompileError::syntax("12", 40, "boom");
    assert_eq!(err.loc(), Some(2));
    assert_eq!(err.to_string(), "12\n  ^ boom");
  }

  #[test]
  fn marker_counts_characters_not_bytes() {
    // 'é' is two bytes but one column.
    let err = CompileError::lex("é+1", 2, "x");
    assert_eq!(err.to_string(), "é+1\n ^ x");
  }

  #[test]
  fn emit_error_has_no_location() {
    let err = CompileError::Emit {
      source: io::Error::other("closed"),
    };
    assert_eq!(err.loc(), None);
    assert_eq!(err.to_string(), "failed to write assembly: closed");
  }
}
