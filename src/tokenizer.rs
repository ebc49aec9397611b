//! Lexer for the expression language.
//!
//! A token is a span `(loc, len)` into the caller's input plus, for numbers,
//! the decoded value. The input is never copied: `Token::text` slices the
//! original buffer whenever the parser or a diagnostic needs the spelling.
//! Two-byte punctuators are tried first so `<=` does not lex as `<` `=`.

use crate::error::{CompileError, CompileResult};

/// Punctuators two bytes wide. Checked before `SINGLE_PUNCTUATORS`.
const DOUBLE_PUNCTUATORS: [&str; 4] = ["==", "!=", "<=", ">="];

const SINGLE_PUNCTUATORS: &[u8] = b"+-*/()<>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Punctuator,
  Num,
  Eof,
}

/// Byte span into the input. `value` is set only for `Num`; `Eof` is an
/// empty span at the end of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }

  /// The spelling of this token in `source`.
  pub fn text<'a>(&self, source: &'a str) -> &'a str {
    &source[self.loc..self.loc + self.len]
  }

  /// Spelling for diagnostics; the end marker reads `EOF`.
  pub fn describe(&self, source: &str) -> String {
    match self.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => self.text(source).to_string(),
    }
  }
}

/// Decode raw input bytes, pointing at the first byte that is not UTF-8.
pub fn decode(bytes: &[u8]) -> CompileResult<&str> {
  std::str::from_utf8(bytes).map_err(|err| {
    CompileError::lex(
      &String::from_utf8_lossy(bytes),
      err.valid_up_to(),
      "invalid UTF-8 in input",
    )
  })
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let text = &input[start..i];
      let value = text
        .parse::<i64>()
        .map_err(|err| CompileError::lex(input, start, format!("invalid number: {err}")))?;
      tokens.push(Token::new(TokenKind::Num, start, i - start, Some(value)));
      continue;
    }

    if let Some(op) = DOUBLE_PUNCTUATORS
      .into_iter()
      .find(|op| input[i..].starts_with(op))
    {
      tokens.push(Token::new(TokenKind::Punctuator, i, op.len(), None));
      i += op.len();
      continue;
    }

    if SINGLE_PUNCTUATORS.contains(&c) {
      tokens.push(Token::new(TokenKind::Punctuator, i, 1, None));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    let message = if invalid_char.is_ascii_alphabetic() {
      "expect a number".to_string()
    } else {
      format!("invalid token: '{invalid_char}'")
    };
    return Err(CompileError::lex(input, i, message));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  log::debug!("tokenized {} bytes into {} tokens", input.len(), tokens.len());
  Ok(tokens)
}
