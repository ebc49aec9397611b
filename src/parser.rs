//! Recursive-descent parser producing an expression tree.
//!
//! One function per precedence tier, lowest binding first:
//!
//! ```text
//! equality   = relational ("==" relational | "!=" relational)*
//! relational = add ("<" relational | "<=" relational | ">" relational | ">=" relational)*
//! add        = mul ("+" mul | "-" mul)*
//! mul        = unary ("*" unary | "/" unary)*
//! unary      = ("+" | "-")? primary
//! primary    = "(" equality ")" | num
//! ```
//!
//! The relational tier recurses into itself for its right operand, so chains
//! such as `1 < 2 < 3` group to the right. Every other binary tier loops and
//! groups to the left.
//!
//! Recursion is bounded: parentheses and relational chains may nest at most
//! `MAX_NESTING` deep, and one expression may hold at most `MAX_OPERATORS`
//! operators. Both keep the parser, the code generator and the tree's drop
//! well inside the stack.

use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind};

pub const MAX_NESTING: usize = 256;
pub const MAX_OPERATORS: usize = 2048;

/// Binary operators recognised by the language.
///
/// There is no greater-than: `a > b` is parsed as `b < a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      Self::Add => "+",
      Self::Sub => "-",
      Self::Mul => "*",
      Self::Div => "/",
      Self::Eq => "==",
      Self::Ne => "!=",
      Self::Lt => "<",
      Self::Le => "<=",
    }
  }
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
  Num {
    value: i64,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
}

impl AstNode {
  pub fn number(value: i64) -> Self {
    Self::Num { value }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  /// `-x` is lowered to `0 - x`.
  pub fn negate(operand: AstNode) -> Self {
    Self::binary(BinaryOp::Sub, Self::number(0), operand)
  }

  /// Number of nodes in the tree.
  pub fn size(&self) -> usize {
    match self {
      Self::Num { .. } => 1,
      Self::Binary { lhs, rhs, .. } => 1 + lhs.size() + rhs.size(),
    }
  }
}

/// Prefix form, e.g. `(+ 1 (* 2 3))`. Used for logging and tests.
impl fmt::Display for AstNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Num { value } => write!(f, "{value}"),
      Self::Binary { op, lhs, rhs } => write!(f, "({} {lhs} {rhs})", op.symbol()),
    }
  }
}

/// Parse a whole expression. Tokens left over before `Eof` are an error.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<AstNode> {
  let mut stream = TokenStream::new(tokens, source);

  if stream.is_eof() {
    return Err(CompileError::syntax(source, 0, "expression is empty"));
  }

  let node = parse_expr(&mut stream)?;

  if !stream.is_eof() {
    let token = stream.peek().ok_or_else(|| {
      CompileError::syntax(
        source,
        source.len(),
        "unexpected end of input after expression",
      )
    })?;
    let got = token.describe(source);
    return Err(CompileError::syntax(
      source,
      token.loc,
      format!("unexpected token \"{got}\""),
    ));
  }

  log::debug!("parsed {} nodes: {node}", node.size());
  Ok(node)
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_equality(stream)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_relational(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("==") => BinaryOp::Eq,
      Some("!=") => BinaryOp::Ne,
      _ => break,
    };

    stream.count_operator()?;
    stream.expect(op.symbol())?;
    let rhs = parse_relational(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_add(stream)?;

  loop {
    let (op_str, op, swap) = match stream.peek_punctuator() {
      Some(symbol @ "<") => (symbol, BinaryOp::Lt, false),
      Some(symbol @ "<=") => (symbol, BinaryOp::Le, false),
      Some(symbol @ ">") => (symbol, BinaryOp::Lt, true),
      Some(symbol @ ">=") => (symbol, BinaryOp::Le, true),
      _ => break,
    };

    let loc = stream.loc();
    stream.count_operator()?;
    stream.expect(op_str)?;
    stream.enter(loc)?;
    let rhs = parse_relational(stream)?;
    stream.leave();
    node = if swap {
      AstNode::binary(op, rhs, node)
    } else {
      AstNode::binary(op, node, rhs)
    };
  }

  Ok(node)
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_mul(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("+") => BinaryOp::Add,
      Some("-") => BinaryOp::Sub,
      _ => break,
    };

    stream.count_operator()?;
    stream.expect(op.symbol())?;
    let rhs = parse_mul(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_unary(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("*") => BinaryOp::Mul,
      Some("/") => BinaryOp::Div,
      _ => break,
    };

    stream.count_operator()?;
    stream.expect(op.symbol())?;
    let rhs = parse_unary(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.consume("+") {
    return parse_primary(stream);
  }

  if stream.peek_punctuator() == Some("-") {
    stream.count_operator()?;
    stream.expect("-")?;
    let operand = parse_primary(stream)?;
    return Ok(AstNode::negate(operand));
  }

  parse_primary(stream)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let loc = stream.loc();
  if stream.consume("(") {
    stream.enter(loc)?;
    let node = parse_expr(stream)?;
    stream.expect(")")?;
    stream.leave();
    return Ok(node);
  }

  let (value, _) = stream.expect_number()?;
  Ok(AstNode::number(value))
}

/// Cursor over the token vector. Every production borrows it mutably, so a
/// parse owns all of its state and nothing lives in globals.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
  /// Open parentheses plus pending right operands of relational chains.
  depth: usize,
  operators: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
      depth: 0,
      operators: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  /// Spelling of the current token when it is a punctuator.
  fn peek_punctuator(&self) -> Option<&'a str> {
    self
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token.text(self.source))
  }

  /// Consume the current token if it is exactly the punctuator `op`.
  ///
  /// Compares length as well as text so `<` never matches `<=`.
  fn consume(&mut self, op: &str) -> bool {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Punctuator
      && token.len == op.len()
      && token.text(self.source) == op
    {
      self.pos += 1;
      return true;
    }
    false
  }

  fn expect(&mut self, op: &str) -> CompileResult<()> {
    if self.consume(op) {
      return Ok(());
    }

    let (loc, got) = match self.peek() {
      Some(token) => (token.loc, token.describe(self.source)),
      None => (self.source.len(), "EOF".to_string()),
    };
    Err(CompileError::syntax(
      self.source,
      loc,
      format!("expected \"{op}\", but got \"{got}\""),
    ))
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn expect_number(&mut self) -> CompileResult<(i64, usize)> {
    let Some(token) = self.peek() else {
      return Err(CompileError::syntax(
        self.source,
        self.source.len(),
        "expected a number, but reached end of input",
      ));
    };

    if token.kind == TokenKind::Num {
      let value = token.value.ok_or_else(|| {
        CompileError::syntax(
          self.source,
          token.loc,
          "internal error: numeric token missing value",
        )
      })?;
      let loc = token.loc;
      self.pos += 1;
      return Ok((value, loc));
    }

    let got = token.describe(self.source);
    Err(CompileError::syntax(
      self.source,
      token.loc,
      format!("expected a number, but got \"{got}\""),
    ))
  }

  /// Byte offset of the current token, or the end of input.
  fn loc(&self) -> usize {
    self.peek().map_or(self.source.len(), |token| token.loc)
  }

  /// Open one nesting level started by the token at `loc`.
  fn enter(&mut self, loc: usize) -> CompileResult<()> {
    if self.depth >= MAX_NESTING {
      return Err(CompileError::syntax(
        self.source,
        loc,
        "expression nested too deeply",
      ));
    }
    self.depth += 1;
    Ok(())
  }

  fn leave(&mut self) {
    self.depth -= 1;
  }

  /// Account for the operator at the current token.
  fn count_operator(&mut self) -> CompileResult<()> {
    if self.operators >= MAX_OPERATORS {
      return Err(CompileError::syntax(
        self.source,
        self.loc(),
        "expression has too many operators",
      ));
    }
    self.operators += 1;
    Ok(())
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof))
  }
}
