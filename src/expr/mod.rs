//! Restricted predicate language for zone membership.
//!
//! Predicate text may come from shared configuration files, so the language
//! is closed: decimal literals, the bound variables `x` and `y`, `+ - * /`,
//! comparisons, `&&`, `||` and parentheses. Text is tokenized, parsed into an
//! immutable typed tree once, and then evaluated by walking the tree with the
//! two coordinates bound. Nothing is ever handed to an interpreter.

mod ast;
mod lexer;
mod parser;

use std::fmt;

use blake3::Hash;
use thiserror::Error;

pub use ast::{ArithOp, BoolExpr, CmpOp, NumExpr};

/// Longest predicate source accepted, in bytes.
pub const MAX_PREDICATE_LEN: usize = 4096;
/// Deepest parenthesis/unary nesting accepted.
pub const MAX_NESTING: usize = 64;

/// Rejected predicate text. Offsets are byte positions in the source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("predicate is empty")]
    Empty,
    #[error("predicate is {len} bytes long (limit {max})")]
    TooLong { len: usize, max: usize },
    #[error("nesting deeper than {max} levels at offset {offset}")]
    TooDeep { max: usize, offset: usize },
    #[error("unexpected character `{ch}` at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("invalid number `{text}` at offset {offset}")]
    InvalidNumber { text: String, offset: usize },
    #[error("unknown identifier `{name}` at offset {offset}; only `x` and `y` are allowed")]
    UnknownIdentifier { name: String, offset: usize },
    #[error("function call `{name}(...)` at offset {offset} is not allowed")]
    FunctionCall { name: String, offset: usize },
    #[error("unexpected {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },
    #[error("predicate ends unexpectedly")]
    UnexpectedEnd,
    #[error("parenthesis opened at offset {offset} is never closed")]
    UnclosedParen { offset: usize },
    #[error("expected a {expected} at offset {offset}")]
    TypeMismatch {
        expected: &'static str,
        offset: usize,
    },
    #[error("predicate must be a condition, not a number")]
    NotBoolean,
}

impl ParseError {
    /// Byte offset of the offending input, when the error points at one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::TooDeep { offset, .. }
            | ParseError::UnexpectedChar { offset, .. }
            | ParseError::InvalidNumber { offset, .. }
            | ParseError::UnknownIdentifier { offset, .. }
            | ParseError::FunctionCall { offset, .. }
            | ParseError::UnexpectedToken { offset, .. }
            | ParseError::UnclosedParen { offset }
            | ParseError::TypeMismatch { offset, .. } => Some(*offset),
            ParseError::Empty
            | ParseError::TooLong { .. }
            | ParseError::UnexpectedEnd
            | ParseError::NotBoolean => None,
        }
    }
}

/// Arithmetic fault while evaluating a predicate at one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic produced a non-finite value")]
    NonFinite,
}

/// A validated predicate ready to be evaluated at many points.
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    source: String,
    hash: Hash,
    root: BoolExpr,
}

impl CompiledPredicate {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Content hash of the source text.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn root(&self) -> &BoolExpr {
        &self.root
    }

    pub fn eval(&self, x: f64, y: f64) -> Result<bool, EvalError> {
        self.root.eval(x, y)
    }

    /// Membership test where an arithmetic fault counts as "outside".
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.eval(x, y).unwrap_or(false)
    }

    /// Fault raised by a variable-free sub-expression, e.g. the `1/0` in
    /// `1/0 == 1`. Such a predicate still compiles; every sample that reaches
    /// the sub-expression will fault.
    pub fn constant_fault(&self) -> Option<EvalError> {
        self.root.constant_fault()
    }
}

impl fmt::Display for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile predicate text into a reusable tree.
pub fn compile(text: &str) -> Result<CompiledPredicate, ParseError> {
    if text.len() > MAX_PREDICATE_LEN {
        return Err(ParseError::TooLong {
            len: text.len(),
            max: MAX_PREDICATE_LEN,
        });
    }
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let tokens = lexer::tokenize(text)?;
    let root = parser::parse(&tokens)?;
    Ok(CompiledPredicate {
        source: text.to_string(),
        hash: blake3::hash(text.as_bytes()),
        root,
    })
}

/// Check predicate text without keeping the compiled form.
pub fn validate(text: &str) -> Result<(), ParseError> {
    compile(text).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_editor_examples() {
        let rect = compile("x >= 0 && x <= 50 && y > 20").unwrap();
        assert!(rect.contains(10.0, 30.0));
        assert!(!rect.contains(10.0, 20.0));
        assert!(!rect.contains(-1.0, 30.0));

        let either = compile("(x > -30 && x < 30) || y > 40").unwrap();
        assert!(either.contains(0.0, -60.0));
        assert!(either.contains(60.0, 45.0));
        assert!(!either.contains(60.0, 0.0));

        let circle = compile("x*x + y*y <= 900").unwrap();
        assert!(circle.contains(18.0, 24.0));
        assert!(!circle.contains(25.0, 25.0));
    }

    #[test]
    fn evaluates_signed_and_decimal_literals() {
        let parking = compile("x >= 30 && x <= 45.75 && y >= -40.5 && y <= -24.7").unwrap();
        assert!(parking.contains(30.0, -40.5));
        assert!(parking.contains(45.75, -24.7));
        assert!(!parking.contains(46.0, -30.0));

        let short_range = compile("y >= 1.015*x && y <= -1.015*x").unwrap();
        assert!(short_range.contains(-10.0, 0.0));
        assert!(!short_range.contains(10.0, 0.0));
    }

    #[test]
    fn rejects_everything_outside_the_grammar() {
        let cases = [
            "import_os == 1",
            "exec(x) > 0",
            "x > 0 and y > 0",
            "x ** 2 > 4",
            "sqrt(x) > 2",
            "x.real > 1",
            "\"x\" == 1",
            "[x] > 0",
            "x > 0 # comment",
            "__builtins__ != 0",
        ];
        for text in cases {
            assert!(compile(text).is_err(), "`{text}` must not compile");
        }
    }

    #[test]
    fn identifier_and_call_errors_are_specific() {
        assert!(matches!(
            compile("x > 1 && z < 2"),
            Err(ParseError::UnknownIdentifier { ref name, offset: 9 }) if name == "z"
        ));
        assert!(matches!(
            compile("max(x, y) > 3"),
            Err(ParseError::FunctionCall { ref name, .. }) if name == "max"
        ));
    }

    #[test]
    fn empty_and_oversized_text_is_rejected() {
        assert_eq!(compile("   ").unwrap_err(), ParseError::Empty);
        let long = format!("x > {}", "1".repeat(MAX_PREDICATE_LEN));
        assert!(matches!(compile(&long), Err(ParseError::TooLong { .. })));
    }

    #[test]
    fn constant_division_compiles_but_faults_everywhere() {
        let pred = compile("1/0 == 1").unwrap();
        assert_eq!(pred.constant_fault(), Some(EvalError::DivisionByZero));
        assert_eq!(pred.eval(0.0, 0.0), Err(EvalError::DivisionByZero));
        assert_eq!(pred.eval(12.5, -3.0), Err(EvalError::DivisionByZero));
        assert!(!pred.contains(1.0, 1.0));
    }

    #[test]
    fn same_text_hashes_identically() {
        let a = compile("x > 1").unwrap();
        let b = compile("x > 1").unwrap();
        let c = compile("x > 2").unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn parse_error_offsets_are_exposed() {
        let err = compile("x >= 1 && q").unwrap_err();
        assert_eq!(err.offset(), Some(10));
        assert_eq!(compile("x >").unwrap_err().offset(), None);
    }
}
