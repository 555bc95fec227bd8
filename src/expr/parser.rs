use super::ast::{ArithOp, BoolExpr, CmpOp, NumExpr};
use super::lexer::{Token, TokenKind};
use super::{MAX_NESTING, ParseError};

/// Parse a token stream into a boolean predicate tree.
///
/// Recursive descent over the precedence ladder
/// `|| < && < comparison < + - < * / < unary < primary`. Types are checked
/// while the tree is built, so a tree that comes out of here always
/// evaluates to a boolean.
pub(crate) fn parse(tokens: &[Token]) -> Result<BoolExpr, ParseError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let (root, offset) = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            found: token.kind.describe(),
            offset: token.offset,
        });
    }
    root.into_bool(offset).map_err(|_| ParseError::NotBoolean)
}

/// Intermediate node whose type is only known once it has been parsed.
enum Parsed {
    Num(NumExpr),
    Bool(BoolExpr),
}

impl Parsed {
    fn into_num(self, offset: usize) -> Result<NumExpr, ParseError> {
        match self {
            Parsed::Num(expr) => Ok(expr),
            Parsed::Bool(_) => Err(ParseError::TypeMismatch {
                expected: "number",
                offset,
            }),
        }
    }

    fn into_bool(self, offset: usize) -> Result<BoolExpr, ParseError> {
        match self {
            Parsed::Bool(expr) => Ok(expr),
            Parsed::Num(_) => Err(ParseError::TypeMismatch {
                expected: "condition",
                offset,
            }),
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn start_offset(&self) -> usize {
        self.peek()
            .map(|t| t.offset)
            .or_else(|| self.tokens.last().map(|t| t.offset))
            .unwrap_or(0)
    }

    fn descend(&mut self, offset: usize) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::TooDeep {
                max: MAX_NESTING,
                offset,
            });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn parse_or(&mut self) -> Result<(Parsed, usize), ParseError> {
        let (mut left, start) = self.parse_and()?;
        while let Some(token) = self.peek() {
            if token.kind != TokenKind::OrOr {
                break;
            }
            self.advance();
            let (right, right_offset) = self.parse_and()?;
            let lhs = left.into_bool(start)?;
            let rhs = right.into_bool(right_offset)?;
            left = Parsed::Bool(BoolExpr::Or(Box::new(lhs), Box::new(rhs)));
        }
        Ok((left, start))
    }

    fn parse_and(&mut self) -> Result<(Parsed, usize), ParseError> {
        let (mut left, start) = self.parse_comparison()?;
        while let Some(token) = self.peek() {
            if token.kind != TokenKind::AndAnd {
                break;
            }
            self.advance();
            let (right, right_offset) = self.parse_comparison()?;
            let lhs = left.into_bool(start)?;
            let rhs = right.into_bool(right_offset)?;
            left = Parsed::Bool(BoolExpr::And(Box::new(lhs), Box::new(rhs)));
        }
        Ok((left, start))
    }

    fn parse_comparison(&mut self) -> Result<(Parsed, usize), ParseError> {
        let (mut left, start) = self.parse_additive()?;
        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Ge => CmpOp::Ge,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::Ne => CmpOp::Ne,
                _ => break,
            };
            self.advance();
            let (right, right_offset) = self.parse_additive()?;
            let lhs = left.into_num(start)?;
            let rhs = right.into_num(right_offset)?;
            left = Parsed::Bool(BoolExpr::Compare(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok((left, start))
    }

    fn parse_additive(&mut self) -> Result<(Parsed, usize), ParseError> {
        let (mut left, start) = self.parse_term()?;
        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let (right, right_offset) = self.parse_term()?;
            let lhs = left.into_num(start)?;
            let rhs = right.into_num(right_offset)?;
            left = Parsed::Num(NumExpr::Binary(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok((left, start))
    }

    fn parse_term(&mut self) -> Result<(Parsed, usize), ParseError> {
        let (mut left, start) = self.parse_unary()?;
        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Star => ArithOp::Mul,
                TokenKind::Slash => ArithOp::Div,
                _ => break,
            };
            self.advance();
            let (right, right_offset) = self.parse_unary()?;
            let lhs = left.into_num(start)?;
            let rhs = right.into_num(right_offset)?;
            left = Parsed::Num(NumExpr::Binary(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok((left, start))
    }

    fn parse_unary(&mut self) -> Result<(Parsed, usize), ParseError> {
        let start = self.start_offset();
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::Minus) => {
                self.advance();
                self.descend(start)?;
                let (operand, offset) = self.parse_unary()?;
                self.ascend();
                let operand = operand.into_num(offset)?;
                let negated = match operand {
                    NumExpr::Literal(v) => NumExpr::Literal(-v),
                    other => NumExpr::Neg(Box::new(other)),
                };
                Ok((Parsed::Num(negated), start))
            }
            Some(TokenKind::Plus) => {
                self.advance();
                self.descend(start)?;
                let (operand, offset) = self.parse_unary()?;
                self.ascend();
                Ok((Parsed::Num(operand.into_num(offset)?), start))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<(Parsed, usize), ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::UnexpectedEnd);
        };
        let offset = token.offset;
        match token.kind {
            TokenKind::Number(v) => Ok((Parsed::Num(NumExpr::Literal(v)), offset)),
            TokenKind::X => Ok((Parsed::Num(NumExpr::X), offset)),
            TokenKind::Y => Ok((Parsed::Num(NumExpr::Y), offset)),
            TokenKind::LParen => {
                self.descend(offset)?;
                let (inner, _) = self.parse_or()?;
                self.ascend();
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok((inner, offset)),
                    Some(other) => Err(ParseError::UnexpectedToken {
                        found: other.kind.describe(),
                        offset: other.offset,
                    }),
                    None => Err(ParseError::UnclosedParen { offset }),
                }
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.describe(),
                offset,
            }),
        }
    }
}
