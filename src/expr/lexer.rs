use super::ParseError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    X,
    Y,
    Plus,
    Minus,
    Star,
    Slash,
    Ge,
    Le,
    Gt,
    Lt,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    LParen,
    RParen,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Number(v) => format!("number {v}"),
            TokenKind::X => "`x`".to_string(),
            TokenKind::Y => "`y`".to_string(),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Minus => "`-`".to_string(),
            TokenKind::Star => "`*`".to_string(),
            TokenKind::Slash => "`/`".to_string(),
            TokenKind::Ge => "`>=`".to_string(),
            TokenKind::Le => "`<=`".to_string(),
            TokenKind::Gt => "`>`".to_string(),
            TokenKind::Lt => "`<`".to_string(),
            TokenKind::EqEq => "`==`".to_string(),
            TokenKind::Ne => "`!=`".to_string(),
            TokenKind::AndAnd => "`&&`".to_string(),
            TokenKind::OrOr => "`||`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token start in the predicate text.
    pub offset: usize,
}

/// Split predicate text into tokens. Anything outside the closed grammar is
/// rejected here, before a parser ever sees it.
pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        let single = |kind| Token { kind, offset };
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(single(TokenKind::Plus));
            }
            '-' => {
                chars.next();
                tokens.push(single(TokenKind::Minus));
            }
            '*' => {
                chars.next();
                tokens.push(single(TokenKind::Star));
            }
            '/' => {
                chars.next();
                tokens.push(single(TokenKind::Slash));
            }
            '(' => {
                chars.next();
                tokens.push(single(TokenKind::LParen));
            }
            ')' => {
                chars.next();
                tokens.push(single(TokenKind::RParen));
            }
            '>' | '<' | '=' | '!' => {
                chars.next();
                let followed_by_eq = matches!(chars.peek(), Some(&(_, '=')));
                let kind = match (ch, followed_by_eq) {
                    ('>', true) => TokenKind::Ge,
                    ('<', true) => TokenKind::Le,
                    ('=', true) => TokenKind::EqEq,
                    ('!', true) => TokenKind::Ne,
                    ('>', false) => TokenKind::Gt,
                    ('<', false) => TokenKind::Lt,
                    _ => return Err(ParseError::UnexpectedChar { ch, offset }),
                };
                if followed_by_eq {
                    chars.next();
                }
                tokens.push(single(kind));
            }
            '&' | '|' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, next)) if next == ch => {
                        chars.next();
                        let kind = if ch == '&' {
                            TokenKind::AndAnd
                        } else {
                            TokenKind::OrOr
                        };
                        tokens.push(single(kind));
                    }
                    _ => return Err(ParseError::UnexpectedChar { ch, offset }),
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = offset;
                while let Some(&(idx, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = idx + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &text[offset..end];
                let value: f64 = literal.parse().map_err(|_| ParseError::InvalidNumber {
                    text: literal.to_string(),
                    offset,
                })?;
                if !value.is_finite() {
                    return Err(ParseError::InvalidNumber {
                        text: literal.to_string(),
                        offset,
                    });
                }
                if next_non_space(bytes, end) == Some(b'(') {
                    return Err(ParseError::FunctionCall {
                        name: literal.to_string(),
                        offset,
                    });
                }
                tokens.push(single(TokenKind::Number(value)));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = offset;
                while let Some(&(idx, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        end = idx + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &text[offset..end];
                if next_non_space(bytes, end) == Some(b'(') {
                    return Err(ParseError::FunctionCall {
                        name: name.to_string(),
                        offset,
                    });
                }
                let kind = match name {
                    "x" => TokenKind::X,
                    "y" => TokenKind::Y,
                    _ => {
                        return Err(ParseError::UnknownIdentifier {
                            name: name.to_string(),
                            offset,
                        });
                    }
                };
                tokens.push(single(kind));
            }
            _ => return Err(ParseError::UnexpectedChar { ch, offset }),
        }
    }

    Ok(tokens)
}

fn next_non_space(bytes: &[u8], from: usize) -> Option<u8> {
    bytes[from..]
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
}
