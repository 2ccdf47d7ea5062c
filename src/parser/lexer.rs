use crate::error::ParseError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    Identifier(String),
    Number { value: f64, integral: bool },
    Str(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Plus,
    Minus,
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "{}", name),
            TokenKind::Number { value, .. } => write!(f, "{}", value),
            TokenKind::Str(s) => write!(f, "{:?}", s),
            TokenKind::Dot => write!(f, "."),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::End => write!(f, "end of expression"),
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Splits an expression body into tokens. The token list always ends with
/// `TokenKind::End`.
pub(super) fn tokenize(body: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<(usize, char)> = body.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = match c {
            '.' => TokenKind::Dot,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '"' | '\'' | '`' => {
                let (text, next) = read_string(&chars, i, c)?;
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    offset,
                });
                i = next;
                continue;
            }
            c if c.is_ascii_digit() => {
                let (kind, next) = read_number(&chars, i);
                tokens.push(Token { kind, offset });
                i = next;
                continue;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].1.is_alphanumeric() || chars[i].1 == '_' || chars[i].1 == '$')
                {
                    i += 1;
                }
                let name: String = chars[start..i].iter().map(|(_, c)| *c).collect();
                tokens.push(Token {
                    kind: TokenKind::Identifier(name),
                    offset,
                });
                continue;
            }
            other => {
                return Err(ParseError::UnexpectedCharacter {
                    character: other,
                    offset,
                });
            }
        };
        tokens.push(Token { kind, offset });
        i += 1;
    }

    tokens.push(Token {
        kind: TokenKind::End,
        offset: body.len(),
    });
    Ok(tokens)
}

fn read_string(
    chars: &[(usize, char)],
    start: usize,
    quote: char,
) -> Result<(String, usize), ParseError> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == '\\' {
            let Some(&(_, escaped)) = chars.get(i + 1) else {
                break;
            };
            text.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
            i += 2;
            continue;
        }
        if c == quote {
            return Ok((text, i + 1));
        }
        text.push(c);
        i += 1;
    }
    Err(ParseError::UnterminatedString {
        offset: chars[start].0,
    })
}

fn read_number(chars: &[(usize, char)], start: usize) -> (TokenKind, usize) {
    let digit_at = |i: usize| chars.get(i).is_some_and(|(_, c)| c.is_ascii_digit());
    let mut i = start;
    let mut integral = true;

    while digit_at(i) {
        i += 1;
    }
    // A '.' only continues the number when a digit follows; `1.text` is a
    // positional root followed by a field access.
    if chars.get(i).is_some_and(|(_, c)| *c == '.') && digit_at(i + 1) {
        integral = false;
        i += 1;
        while digit_at(i) {
            i += 1;
        }
    }
    if chars.get(i).is_some_and(|(_, c)| *c == 'e' || *c == 'E') {
        let sign = chars.get(i + 1).is_some_and(|(_, c)| *c == '+' || *c == '-');
        let exponent_start = if sign { i + 2 } else { i + 1 };
        if digit_at(exponent_start) {
            integral = false;
            i = exponent_start;
            while digit_at(i) {
                i += 1;
            }
        }
    }

    let text: String = chars[start..i].iter().map(|(_, c)| *c).collect();
    let value = text.parse::<f64>().unwrap_or(f64::NAN);
    (TokenKind::Number { value, integral }, i)
}
