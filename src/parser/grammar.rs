use super::lexer::{Token, TokenKind};
use crate::ast::{Accessor, Expression, IndexKey, Literal, Root};
use crate::error::ParseError;

/// Parentheses and call arguments deeper than this are rejected.
pub const MAX_NESTING: usize = 128;

/// Recursive descent parser over the token list of one expression body.
pub(super) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub(super) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parses the whole body; trailing tokens are an error.
    pub(super) fn parse(mut self) -> Result<Expression, ParseError> {
        if self.peek() == &TokenKind::End {
            return Err(ParseError::EmptyExpression);
        }
        let expr = self.parse_concat()?;
        match self.peek() {
            TokenKind::End => Ok(expr),
            _ => Err(self.unexpected("'+' or end of expression")),
        }
    }

    fn parse_concat(&mut self) -> Result<Expression, ParseError> {
        let mut operands = Vec::new();
        push_operand(&mut operands, self.parse_postfix()?);
        while self.peek() == &TokenKind::Plus {
            self.advance();
            push_operand(&mut operands, self.parse_postfix()?);
        }
        if operands.len() == 1 {
            Ok(operands.remove(0))
        } else {
            Ok(Expression::Concatenation(operands))
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut base = self.parse_primary()?;
        let mut path = Vec::new();

        loop {
            match self.peek().clone() {
                TokenKind::Dot => {
                    self.advance();
                    match self.peek().clone() {
                        TokenKind::Identifier(name) => {
                            self.advance();
                            path.push(Accessor::Field(name));
                        }
                        _ => return Err(self.unexpected("a field name after '.'")),
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let key = match self.peek().clone() {
                        TokenKind::Str(key) => IndexKey::Key(key),
                        TokenKind::Number {
                            value,
                            integral: true,
                        } => IndexKey::Position(value as i64),
                        _ => return Err(self.unexpected("an integer or string index")),
                    };
                    self.advance();
                    self.expect(TokenKind::RBracket, "']'")?;
                    path.push(Accessor::Index(key));
                }
                TokenKind::LParen => {
                    let offset = self.current_offset();
                    let name = callee_name(&base, &path)
                        .ok_or(ParseError::UnsupportedCallTarget { offset })?;
                    self.advance();
                    let args = self.parse_arguments()?;
                    base = Expression::FunctionCall { name, args };
                    path.clear();
                }
                _ => break,
            }
        }

        Ok(Expression::access(base, path))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.enter()?;
        let mut args = Vec::new();
        if self.peek() == &TokenKind::RParen {
            self.advance();
            self.leave();
            return Ok(args);
        }
        loop {
            args.push(self.parse_concat()?);
            match self.peek() {
                TokenKind::Comma | TokenKind::Semicolon => self.advance(),
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
        self.leave();
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match self.peek().clone() {
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expression::Literal(Literal::String(s)))
            }
            TokenKind::Number { value, integral } => {
                self.advance();
                let followed_by_field = self.peek() == &TokenKind::Dot
                    && matches!(self.peek_at(1), TokenKind::Identifier(_));
                if integral && value >= 0.0 && followed_by_field {
                    Ok(Expression::positional(value as u64))
                } else {
                    Ok(Expression::Literal(Literal::Number(value)))
                }
            }
            TokenKind::Minus => {
                self.advance();
                match self.peek().clone() {
                    TokenKind::Number { value, .. } => {
                        self.advance();
                        Ok(Expression::Literal(Literal::Number(-value)))
                    }
                    _ => Err(self.unexpected("a number after '-'")),
                }
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(match name.as_str() {
                    "true" => Expression::Literal(Literal::Bool(true)),
                    "false" => Expression::Literal(Literal::Bool(false)),
                    "null" => Expression::Literal(Literal::Null),
                    _ => Expression::VariableRoot(Root::Named(name)),
                })
            }
            TokenKind::LParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_concat()?;
                self.expect(TokenKind::RParen, "')'")?;
                self.leave();
                Ok(inner)
            }
            TokenKind::End => Err(ParseError::UnexpectedEnd {
                expected: "a value".to_string(),
            }),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::NestingTooDeep { limit: MAX_NESTING });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + ahead)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::End)
    }

    fn current_offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(0, |t| t.offset)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.peek() == &kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            TokenKind::End => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
            },
            found => ParseError::UnexpectedToken {
                found: found.to_string(),
                offset: self.current_offset(),
                expected: expected.to_string(),
            },
        }
    }
}

/// Nested concatenations are flattened: joining strings is associative.
fn push_operand(operands: &mut Vec<Expression>, operand: Expression) {
    match operand {
        Expression::Concatenation(parts) => operands.extend(parts),
        other => operands.push(other),
    }
}

/// A call target must be a named root followed only by field accesses;
/// the dotted text is the function name (`$str.upper`, `formatDate`).
fn callee_name(base: &Expression, path: &[Accessor]) -> Option<String> {
    let Expression::VariableRoot(Root::Named(root)) = base else {
        return None;
    };
    let mut name = root.clone();
    for accessor in path {
        match accessor {
            Accessor::Field(field) => {
                name.push('.');
                name.push_str(field);
            }
            Accessor::Index(_) => return None,
        }
    }
    Some(name)
}
