use super::Expression;
use crate::dialect::Platform;
use crate::error::ParseError;
use std::cell::OnceCell;

/// The outcome of parsing one expression body. Parsing is total: anything the
/// grammar rejects becomes `Unparsed` rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedExpression {
    Parsed(Expression),
    Unparsed { reason: ParseError },
}

impl ParsedExpression {
    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            ParsedExpression::Parsed(expr) => Some(expr),
            ParsedExpression::Unparsed { .. } => None,
        }
    }
}

/// An expression embedded in a parameter string.
///
/// Holds the exact source text (delimiters included) so the string can be
/// reproduced byte-for-byte, and parses its body on first access.
#[derive(Debug, Clone)]
pub struct ExpressionSegment {
    source: String,
    body: String,
    terminated: bool,
    parsed: OnceCell<ParsedExpression>,
}

impl ExpressionSegment {
    pub(crate) fn new(source: String, body: String, terminated: bool) -> Self {
        Self {
            source,
            body,
            terminated,
            parsed: OnceCell::new(),
        }
    }

    /// The original text of the segment, including `{{` and `}}`.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The text between the delimiters.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn ast(&self) -> &ParsedExpression {
        self.parsed.get_or_init(|| {
            if !self.terminated {
                return ParsedExpression::Unparsed {
                    reason: ParseError::UnterminatedExpression,
                };
            }
            match crate::parser::parse_expression(&self.body) {
                Ok(expr) => ParsedExpression::Parsed(expr),
                Err(reason) => ParsedExpression::Unparsed { reason },
            }
        })
    }
}

/// A piece of a tokenized parameter string.
#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    Expression(ExpressionSegment),
}

/// A parameter string split into literal text and embedded expressions.
#[derive(Debug, Clone)]
pub struct Template {
    pub platform: Platform,
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn has_expressions(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Expression(_)))
    }

    pub fn expressions(&self) -> impl Iterator<Item = &ExpressionSegment> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Expression(e) => Some(e),
            Segment::Literal(_) => None,
        })
    }

    /// Returns the only segment when the string is exactly one expression
    /// with no surrounding literal text.
    pub fn sole_expression(&self) -> Option<&ExpressionSegment> {
        let mut meaningful = self.segments.iter().filter(|s| match s {
            Segment::Literal(text) => !text.is_empty(),
            Segment::Expression(_) => true,
        });
        match (meaningful.next(), meaningful.next()) {
            (Some(Segment::Expression(e)), None) => Some(e),
            _ => None,
        }
    }
}

/// A segment after translation, ready to be rendered into a dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSegment {
    Literal(String),
    Expression(Expression),
}
