//! Splits parameter strings into literal text and expressions, and parses
//! expression bodies into ASTs.

mod grammar;
mod lexer;

pub use grammar::MAX_NESTING;

use crate::ast::{Expression, ExpressionSegment, Segment, Template};
use crate::dialect::Platform;
use crate::error::ParseError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Tokenizes a parameter string in the given dialect.
///
/// Node-graph strings only carry expressions when they start with `=` and
/// contain `{{`; the `=` is dropped from the segments. Everything else in a
/// node-graph string is plain text. In the flow-graph dialect any `{{` opens an
/// expression.
pub fn parse_template(input: &str, platform: Platform) -> Template {
    let body = match platform {
        Platform::NodeGraph => match input.strip_prefix('=') {
            Some(rest) if rest.contains(OPEN) => rest,
            _ => {
                return Template {
                    platform,
                    segments: vec![Segment::Literal(input.to_string())],
                };
            }
        },
        Platform::FlowGraph => input,
    };

    Template {
        platform,
        segments: scan_segments(body),
    }
}

/// Parses one expression body (the text between the delimiters).
pub fn parse_expression(body: &str) -> Result<Expression, ParseError> {
    let tokens = lexer::tokenize(body)?;
    grammar::Parser::new(tokens).parse()
}

/// Whether a string is already written in the node-graph dialect.
pub fn is_node_graph_expression(input: &str) -> bool {
    input
        .strip_prefix('=')
        .is_some_and(|rest| rest.contains(OPEN))
}

fn scan_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        let after_open = &rest[start + OPEN.len()..];
        match find_closing(after_open) {
            Some(end) => {
                let body = &after_open[..end];
                let consumed = start + OPEN.len() + end + CLOSE.len();
                segments.push(Segment::Expression(ExpressionSegment::new(
                    rest[start..consumed].to_string(),
                    body.to_string(),
                    true,
                )));
                rest = &rest[consumed..];
            }
            None => {
                segments.push(Segment::Expression(ExpressionSegment::new(
                    rest[start..].to_string(),
                    after_open.to_string(),
                    false,
                )));
                rest = "";
            }
        }
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    segments
}

/// Finds the byte offset of the `}}` closing an expression body, skipping
/// quoted strings and balanced single braces.
fn find_closing(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut quote: Option<u8> = None;
    let mut braces = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'{' => braces += 1,
            b'}' if braces > 0 => braces -= 1,
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}
