use super::Platform;
use crate::ast::{Expression, Literal, OutputSegment};

/// Serializes an expression in the syntax of the given dialect.
pub fn render_expression(expr: &Expression, platform: Platform) -> String {
    let mut out = String::new();
    write_expression(&mut out, expr, platform);
    out
}

fn write_expression(out: &mut String, expr: &Expression, platform: Platform) {
    match expr {
        Expression::Literal(v) => out.push_str(&v.to_string()),
        Expression::VariableRoot(root) => out.push_str(&root.to_string()),
        Expression::PropertyAccess { base, path } => {
            if matches!(**base, Expression::Concatenation(_)) {
                out.push('(');
                write_expression(out, base, platform);
                out.push(')');
            } else {
                write_expression(out, base, platform);
            }
            for accessor in path {
                out.push_str(&accessor.to_string());
            }
        }
        Expression::FunctionCall { name, args } => {
            out.push_str(name);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(platform.argument_separator());
                }
                write_expression(out, arg, platform);
            }
            out.push(')');
        }
        Expression::Concatenation(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push_str(" + ");
                }
                write_expression(out, part, platform);
            }
        }
    }
}

/// Renders translated segments back into one parameter string.
///
/// Node-graph strings carrying expressions get the leading `=` and
/// `{{ expr }}` bodies. Flow-graph strings use `{{expr}}`, and a top-level
/// concatenation is spread over adjacent segments since that dialect joins
/// text by juxtaposition. String operands holding `{{` or `}}` stay quoted
/// inside a body so the output still scans.
pub fn render_segments(segments: &[OutputSegment], platform: Platform) -> String {
    let has_expressions = segments
        .iter()
        .any(|s| matches!(s, OutputSegment::Expression(_)));
    let mut out = String::new();

    match platform {
        Platform::NodeGraph => {
            if has_expressions {
                out.push('=');
            }
            for segment in segments {
                match segment {
                    OutputSegment::Literal(text) => out.push_str(text),
                    OutputSegment::Expression(expr) => {
                        out.push_str("{{ ");
                        write_expression(&mut out, expr, platform);
                        out.push_str(" }}");
                    }
                }
            }
        }
        Platform::FlowGraph => {
            for segment in segments {
                match segment {
                    OutputSegment::Literal(text) => out.push_str(text),
                    OutputSegment::Expression(Expression::Concatenation(parts)) => {
                        for part in parts {
                            match part {
                                Expression::Literal(Literal::String(text))
                                    if !text.contains("{{") && !text.contains("}}") =>
                                {
                                    out.push_str(text)
                                }
                                other => push_flow_body(&mut out, other),
                            }
                        }
                    }
                    OutputSegment::Expression(expr) => push_flow_body(&mut out, expr),
                }
            }
        }
    }
    out
}

fn push_flow_body(out: &mut String, expr: &Expression) {
    out.push_str("{{");
    write_expression(out, expr, Platform::FlowGraph);
    out.push_str("}}");
}
