//! Tests for the template scanner and the expression parser.
use honyaku::ast::{Accessor, Expression, IndexKey, Literal, ParsedExpression, Segment};
use honyaku::dialect::render_expression;
use honyaku::error::ParseError;
use honyaku::parser::MAX_NESTING;
use honyaku::prelude::*;

fn field(name: &str) -> Accessor {
    Accessor::Field(name.to_string())
}

fn sole_ast(input: &str, platform: Platform) -> Expression {
    let template = parse_template(input, platform);
    let segment = template
        .sole_expression()
        .unwrap_or_else(|| panic!("'{}' should be a single expression", input));
    match segment.ast() {
        ParsedExpression::Parsed(expr) => expr.clone(),
        ParsedExpression::Unparsed { reason } => panic!("'{}' failed to parse: {}", input, reason),
    }
}

fn parse_failure(input: &str, platform: Platform) -> ParseError {
    let template = parse_template(input, platform);
    let segment = template.expressions().next().expect("an expression segment");
    match segment.ast() {
        ParsedExpression::Unparsed { reason } => reason.clone(),
        ParsedExpression::Parsed(expr) => panic!("'{}' unexpectedly parsed as {}", input, expr),
    }
}

#[cfg(test)]
mod template_tests {
    use super::*;

    #[test]
    fn test_node_graph_string_without_prefix_is_plain_text() {
        let template = parse_template("Hello {{ $json.name }}", Platform::NodeGraph);
        assert!(!template.has_expressions());
        assert_eq!(template.segments.len(), 1);
    }

    #[test]
    fn test_node_graph_prefix_without_braces_is_plain_text() {
        let template = parse_template("=just text", Platform::NodeGraph);
        assert!(!template.has_expressions());
    }

    #[test]
    fn test_flow_graph_mixed_segments() {
        let template = parse_template("Hello {{1.name}}!", Platform::FlowGraph);
        assert_eq!(template.segments.len(), 3);
        assert!(matches!(&template.segments[0], Segment::Literal(t) if t == "Hello "));
        assert!(matches!(&template.segments[2], Segment::Literal(t) if t == "!"));
        assert!(template.sole_expression().is_none());

        let expr = template.expressions().next().unwrap();
        assert_eq!(expr.source(), "{{1.name}}");
        assert_eq!(expr.body(), "1.name");
    }

    #[test]
    fn test_closing_braces_inside_string_literal() {
        let expr = sole_ast("={{ \"}}\" + $json.a }}", Platform::NodeGraph);
        assert_eq!(
            expr,
            Expression::Concatenation(vec![
                Expression::Literal(Literal::String("}}".to_string())),
                Expression::access(Expression::named("$json"), vec![field("a")]),
            ])
        );
    }

    #[test]
    fn test_unterminated_expression_keeps_source() {
        let template = parse_template("={{ $json.id", Platform::NodeGraph);
        let segment = template.expressions().next().unwrap();
        assert_eq!(segment.source(), "{{ $json.id");
        assert_eq!(
            parse_failure("={{ $json.id", Platform::NodeGraph),
            ParseError::UnterminatedExpression
        );
    }

    #[test]
    fn test_multiple_expressions_in_one_string() {
        let template = parse_template("{{1.first}} {{1.last}}", Platform::FlowGraph);
        assert_eq!(template.expressions().count(), 2);
    }
}

#[cfg(test)]
mod expression_tests {
    use super::*;

    #[test]
    fn test_json_field_access() {
        let expr = sole_ast("={{ $json.id }}", Platform::NodeGraph);
        assert_eq!(
            expr,
            Expression::access(Expression::named("$json"), vec![field("id")])
        );
    }

    #[test]
    fn test_positional_root() {
        let expr = sole_ast("{{1.items[0]}}", Platform::FlowGraph);
        assert_eq!(
            expr,
            Expression::access(
                Expression::positional(1),
                vec![field("items"), Accessor::Index(IndexKey::Position(0))]
            )
        );
    }

    #[test]
    fn test_decimal_number_is_a_literal() {
        let expr = sole_ast("{{1.5}}", Platform::FlowGraph);
        assert_eq!(expr, Expression::Literal(Literal::Number(1.5)));
    }

    #[test]
    fn test_node_reference_by_name() {
        let expr = sole_ast("={{ $node[\"Fetch Data\"].json.items }}", Platform::NodeGraph);
        assert_eq!(
            expr,
            Expression::access(
                Expression::named("$node"),
                vec![
                    Accessor::Index(IndexKey::Key("Fetch Data".to_string())),
                    field("json"),
                    field("items"),
                ]
            )
        );
    }

    #[test]
    fn test_dotted_function_name() {
        let expr = sole_ast("={{ $str.upper($json.text) }}", Platform::NodeGraph);
        match expr {
            Expression::FunctionCall { name, args } => {
                assert_eq!(name, "$str.upper");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn test_flow_graph_semicolon_arguments() {
        let expr = sole_ast("{{formatDate(1.date; \"YYYY-MM-DD\")}}", Platform::FlowGraph);
        match expr {
            Expression::FunctionCall { name, args } => {
                assert_eq!(name, "formatDate");
                assert_eq!(args.len(), 2);
                assert_eq!(args[1], Expression::Literal(Literal::String("YYYY-MM-DD".into())));
            }
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_concatenation_is_flattened() {
        let expr = parse_expression("\"a\" + (\"b\" + $json.c)").unwrap();
        match expr {
            Expression::Concatenation(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected a concatenation, got {:?}", other),
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_expression("true").unwrap(), Expression::Literal(Literal::Bool(true)));
        assert_eq!(parse_expression("null").unwrap(), Expression::Literal(Literal::Null));
        assert_eq!(
            parse_expression("-3.5").unwrap(),
            Expression::Literal(Literal::Number(-3.5))
        );
        assert_eq!(
            parse_expression("'single'").unwrap(),
            Expression::Literal(Literal::String("single".to_string()))
        );
    }

    #[test]
    fn test_collect_function_names() {
        let expr = parse_expression("$if($json.ok, $str.upper($json.a), \"x\")").unwrap();
        let mut names = Vec::new();
        expr.collect_function_names(&mut names);
        assert_eq!(names, vec!["$if", "$str.upper"]);
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[test]
    fn test_empty_body() {
        assert_eq!(
            parse_failure("{{ }}", Platform::FlowGraph),
            ParseError::EmptyExpression
        );
    }

    #[test]
    fn test_dangling_dot() {
        assert!(matches!(
            parse_failure("={{ $json. }}", Platform::NodeGraph),
            ParseError::UnexpectedEnd { .. }
        ));
    }

    #[test]
    fn test_unsupported_operator() {
        assert!(matches!(
            parse_failure("={{ $json.a * 2 }}", Platform::NodeGraph),
            ParseError::UnexpectedCharacter { character: '*', .. }
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            parse_expression("\"open"),
            Err(ParseError::UnterminatedString { offset: 0 })
        ));
    }

    #[test]
    fn test_call_on_index_is_rejected() {
        assert!(matches!(
            parse_expression("$json[0](1)"),
            Err(ParseError::UnsupportedCallTarget { .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let body = format!(
            "{}1{}",
            "(".repeat(MAX_NESTING + 1),
            ")".repeat(MAX_NESTING + 1)
        );
        assert_eq!(
            parse_expression(&body),
            Err(ParseError::NestingTooDeep { limit: MAX_NESTING })
        );
    }
}

#[cfg(test)]
mod round_trip_tests {
    use super::*;

    #[test]
    fn test_rendered_expressions_parse_back_to_the_same_tree() {
        let cases = [
            (Platform::NodeGraph, "$json.id"),
            (Platform::NodeGraph, "$json[\"key with space\"].inner[2]"),
            (Platform::NodeGraph, "$node[\"My Node\"].json.x"),
            (Platform::NodeGraph, "$str.replace($json.name, \"a\", \"b\\\"c\")"),
            (Platform::NodeGraph, "\"x\" + 1 + true + null"),
            (Platform::NodeGraph, "$if($json.ok, -2.25, \"tab\\there\")"),
            (Platform::FlowGraph, "formatDate(1.date; \"YYYY\")"),
            (Platform::FlowGraph, "upper(2.text) + \" \" + env.HOME"),
            (Platform::FlowGraph, "(\"a\" + 1.b).length"),
        ];

        for (platform, body) in cases {
            let parsed = parse_expression(body).unwrap();
            let rendered = render_expression(&parsed, platform);
            let reparsed = parse_expression(&rendered)
                .unwrap_or_else(|e| panic!("'{}' rendered as '{}': {}", body, rendered, e));
            assert_eq!(parsed, reparsed, "round trip changed '{}'", body);
        }
    }
}
