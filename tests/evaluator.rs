//! Tests for evaluating expressions against a binding context.
use honyaku::evaluator::{coerce_to_string, evaluate, evaluate_template, is_truthy};
use honyaku::prelude::*;
use serde_json::{Value, json};

fn bindings(value: Value) -> Bindings {
    match value {
        Value::Object(map) => map,
        _ => panic!("bindings must be an object"),
    }
}

fn eval_node(body: &str, context: &Bindings) -> std::result::Result<Value, EvaluationError> {
    let expr = parse_expression(body).unwrap();
    evaluate(&expr, Platform::NodeGraph, context, EvaluationBudget::default())
}

fn eval_flow(body: &str, context: &Bindings) -> std::result::Result<Value, EvaluationError> {
    let expr = parse_expression(body).unwrap();
    evaluate(&expr, Platform::FlowGraph, context, EvaluationBudget::default())
}

#[cfg(test)]
mod evaluation_tests {
    use super::*;

    #[test]
    fn test_concatenation_with_number() {
        let ctx = bindings(json!({ "$json": { "id": 12345 } }));
        let template = parse_template(
            "={{ \"https://example.com/api/\" + $json.id }}",
            Platform::NodeGraph,
        );
        let value = evaluate_template(&template, &ctx, EvaluationBudget::default()).unwrap();
        assert_eq!(value, json!("https://example.com/api/12345"));
    }

    #[test]
    fn test_sole_expression_keeps_native_type() {
        let ctx = bindings(json!({ "$json": { "items": [1, 2, 3] } }));
        let template = parse_template("={{ $json.items }}", Platform::NodeGraph);
        let value = evaluate_template(&template, &ctx, EvaluationBudget::default()).unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn test_mixed_template_is_a_string() {
        let ctx = bindings(json!({ "1": { "count": 2.5, "ok": true } }));
        let template = parse_template("n={{1.count}} ok={{1.ok}}", Platform::FlowGraph);
        let value = evaluate_template(&template, &ctx, EvaluationBudget::default()).unwrap();
        assert_eq!(value, json!("n=2.5 ok=true"));
    }

    #[test]
    fn test_missing_values_are_null() {
        let ctx = Bindings::new();
        assert_eq!(eval_node("$json.a.b[3]", &ctx).unwrap(), Value::Null);
        assert_eq!(eval_node("\"x\" + $json.missing", &ctx).unwrap(), json!("x"));
    }

    #[test]
    fn test_length_accessor() {
        let ctx = bindings(json!({ "$json": { "list": [1, 2], "name": "héllo" } }));
        assert_eq!(eval_node("$json.list.length", &ctx).unwrap(), json!(2));
        assert_eq!(eval_node("$json.name.length", &ctx).unwrap(), json!(5));
    }

    #[test]
    fn test_index_access() {
        let ctx = bindings(json!({ "$json": { "list": ["a", "b"], "map": { "k y": 1 } } }));
        assert_eq!(eval_node("$json.list[1]", &ctx).unwrap(), json!("b"));
        assert_eq!(eval_node("$json.map[\"k y\"]", &ctx).unwrap(), json!(1));
        assert_eq!(eval_node("$json.list[7]", &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn test_now_without_binding_is_a_timestamp() {
        let value = eval_node("$now", &Bindings::new()).unwrap();
        let text = value.as_str().expect("now is a string");
        assert!(chrono::DateTime::parse_from_rfc3339(text).is_ok());
    }

    #[test]
    fn test_bound_now_wins() {
        let ctx = bindings(json!({ "now": "2024-01-01T00:00:00Z" }));
        assert_eq!(eval_flow("now", &ctx).unwrap(), json!("2024-01-01T00:00:00Z"));
    }
}

#[cfg(test)]
mod builtin_tests {
    use super::*;

    #[test]
    fn test_string_builtins() {
        let ctx = bindings(json!({ "$json": { "text": "  hello world  " } }));
        assert_eq!(eval_node("$str.upper(\"abc\")", &ctx).unwrap(), json!("ABC"));
        assert_eq!(eval_node("$str.lower(\"ABC\")", &ctx).unwrap(), json!("abc"));
        assert_eq!(eval_node("$str.capitalize(\"élan\")", &ctx).unwrap(), json!("Élan"));
        assert_eq!(eval_node("$str.trim($json.text)", &ctx).unwrap(), json!("hello world"));
        assert_eq!(eval_node("$str.length(\"abcd\")", &ctx).unwrap(), json!(4));
    }

    #[test]
    fn test_replace_substitutes_every_occurrence() {
        let ctx = Bindings::new();
        assert_eq!(
            eval_flow("replace(\"a-b-c\"; \"-\"; \"+\")", &ctx).unwrap(),
            json!("a+b+c")
        );
    }

    #[test]
    fn test_array_builtins() {
        let ctx = bindings(json!({ "1": { "tags": ["x", "y", 3] } }));
        assert_eq!(eval_flow("join(1.tags; \"|\")", &ctx).unwrap(), json!("x|y|3"));
        assert_eq!(eval_flow("join(1.tags)", &ctx).unwrap(), json!("x,y,3"));
        assert_eq!(eval_flow("first(1.tags)", &ctx).unwrap(), json!("x"));
        assert_eq!(eval_flow("last(1.tags)", &ctx).unwrap(), json!(3));
        assert_eq!(eval_flow("contains(1.tags; \"y\")", &ctx).unwrap(), json!(true));
        assert_eq!(eval_flow("contains(\"abc\"; \"d\")", &ctx).unwrap(), json!(false));
    }

    #[test]
    fn test_round() {
        let ctx = Bindings::new();
        assert_eq!(eval_flow("round(2.5)", &ctx).unwrap(), json!(3));
        assert_eq!(eval_flow("round(3.14159; 2)", &ctx).unwrap(), json!(3.14));
        assert_eq!(eval_flow("round(\"7.6\")", &ctx).unwrap(), json!(8));
    }

    #[test]
    fn test_conditional_is_lazy() {
        let ctx = bindings(json!({ "$json": { "ok": false } }));
        // The untaken branch calls an unknown function and must not fail.
        assert_eq!(
            eval_node("$if($json.ok, $missing(1), \"fallback\")", &ctx).unwrap(),
            json!("fallback")
        );
        assert_eq!(eval_node("$if($json.ok, 1)", &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn test_format_date_tokens() {
        let ctx = bindings(json!({ "1": { "date": "2024-03-05T14:07:09Z" } }));
        assert_eq!(
            eval_flow("formatDate(1.date; \"YYYY-MM-DD HH:mm:ss\")", &ctx).unwrap(),
            json!("2024-03-05 14:07:09")
        );
        assert_eq!(
            eval_flow("formatDate(1.date; \"DD MMM YY\")", &ctx).unwrap(),
            json!("05 Mar 24")
        );
        assert_eq!(
            eval_flow("formatDate(1.date; \"[Day] DD, hh A\")", &ctx).unwrap(),
            json!("Day 05, 02 PM")
        );
    }

    #[test]
    fn test_format_date_escapes_percent() {
        let ctx = Bindings::new();
        assert_eq!(
            eval_flow("formatDate(\"2024-03-05\"; \"100% YYYY\")", &ctx).unwrap(),
            json!("100% 2024")
        );
    }

    #[test]
    fn test_parse_date_accepts_several_inputs() {
        let ctx = Bindings::new();
        assert_eq!(
            eval_flow("parseDate(\"2024-03-05\")", &ctx).unwrap(),
            json!("2024-03-05T00:00:00.000Z")
        );
        assert_eq!(
            eval_flow("parseDate(0)", &ctx).unwrap(),
            json!("1970-01-01T00:00:00.000Z")
        );
        assert_eq!(
            eval_flow("parseDate(\"2024-03-05T10:00:00+02:00\")", &ctx).unwrap(),
            json!("2024-03-05T08:00:00.000Z")
        );
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            eval_node("$customFn(1)", &Bindings::new()),
            Err(EvaluationError::UnknownFunction("$customFn".to_string()))
        );
    }

    #[test]
    fn test_flow_graph_names_are_unknown_in_node_graph() {
        assert!(matches!(
            eval_node("upper(\"a\")", &Bindings::new()),
            Err(EvaluationError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        assert!(matches!(
            eval_node("$str.upper(\"a\", \"b\")", &Bindings::new()),
            Err(EvaluationError::ArityMismatch { found: 2, .. })
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let ctx = bindings(json!({ "$json": { "obj": { "a": 1 } } }));
        assert!(matches!(
            eval_node("$str.upper($json.obj)", &ctx),
            Err(EvaluationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_date() {
        assert!(matches!(
            eval_flow("formatDate(\"not a date\"; \"YYYY\")", &Bindings::new()),
            Err(EvaluationError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_step_budget() {
        let body = vec!["\"a\""; 50].join(" + ");
        let expr = parse_expression(&body).unwrap();
        let budget = EvaluationBudget {
            max_depth: 64,
            max_steps: 10,
        };
        assert_eq!(
            evaluate(&expr, Platform::NodeGraph, &Bindings::new(), budget),
            Err(EvaluationError::BudgetExceeded {
                kind: "step",
                limit: 10,
            })
        );
    }

    #[test]
    fn test_depth_budget() {
        let body = format!("{}\"x\"{}", "$str.upper(".repeat(10), ")".repeat(10));
        let expr = parse_expression(&body).unwrap();
        let budget = EvaluationBudget {
            max_depth: 4,
            max_steps: 10_000,
        };
        assert!(matches!(
            evaluate(&expr, Platform::NodeGraph, &Bindings::new(), budget),
            Err(EvaluationError::BudgetExceeded { kind: "depth", .. })
        ));
    }

    #[test]
    fn test_unparsed_template() {
        let template = parse_template("={{ $json. }}", Platform::NodeGraph);
        assert!(matches!(
            evaluate_template(&template, &Bindings::new(), EvaluationBudget::default()),
            Err(EvaluationError::Unparsed(_))
        ));
    }
}

#[cfg(test)]
mod coercion_tests {
    use super::*;

    #[test]
    fn test_coerce_to_string() {
        assert_eq!(coerce_to_string(&Value::Null), "");
        assert_eq!(coerce_to_string(&json!(3.0)), "3");
        assert_eq!(coerce_to_string(&json!(2.5)), "2.5");
        assert_eq!(coerce_to_string(&json!(false)), "false");
        assert_eq!(coerce_to_string(&json!({"a": [1]})), "{\"a\":[1]}");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!([])));
    }
}
