//! Tests for walking parameter trees.
use honyaku::error::WalkError;
use honyaku::prelude::*;
use honyaku::review::ReviewReason;
use honyaku::translator::{NodeRef, ReferenceTable, TranslationContext, Translator};
use honyaku::walker::{ParameterWalker, WalkMode};
use serde_json::{Value, json};

/// `Start -> Work` on the node-graph side, ids 1 and 2 on the flow-graph side.
fn scope() -> ReferenceTable {
    let mut table = ReferenceTable::new();
    for (id, name) in [(1, "Start"), (2, "Work")] {
        table.add_node(NodeRef {
            source_key: name.to_string(),
            source_name: Some(name.to_string()),
            source_position: None,
            target_id: id.to_string(),
            target_name: name.to_string(),
            target_position: Some(id),
        });
    }
    table.add_edge("Start", "Work");
    table
}

fn code_keys() -> Vec<String> {
    vec!["jsCode".to_string(), "code".to_string()]
}

#[cfg(test)]
mod translate_mode_tests {
    use super::*;

    fn walk(params: &Value) -> (Value, honyaku::walker::WalkReport) {
        let scope = scope();
        let keys = code_keys();
        let ctx = TranslationContext {
            node_key: "Work",
            scope: &scope,
        };
        ParameterWalker::new(Translator::new(Platform::NodeGraph, Platform::FlowGraph), ctx)
            .code_keys(&keys)
            .walk(params)
            .unwrap()
    }

    #[test]
    fn test_nested_strings_are_translated_with_paths() {
        let params = json!({
            "url": "={{ \"https://example.com/\" + $json.id }}",
            "headers": [
                { "name": "X-Key", "value": "={{ $env.KEY }}" }
            ],
            "count": 3,
            "enabled": true
        });
        let (out, report) = walk(&params);

        assert_eq!(out["url"], json!("https://example.com/{{1.id}}"));
        assert_eq!(out["headers"][0]["value"], json!("{{env.KEY}}"));
        assert_eq!(out["headers"][0]["name"], json!("X-Key"));
        assert_eq!(out["count"], json!(3));
        assert_eq!(out["enabled"], json!(true));

        let paths: Vec<&str> = report.expressions.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["url", "headers.0.value"]);
        assert_eq!(report.flagged().count(), 0);
    }

    #[test]
    fn test_strings_without_expressions_are_never_flagged() {
        let params = json!({
            "text": "Hello {{ not an expression }}",
            "equation": "=1+1",
            "empty": ""
        });
        let (out, report) = walk(&params);
        assert_eq!(out, params);
        assert!(report.expressions.is_empty());
    }

    #[test]
    fn test_unknown_function_keeps_original_text() {
        let params = json!({ "value": "={{ $customFn($json.a) }}" });
        let (out, report) = walk(&params);
        assert_eq!(out, params);

        let flagged: Vec<_> = report.flagged().collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].path, "value");
        assert_eq!(
            flagged[0].issues,
            vec![ReviewReason::UnknownFunction("$customFn".to_string())]
        );
        assert!(flagged[0].issues[0].to_string().contains("unrecognized function"));
    }

    #[test]
    fn test_parse_failure_keeps_original_text() {
        let params = json!({ "value": "={{ $json.a * 2 }}" });
        let (out, report) = walk(&params);
        assert_eq!(out, params);
        assert!(matches!(
            report.flagged().next().map(|r| &r.issues[0]),
            Some(ReviewReason::ParseFailure(_))
        ));
    }

    #[test]
    fn test_embedded_code_is_passed_through() {
        let params = json!({
            "jsCode": "return items.map(i => ({ json: { v: `${i.json.a}` } }));",
            "code": "   "
        });
        let (out, report) = walk(&params);
        assert_eq!(out, params);
        assert_eq!(report.expressions.len(), 1);
        assert_eq!(
            report.expressions[0].issues,
            vec![ReviewReason::EmbeddedCode("jsCode".to_string())]
        );
    }

    #[test]
    fn test_walk_is_idempotent_on_flow_graph_output() {
        let params = json!({ "value": "={{ $str.upper($json.text) }}" });
        let (once, _) = walk(&params);
        assert_eq!(once["value"], json!("{{upper(1.text)}}"));

        // A converted string holds no node-graph expression, so a second
        // node-graph walk leaves it alone.
        let (twice, report) = walk(&once);
        assert_eq!(twice, once);
        assert!(report.expressions.is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let mut deep = json!("leaf");
        for _ in 0..10 {
            deep = json!({ "n": deep });
        }
        let scope = scope();
        let ctx = TranslationContext {
            node_key: "Work",
            scope: &scope,
        };
        let result = ParameterWalker::new(Translator::new(Platform::NodeGraph, Platform::FlowGraph), ctx)
            .max_depth(5)
            .walk(&deep);
        match result {
            Err(WalkError::DepthExceeded { path, limit }) => {
                assert_eq!(limit, 5);
                assert_eq!(path, "n.n.n.n.n.n");
            }
            other => panic!("expected a depth error, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod reverse_direction_tests {
    use super::*;

    #[test]
    fn test_node_graph_strings_are_kept_when_targeting_node_graph() {
        let mut table = ReferenceTable::new();
        table.add_node(NodeRef {
            source_key: "1".to_string(),
            source_name: Some("Start".to_string()),
            source_position: Some(1),
            target_id: "uuid-1".to_string(),
            target_name: "Start".to_string(),
            target_position: None,
        });
        table.add_node(NodeRef {
            source_key: "2".to_string(),
            source_name: Some("Work".to_string()),
            source_position: Some(2),
            target_id: "uuid-2".to_string(),
            target_name: "Work".to_string(),
            target_position: None,
        });
        table.add_edge("1", "2");

        let ctx = TranslationContext {
            node_key: "2",
            scope: &table,
        };
        let params = json!({
            "already": "={{ $json.kept }}",
            "converted": "Hi {{1.name}}"
        });
        let (out, _) = ParameterWalker::new(Translator::new(Platform::FlowGraph, Platform::NodeGraph), ctx)
            .walk(&params)
            .unwrap();

        assert_eq!(out["already"], json!("={{ $json.kept }}"));
        assert_eq!(out["converted"], json!("=Hi {{ $json.name }}"));
    }
}

#[cfg(test)]
mod evaluate_mode_tests {
    use super::*;

    #[test]
    fn test_evaluation_replaces_expressions_with_values() {
        let scope = scope();
        let ctx = TranslationContext {
            node_key: "Work",
            scope: &scope,
        };
        let mut bindings = Bindings::new();
        bindings.insert("$json".to_string(), json!({ "id": 12345, "tags": ["a"] }));

        let params = json!({
            "url": "={{ \"https://example.com/api/\" + $json.id }}",
            "tags": "={{ $json.tags }}",
            "broken": "={{ $json.id + $str.upper($json.tags) }}"
        });
        let (out, report) = ParameterWalker::new(Translator::new(Platform::NodeGraph, Platform::FlowGraph), ctx)
            .mode(WalkMode::Evaluate(&bindings))
            .walk(&params)
            .unwrap();

        assert_eq!(out["url"], json!("https://example.com/api/12345"));
        assert_eq!(out["tags"], json!(["a"]));
        // A failed evaluation falls back to the translated expression.
        assert_eq!(out["broken"], json!("{{1.id}}{{upper(1.tags)}}"));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("broken"));
    }
}
