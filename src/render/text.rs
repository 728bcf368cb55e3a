//! Hierarchical JSON-to-text rendering.

use serde_json::Value;

/// Marker rendered for an empty array.
pub const EMPTY_ARRAY: &str = "(empty array)";
/// Marker rendered for an empty object.
pub const EMPTY_OBJECT: &str = "(empty object)";

/// Renders a JSON value as indented, human-readable text.
///
/// Arrays become `- [i] value` lines and objects `key: value` lines. A nested
/// value spanning several lines starts on the line after its key, indented
/// two spaces per `depth`.
pub fn render_text(value: &Value, depth: usize) -> String {
    let indent = "  ".repeat(depth);

    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => EMPTY_ARRAY.to_string(),
        Value::Object(map) if map.is_empty() => EMPTY_OBJECT.to_string(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| entry(&indent, &format!("- [{}]", i), item, depth))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| entry(&indent, &format!("{}:", key), item, depth))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn entry(indent: &str, label: &str, item: &Value, depth: usize) -> String {
    let rendered = render_text(item, depth + 1);
    if is_nested(item) {
        format!("{}{}\n{}", indent, label, rendered)
    } else if rendered.contains('\n') {
        // Multi-line scalars carry no indentation of their own.
        let child = "  ".repeat(depth + 1);
        let lines = rendered
            .lines()
            .map(|line| format!("{}{}", child, line))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}{}\n{}", indent, label, lines)
    } else {
        format!("{}{} {}", indent, label, rendered)
    }
}

fn is_nested(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(render_text(&Value::Null, 0), "null");
        assert_eq!(render_text(&json!(42), 0), "42");
        assert_eq!(render_text(&json!(true), 3), "true");
        assert_eq!(render_text(&json!("plain"), 0), "plain");
    }

    #[test]
    fn test_empty_markers() {
        assert_eq!(render_text(&json!([]), 0), EMPTY_ARRAY);
        assert_eq!(render_text(&json!({}), 5), EMPTY_OBJECT);
    }

    #[test]
    fn test_multiline_string_is_indented() {
        let text = render_text(&json!({"note": {"body": "line one\nline two"}}), 0);
        assert_eq!(text, "note:\n  body:\n    line one\n    line two");

        let text = render_text(&json!(["a\nb"]), 1);
        assert_eq!(text, "  - [0]\n    a\n    b");
    }

    #[test]
    fn test_flat_object() {
        let text = render_text(&json!({"name": "Ada", "tags": []}), 0);
        assert_eq!(text, "name: Ada\ntags: (empty array)");
    }

    #[test]
    fn test_array_items_are_indexed() {
        let text = render_text(&json!(["a", null]), 0);
        assert_eq!(text, "- [0] a\n- [1] null");
    }

    #[test]
    fn test_nested_values_go_on_next_line_indented() {
        let text = render_text(&json!({"user": {"name": "Ada", "roles": ["admin"]}}), 0);
        assert_eq!(
            text,
            "user:\n  name: Ada\n  roles:\n    - [0] admin"
        );
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let value = json!({"a": [1, {"b": 2}], "c": null});
        assert_eq!(render_text(&value, 1), render_text(&value, 1));
    }
}
