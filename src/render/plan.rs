//! Query plan tree rendering.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One operator in a query execution plan.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    pub operator_type: String,
    #[serde(default, alias = "args")]
    pub arguments: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<PlanNode>,
}

/// Renders a plan as one `operatorType (arg=value, ...)` line per node.
///
/// Nodes are visited depth-first in pre-order; each child is indented two
/// spaces deeper than its parent.
pub fn render_plan(plan: &PlanNode) -> String {
    let mut lines = Vec::new();
    collect_lines(plan, 0, &mut lines);
    lines.join("\n")
}

fn collect_lines(node: &PlanNode, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    if node.arguments.is_empty() {
        lines.push(format!("{}{}", indent, node.operator_type));
    } else {
        let args = node
            .arguments
            .iter()
            .map(|(k, v)| format!("{}={}", k, argument_text(v)))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("{}{} ({})", indent, node.operator_type, args));
    }

    for child in &node.children {
        collect_lines(child, depth + 1, lines);
    }
}

fn argument_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_nested_plan_preorder() {
        let plan: PlanNode = serde_json::from_value(json!({
            "operatorType": "ProduceResults@neo4j",
            "args": {"Details": "n"},
            "children": [{
                "operatorType": "Filter@neo4j",
                "args": {"Details": "n.age > 30", "EstimatedRows": 3.5},
                "children": [{"operatorType": "AllNodesScan@neo4j", "children": []}]
            }, {
                "operatorType": "Argument@neo4j"
            }]
        }))
        .unwrap();

        assert_eq!(
            render_plan(&plan),
            "ProduceResults@neo4j (Details=n)\n  Filter@neo4j (Details=n.age > 30, EstimatedRows=3.5)\n    AllNodesScan@neo4j\n  Argument@neo4j"
        );
    }

    #[test]
    fn test_single_node() {
        let plan = PlanNode {
            operator_type: "EmptyResult".into(),
            ..Default::default()
        };
        assert_eq!(render_plan(&plan), "EmptyResult");
    }
}
