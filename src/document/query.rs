use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::NodeKind;

// Position for editor nodes
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// Persisted node: `data` holds the node's clause
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default)]
    pub data: Value,
}

// Persisted edge: `source` consumes from `target`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

/// A `.qry` document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDoc {
    pub query_name: String,
    #[serde(default)]
    pub nodes: Vec<DocNode>,
    #[serde(default)]
    pub edges: Vec<DocEdge>,
}

impl QueryDoc {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Same nodes and edges regardless of their order, or the order of
    /// field lists and select conditions inside node data
    pub fn equivalent(&self, other: &QueryDoc) -> bool {
        if self.query_name != other.query_name
            || self.nodes.len() != other.nodes.len()
            || self.edges.len() != other.edges.len()
        {
            return false;
        }
        self.nodes
            .iter()
            .all(|n| other.nodes.iter().any(|o| same_node(n, o)))
            && self.edges.iter().all(|e| other.edges.contains(e))
    }
}

fn same_node(a: &DocNode, b: &DocNode) -> bool {
    a.id == b.id
        && a.kind == b.kind
        && a.position == b.position
        && a.level == b.level
        && normalized(&a.data) == normalized(&b.data)
}

// `fields` and select `where` lists are sets; join and having tuples keep their order
fn normalized(data: &Value) -> Value {
    let mut data = data.clone();
    if let Some(Value::Array(fields)) = data.get_mut("fields") {
        fields.sort_by_key(|f| f.to_string());
    }
    if let Some(Value::Array(conditions)) = data.get_mut("where") {
        if conditions.iter().all(Value::is_array) {
            conditions.sort_by_key(|c| c.to_string());
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_persisted_query() {
        let raw = json!({
            "queryName": "BigOrders",
            "nodes": [
                { "id": "s", "type": "streamNode", "position": { "x": 0.0, "y": 0.0 }, "level": 1, "data": { "stream": "Orders" } },
                { "id": "q", "type": "selectNode", "position": { "x": 10.0, "y": 80.0 }, "level": 2,
                  "data": { "stream": "Orders", "fields": ["Orders.amount"], "where": [] } }
            ],
            "edges": [ { "source": "q", "sourceHandle": "b", "target": "s" } ]
        });
        let doc: QueryDoc = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.nodes[1].kind, NodeKind::Select);
        assert_eq!(doc.edges[0].source_handle.as_deref(), Some("b"));
        assert_eq!(doc.edges[0].id, None);
    }

    #[test]
    fn test_equivalent_ignores_order() {
        let a = QueryDoc {
            query_name: "Q".to_string(),
            nodes: vec![
                DocNode { id: "1".into(), kind: NodeKind::Stream, position: Position::default(), level: Some(1), data: json!({"stream": "S"}) },
                DocNode { id: "2".into(), kind: NodeKind::Stream, position: Position::default(), level: Some(1), data: json!({"stream": "T"}) },
            ],
            edges: Vec::new(),
        };
        let mut b = a.clone();
        b.nodes.reverse();
        assert!(a.equivalent(&b));
        b.query_name = "R".to_string();
        assert!(!a.equivalent(&b));
    }

    #[test]
    fn test_equivalent_ignores_field_and_condition_order() {
        let node = |data: Value| QueryDoc {
            query_name: "Q".to_string(),
            nodes: vec![DocNode { id: "q".into(), kind: NodeKind::Select, position: Position::default(), level: Some(2), data }],
            edges: Vec::new(),
        };
        let a = node(json!({
            "stream": "Orders",
            "fields": ["Orders.orderId", "Orders.amount"],
            "where": [["Orders.amount", "gt", "100", "and"], ["Orders.orderId", "lt", "9", null]]
        }));
        let b = node(json!({
            "stream": "Orders",
            "fields": ["Orders.amount", "Orders.orderId"],
            "where": [["Orders.orderId", "lt", "9", null], ["Orders.amount", "gt", "100", "and"]]
        }));
        assert!(a.equivalent(&b));
        assert!(b.equivalent(&a));

        let c = node(json!({
            "stream": "Orders",
            "fields": ["Orders.amount", "Orders.status"],
            "where": [["Orders.orderId", "lt", "9", null], ["Orders.amount", "gt", "100", "and"]]
        }));
        assert!(!a.equivalent(&c));

        // a join condition is a single ordered tuple
        let join = |cond: Value| QueryDoc {
            query_name: "Q".to_string(),
            nodes: vec![DocNode { id: "j".into(), kind: NodeKind::Join, position: Position::default(), level: Some(3), data: json!({ "fields": [], "where": cond }) }],
            edges: Vec::new(),
        };
        let left_first = join(json!(["Orders.orderId", "eq", "Customers.customerId"]));
        let right_first = join(json!(["Customers.customerId", "eq", "Orders.orderId"]));
        assert!(!left_first.equivalent(&right_first));
    }
}
