//! Node schema and its Qdrant payload encoding

use qdrant_client::qdrant::{value::Kind, ListValue, PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// One retrievable chunk of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Point id (UUID v5 of the chunk hash)
    pub id: String,

    /// Owning document id
    pub doc_id: String,

    /// Source file path
    pub doc_path: String,

    pub file_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Headings hierarchy above this chunk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headings: Vec<String>,

    /// Chunk index within the document
    pub chunk_index: i64,

    pub chunk_hash: String,

    pub text: String,
}

impl Node {
    /// Stable point id for a chunk hash
    pub fn point_id(chunk_hash: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_hash.as_bytes())
    }

    /// Encode as a Qdrant payload
    pub fn to_qdrant_payload(&self) -> HashMap<String, QdrantValue> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map
                .into_iter()
                .map(|(k, v)| (k, json_to_qdrant_value(v)))
                .collect(),
            _ => HashMap::new(),
        }
    }

    /// Decode from a JSON payload map; `None` when required fields are missing
    pub fn from_payload(map: Map<String, Value>) -> Option<Self> {
        serde_json::from_value(Value::Object(map)).ok()
    }
}

/// A node with its embedding, ready to be upserted
#[derive(Debug, Clone)]
pub struct NodePoint {
    pub node: Node,
    pub vector: Vec<f32>,
}

impl NodePoint {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(&self) -> PointStruct {
        PointStruct::new(
            self.node.id.clone(),
            self.vector.clone(),
            self.node.to_qdrant_payload(),
        )
    }
}

/// A node returned by similarity search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNode {
    pub node: Node,
    pub score: f32,
}

fn json_to_qdrant_value(v: Value) -> QdrantValue {
    let kind = match v {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Kind::StringValue(s),
        Value::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(json_to_qdrant_value).collect(),
        }),
        Value::Object(map) => Kind::StructValue(qdrant_client::qdrant::Struct {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, json_to_qdrant_value(v)))
                .collect(),
        }),
    };
    QdrantValue { kind: Some(kind) }
}

/// Convert Qdrant value to serde_json Value
pub(crate) fn json_from_qdrant_value(v: QdrantValue) -> Value {
    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> Node {
        Node {
            id: Node::point_id("hash123").to_string(),
            doc_id: "doc-456".to_string(),
            doc_path: "/data/faq.md".to_string(),
            file_name: "faq.md".to_string(),
            title: Some("FAQ".to_string()),
            headings: vec!["Clubs".to_string()],
            chunk_index: 3,
            chunk_hash: "hash123".to_string(),
            text: "Clubs have one captain.".to_string(),
        }
    }

    #[test]
    fn test_point_id_is_stable() {
        assert_eq!(Node::point_id("abc"), Node::point_id("abc"));
        assert_ne!(Node::point_id("abc"), Node::point_id("abd"));
    }

    #[test]
    fn test_qdrant_payload_preserves_fields() {
        let node = sample_node();
        let payload = node.to_qdrant_payload();

        assert!(matches!(
            payload.get("chunk_index").and_then(|v| v.kind.clone()),
            Some(Kind::IntegerValue(3))
        ));

        let map: Map<String, Value> = payload
            .into_iter()
            .map(|(k, v)| (k, json_from_qdrant_value(v)))
            .collect();
        assert_eq!(Node::from_payload(map), Some(node));
    }

    #[test]
    fn test_from_payload_rejects_incomplete_map() {
        let mut map = Map::new();
        map.insert("doc_id".to_string(), Value::String("doc".to_string()));
        assert!(Node::from_payload(map).is_none());
    }
}
