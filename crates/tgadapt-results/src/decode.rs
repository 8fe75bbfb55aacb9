//! Query output classification.
//!
//! A query prints a JSON array of frames; each frame maps an output label
//! (variable name or `PRINT ... AS` alias) to a payload. Nothing in the output
//! says what a payload is, so every element of an array payload is decoded as
//! a vertex (`v_type` + `v_id`), else as an edge (`e_type` + endpoints), else
//! left opaque. Payloads that are not vertex/edge collections go to `other`
//! untouched.

use crate::error::DecodeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use tgadapt_schema::SchemaSnapshot;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VertexOccurrence {
    pub v_type: String,
    pub v_id: String,
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeOccurrence {
    pub e_type: String,
    /// `fromType(fromId)->toType(toId)`; edges carry no id of their own.
    pub e_id: String,
    pub from_type: String,
    pub from_id: String,
    pub to_type: String,
    pub to_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_edge: Option<String>,
    pub attributes: Map<String, Value>,
}

/// Composite identity of an edge.
pub fn edge_id(from_type: &str, from_id: &str, to_type: &str, to_id: &str) -> String {
    format!("{from_type}({from_id})->{to_type}({to_id})")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtherOutput {
    pub label: String,
    pub value: Value,
}

/// Classified output, each bucket in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedOutput {
    pub vertices: Vec<(String, VertexOccurrence)>,
    pub edges: Vec<(String, EdgeOccurrence)>,
    pub other: Vec<OtherOutput>,
}

/// Reverse edge names for decoded edges.
pub trait EdgeCatalog {
    /// Reverse edge of a directed edge type, if it declares one.
    fn reverse_edge_name(&self, edge_type: &str) -> Option<String>;
}

impl EdgeCatalog for SchemaSnapshot {
    fn reverse_edge_name(&self, edge_type: &str) -> Option<String> {
        self.reverse_edge(edge_type).map(str::to_string)
    }
}

/// Decodes without schema knowledge; no reverse edges are attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchema;

impl EdgeCatalog for NoSchema {
    fn reverse_edge_name(&self, _edge_type: &str) -> Option<String> {
        None
    }
}

// ============================================================================
// Element decoding
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum EntityId {
    Text(String),
    Number(Number),
}

impl EntityId {
    fn into_string(self) -> String {
        match self {
            EntityId::Text(s) => s,
            EntityId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct VertexRecord {
    v_type: String,
    v_id: EntityId,
    #[serde(default, deserialize_with = "attributes_or_empty")]
    attributes: Map<String, Value>,
}

#[derive(Deserialize)]
struct EdgeRecord {
    e_type: String,
    from_type: String,
    from_id: EntityId,
    to_type: String,
    to_id: EntityId,
    #[serde(default, deserialize_with = "flag_or_none")]
    directed: Option<bool>,
    #[serde(default, deserialize_with = "attributes_or_empty")]
    attributes: Map<String, Value>,
}

// Classification rests on the type and id keys alone; a malformed
// `attributes` or `directed` value does not demote an element to Other.
fn attributes_or_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(attributes)) => attributes,
        _ => Map::new(),
    })
}

fn flag_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_bool()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Element {
    Vertex(VertexRecord),
    Edge(EdgeRecord),
    Other(serde::de::IgnoredAny),
}

impl From<VertexRecord> for VertexOccurrence {
    fn from(r: VertexRecord) -> Self {
        VertexOccurrence {
            v_type: r.v_type,
            v_id: r.v_id.into_string(),
            attributes: r.attributes,
        }
    }
}

impl From<EdgeRecord> for EdgeOccurrence {
    fn from(r: EdgeRecord) -> Self {
        let from_id = r.from_id.into_string();
        let to_id = r.to_id.into_string();
        EdgeOccurrence {
            e_id: edge_id(&r.from_type, &from_id, &r.to_type, &to_id),
            e_type: r.e_type,
            from_type: r.from_type,
            from_id,
            to_type: r.to_type,
            to_id,
            directed: r.directed,
            reverse_edge: None,
            attributes: r.attributes,
        }
    }
}

// ============================================================================
// Frames
// ============================================================================

pub fn decode_output<C: EdgeCatalog + ?Sized>(
    output: &Value,
    catalog: &C,
) -> Result<DecodedOutput, DecodeError> {
    let frames = output.as_array().ok_or(DecodeError::NotAnArray {
        found: json_kind(output),
    })?;

    let mut decoded = DecodedOutput::default();
    for (frame_index, frame) in frames.iter().enumerate() {
        let fields = frame.as_object().ok_or(DecodeError::FrameNotObject {
            frame: frame_index,
            found: json_kind(frame),
        })?;
        for (label, payload) in fields {
            decode_payload(label, payload, catalog, &mut decoded);
        }
    }

    debug!(
        frames = frames.len(),
        vertices = decoded.vertices.len(),
        edges = decoded.edges.len(),
        other = decoded.other.len(),
        "decoded query output"
    );
    Ok(decoded)
}

fn decode_payload<C: EdgeCatalog + ?Sized>(
    label: &str,
    payload: &Value,
    catalog: &C,
    decoded: &mut DecodedOutput,
) {
    let elements = match payload.as_array() {
        Some(elements) if !elements.is_empty() => elements,
        _ => {
            decoded.other.push(OtherOutput {
                label: label.to_string(),
                value: payload.clone(),
            });
            return;
        }
    };

    let mut opaque = 0usize;
    for element in elements {
        match Element::deserialize(element) {
            Ok(Element::Vertex(record)) => {
                decoded.vertices.push((label.to_string(), record.into()));
            }
            Ok(Element::Edge(record)) => {
                let mut edge = EdgeOccurrence::from(record);
                edge.reverse_edge = catalog.reverse_edge_name(&edge.e_type);
                decoded.edges.push((label.to_string(), edge));
            }
            Ok(Element::Other(_)) | Err(_) => opaque += 1,
        }
    }

    if opaque > 0 {
        debug!(label, opaque, "payload has non-graph elements");
        decoded.other.push(OtherOutput {
            label: label.to_string(),
            value: payload.clone(),
        });
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
