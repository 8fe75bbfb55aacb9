//! Schema snapshot model.
//!
//! Field names follow the database's own JSON (`Name`, `VertexTypes`,
//! `FromVertexTypeName`, ...), so the base snapshot returned by the schema
//! endpoint deserializes directly into [`SchemaSnapshot`] and an assembled
//! snapshot serializes back in the same shape. Keys this crate does not model
//! (attribute lists, primary ids, ...) are kept in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

pub type Name = String;

// ============================================================================
// Snapshot
// ============================================================================

/// One complete view of a graph's schema.
///
/// A snapshot is built once per refresh and never patched afterwards; a
/// refresh produces a new snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_name: Option<Name>,
    #[serde(default)]
    pub vertex_types: Vec<VertexType>,
    #[serde(default)]
    pub edge_types: Vec<EdgeType>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
    #[serde(default)]
    pub loading_jobs: Vec<LoadingJob>,
    #[serde(default)]
    pub queries: Vec<QueryDef>,
    #[serde(default, rename = "UDTs")]
    pub udts: Vec<Udt>,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
    #[serde(default)]
    pub graphs: Vec<GraphDef>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct VertexType {
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EdgeType {
    pub name: Name,
    #[serde(default)]
    pub is_directed: bool,
    /// A vertex type name, or `"*"` for multi-endpoint edges.
    #[serde(default)]
    pub from_vertex_type_name: Name,
    #[serde(default)]
    pub to_vertex_type_name: Name,
    /// Explicit source/target pairs (newer servers list these for `"*"` edges).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_pairs: Option<Vec<EdgePair>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EdgePair {
    pub from: Name,
    pub to: Name,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Secondary index on one vertex attribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDef {
    pub name: Name,
    pub vertex: Name,
    pub attribute: Name,
    pub statement: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct LoadingJob {
    pub name: Name,
    pub statement: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct QueryDef {
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    /// Endpoint parameters, minus the `query` parameter naming the query itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl QueryDef {
    /// Installed queries have a generated REST endpoint.
    pub fn is_installed(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// User defined tuple.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Udt {
    #[serde(rename = "Name", alias = "name")]
    pub name: Name,
    #[serde(rename = "Fields", alias = "fields", default)]
    pub fields: Vec<Value>,
    #[serde(rename = "Statement", default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DataSource {
    pub name: Name,
    #[serde(rename = "Type")]
    pub kind: String,
    pub details: String,
    /// `CREATE DATA_SOURCE ...` followed by `GRANT DATA_SOURCE ...`.
    pub statement: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct GraphDef {
    pub name: Name,
    pub statement: String,
    /// The listing line as printed, element kind markers included.
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub name: Name,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    pub name: Name,
    pub roles: Vec<String>,
    pub rule: String,
}

// ============================================================================
// Edge endpoints
// ============================================================================

/// Source or target vertex types of an edge type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EndpointTypes {
    Single(Name),
    /// Legacy `"*"` notation without explicit pairs: any vertex type.
    Any,
    /// Union of the pair endpoints. Not every source/target combination in the
    /// union is necessarily a defined pair.
    Set(BTreeSet<Name>),
}

impl fmt::Display for EndpointTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointTypes::Single(name) => write!(f, "{name}"),
            EndpointTypes::Any => write!(f, "*"),
            EndpointTypes::Set(names) => {
                write!(f, "{{{}}}", names.iter().cloned().collect::<Vec<_>>().join(", "))
            }
        }
    }
}

impl EdgeType {
    pub fn source_types(&self) -> EndpointTypes {
        resolve_endpoint(&self.from_vertex_type_name, self.edge_pairs.as_deref(), |p| &p.from)
    }

    pub fn target_types(&self) -> EndpointTypes {
        resolve_endpoint(&self.to_vertex_type_name, self.edge_pairs.as_deref(), |p| &p.to)
    }

    /// Reverse edge name; only directed edges can declare one.
    pub fn reverse_edge(&self) -> Option<&str> {
        if !self.is_directed {
            return None;
        }
        self.config
            .get("REVERSE_EDGE")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }
}

fn resolve_endpoint<'a>(
    declared: &str,
    pairs: Option<&'a [EdgePair]>,
    side: impl Fn(&'a EdgePair) -> &'a Name,
) -> EndpointTypes {
    if declared != "*" {
        return EndpointTypes::Single(declared.to_string());
    }
    match pairs {
        Some(pairs) => EndpointTypes::Set(pairs.iter().map(|p| side(p).clone()).collect()),
        None => EndpointTypes::Any,
    }
}

// ============================================================================
// Lookups
// ============================================================================

impl SchemaSnapshot {
    pub fn vertex_type_names(&self) -> Vec<&str> {
        self.vertex_types.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn vertex_type(&self, name: &str) -> Option<&VertexType> {
        self.vertex_types.iter().find(|v| v.name == name)
    }

    pub fn vertex_type_mut(&mut self, name: &str) -> Option<&mut VertexType> {
        self.vertex_types.iter_mut().find(|v| v.name == name)
    }

    pub fn edge_type_names(&self) -> Vec<&str> {
        self.edge_types.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn edge_type(&self, name: &str) -> Option<&EdgeType> {
        self.edge_types.iter().find(|e| e.name == name)
    }

    pub fn edge_type_mut(&mut self, name: &str) -> Option<&mut EdgeType> {
        self.edge_types.iter_mut().find(|e| e.name == name)
    }

    pub fn edge_source_types(&self, edge_type: &str) -> Option<EndpointTypes> {
        self.edge_type(edge_type).map(EdgeType::source_types)
    }

    pub fn edge_target_types(&self, edge_type: &str) -> Option<EndpointTypes> {
        self.edge_type(edge_type).map(EdgeType::target_types)
    }

    pub fn is_directed(&self, edge_type: &str) -> Option<bool> {
        self.edge_type(edge_type).map(|e| e.is_directed)
    }

    pub fn reverse_edge(&self, edge_type: &str) -> Option<&str> {
        self.edge_type(edge_type).and_then(EdgeType::reverse_edge)
    }

    pub fn udt_names(&self) -> Vec<&str> {
        self.udts.iter().map(|u| u.name.as_str()).collect()
    }

    pub fn udt(&self, name: &str) -> Option<&Udt> {
        self.udts.iter().find(|u| u.name == name)
    }

    pub fn udt_mut(&mut self, name: &str) -> Option<&mut Udt> {
        self.udts.iter_mut().find(|u| u.name == name)
    }

    /// Field list of a UDT; empty when the UDT is unknown.
    pub fn udt_fields(&self, name: &str) -> &[Value] {
        self.udt(name).map(|u| u.fields.as_slice()).unwrap_or(&[])
    }

    pub fn query(&self, name: &str) -> Option<&QueryDef> {
        self.queries.iter().find(|q| q.name == name)
    }

    pub fn query_mut(&mut self, name: &str) -> Option<&mut QueryDef> {
        self.queries.iter_mut().find(|q| q.name == name)
    }

    /// Looks a query up, appending an empty entry when it is absent.
    pub fn query_or_insert(&mut self, name: &str) -> &mut QueryDef {
        let pos = match self.queries.iter().position(|q| q.name == name) {
            Some(pos) => pos,
            None => {
                self.queries.push(QueryDef {
                    name: name.to_string(),
                    ..QueryDef::default()
                });
                self.queries.len() - 1
            }
        };
        &mut self.queries[pos]
    }

    pub fn index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn loading_job(&self, name: &str) -> Option<&LoadingJob> {
        self.loading_jobs.iter().find(|j| j.name == name)
    }

    pub fn data_source(&self, name: &str) -> Option<&DataSource> {
        self.data_sources.iter().find(|d| d.name == name)
    }

    pub fn graph(&self, name: &str) -> Option<&GraphDef> {
        self.graphs.iter().find(|g| g.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> SchemaSnapshot {
        serde_json::from_value(json!({
            "GraphName": "Social",
            "VertexTypes": [
                {"Name": "Person", "PrimaryId": {"AttributeName": "id"}, "Config": {}}
            ],
            "EdgeTypes": [
                {
                    "Name": "Follows", "IsDirected": true,
                    "FromVertexTypeName": "Person", "ToVertexTypeName": "Person",
                    "Config": {"REVERSE_EDGE": "reverse_Follows"}
                },
                {
                    "Name": "Knows", "IsDirected": false,
                    "FromVertexTypeName": "Person", "ToVertexTypeName": "Person",
                    "Config": {"REVERSE_EDGE": "ignored"}
                },
                {
                    "Name": "Tagged", "IsDirected": true,
                    "FromVertexTypeName": "*", "ToVertexTypeName": "*",
                    "EdgePairs": [{"From": "Post", "To": "Tag"}, {"From": "Photo", "To": "Tag"}]
                },
                {
                    "Name": "Linked", "IsDirected": false,
                    "FromVertexTypeName": "*", "ToVertexTypeName": "Person"
                }
            ]
        }))
        .expect("base snapshot")
    }

    #[test]
    fn base_schema_keeps_unmodelled_keys() {
        let s = snapshot();
        let person = s.vertex_type("Person").expect("Person");
        assert!(person.extra.contains_key("PrimaryId"));
        let back = serde_json::to_value(&s).expect("serialize");
        assert_eq!(back["VertexTypes"][0]["PrimaryId"]["AttributeName"], "id");
    }

    #[test]
    fn reverse_edge_only_for_directed_edges() {
        let s = snapshot();
        assert_eq!(s.reverse_edge("Follows"), Some("reverse_Follows"));
        assert_eq!(s.reverse_edge("Knows"), None);
        assert_eq!(s.reverse_edge("Missing"), None);
        assert_eq!(s.is_directed("Follows"), Some(true));
    }

    #[test]
    fn endpoint_resolution_policy() {
        let s = snapshot();
        assert_eq!(
            s.edge_source_types("Follows"),
            Some(EndpointTypes::Single("Person".to_string()))
        );
        assert_eq!(
            s.edge_source_types("Tagged"),
            Some(EndpointTypes::Set(
                ["Photo", "Post"].iter().map(|s| s.to_string()).collect()
            ))
        );
        assert_eq!(
            s.edge_target_types("Tagged"),
            Some(EndpointTypes::Set(["Tag".to_string()].into_iter().collect()))
        );
        assert_eq!(s.edge_source_types("Linked"), Some(EndpointTypes::Any));
        assert_eq!(s.edge_source_types("Missing"), None);
    }

    #[test]
    fn query_or_insert_appends_once() {
        let mut s = SchemaSnapshot::default();
        s.query_or_insert("q1").deprecated = true;
        s.query_or_insert("q1");
        assert_eq!(s.queries.len(), 1);
        assert!(s.query("q1").expect("q1").deprecated);
    }
}
