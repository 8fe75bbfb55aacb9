//! Entity deduplication across output labels.
//!
//! The same vertex or edge may be printed under several labels. Occurrences
//! sharing `(type, id)` collapse into one [`CanonicalEntity`] whose attributes
//! are overlaid in discovery order (later values win), and which remembers how
//! many times and under which labels it was seen.

use crate::decode::{DecodedOutput, EdgeOccurrence, OtherOutput, VertexOccurrence};
use crate::ordered::OrderedMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Something with a type name, an id within that type and attributes.
pub trait GraphEntity {
    fn type_name(&self) -> &str;
    fn identity(&self) -> &str;
    fn attributes_mut(&mut self) -> &mut Map<String, Value>;
    fn into_attributes(self) -> Map<String, Value>;
}

impl GraphEntity for VertexOccurrence {
    fn type_name(&self) -> &str {
        &self.v_type
    }

    fn identity(&self) -> &str {
        &self.v_id
    }

    fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }
}

impl GraphEntity for EdgeOccurrence {
    fn type_name(&self) -> &str {
        &self.e_type
    }

    fn identity(&self) -> &str {
        &self.e_id
    }

    fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEntity<T> {
    #[serde(flatten)]
    pub entity: T,
    pub occurrences: usize,
    /// Output labels in the order occurrences were seen, repeats included.
    pub sources: Vec<String>,
}

impl<T: GraphEntity> CanonicalEntity<T> {
    fn first(entity: T, label: &str) -> Self {
        Self {
            entity,
            occurrences: 1,
            sources: vec![label.to_string()],
        }
    }

    fn absorb(&mut self, occurrence: T, label: &str) {
        let attributes = self.entity.attributes_mut();
        for (key, value) in occurrence.into_attributes() {
            attributes.insert(key, value);
        }
        self.occurrences += 1;
        self.sources.push(label.to_string());
    }
}

/// type name -> id -> entity, both levels in discovery order.
pub type EntitiesByType<T> = OrderedMap<OrderedMap<CanonicalEntity<T>>>;

#[derive(Debug, Default)]
pub struct EntityDeduplicator {
    vertices: EntitiesByType<VertexOccurrence>,
    edges: EntitiesByType<EdgeOccurrence>,
}

impl EntityDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, label: &str, vertex: VertexOccurrence) {
        merge_into(&mut self.vertices, label, vertex);
    }

    pub fn add_edge(&mut self, label: &str, edge: EdgeOccurrence) {
        merge_into(&mut self.edges, label, edge);
    }

    pub fn finish(self, other: Vec<OtherOutput>) -> ParsedOutput {
        ParsedOutput {
            vertices: self.vertices,
            edges: self.edges,
            other,
        }
    }

    /// Feeds every occurrence of a decoded output, in discovery order.
    pub fn dedup(decoded: DecodedOutput) -> ParsedOutput {
        let mut dedup = Self::new();
        for (label, vertex) in decoded.vertices {
            dedup.add_vertex(&label, vertex);
        }
        for (label, edge) in decoded.edges {
            dedup.add_edge(&label, edge);
        }
        dedup.finish(decoded.other)
    }
}

fn merge_into<T: GraphEntity>(table: &mut EntitiesByType<T>, label: &str, occurrence: T) {
    let by_id = table.get_or_insert_with(occurrence.type_name(), OrderedMap::new);
    match by_id.get_mut(occurrence.identity()) {
        Some(canonical) => canonical.absorb(occurrence, label),
        None => {
            let id = occurrence.identity().to_string();
            by_id.insert(id, CanonicalEntity::first(occurrence, label));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedOutput {
    pub vertices: EntitiesByType<VertexOccurrence>,
    pub edges: EntitiesByType<EdgeOccurrence>,
    pub other: Vec<OtherOutput>,
}

impl ParsedOutput {
    pub fn vertex(&self, v_type: &str, v_id: &str) -> Option<&CanonicalEntity<VertexOccurrence>> {
        self.vertices.get(v_type)?.get(v_id)
    }

    pub fn edge(&self, e_type: &str, e_id: &str) -> Option<&CanonicalEntity<EdgeOccurrence>> {
        self.edges.get(e_type)?.get(e_id)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.values().map(OrderedMap::len).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(OrderedMap::len).sum()
    }

    /// JSON rendering; `graph_only` leaves out the `other` bucket.
    pub fn to_json(&self, graph_only: bool) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if graph_only {
            if let Value::Object(fields) = &mut value {
                fields.remove("other");
            }
        }
        Ok(value)
    }
}
