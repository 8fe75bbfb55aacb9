//! Decoding of installed-query output into deduplicated vertices and edges.
//!
//! ```
//! use serde_json::json;
//! use tgadapt_results::{parse_query_output, NoSchema};
//!
//! let output = json!([
//!     {"result": [{"v_type": "Person", "v_id": "7", "attributes": {"age": 30}}]},
//!     {"other":  [{"v_type": "Person", "v_id": "7", "attributes": {"age": 31}}]}
//! ]);
//! let parsed = parse_query_output(&output, &NoSchema).unwrap();
//! let person = parsed.vertex("Person", "7").unwrap();
//! assert_eq!(person.entity.attributes["age"], json!(31));
//! assert_eq!(person.sources, vec!["result", "other"]);
//! ```

pub mod decode;
pub mod dedup;
pub mod error;
pub mod ordered;

pub use decode::{
    decode_output, edge_id, DecodedOutput, EdgeCatalog, EdgeOccurrence, NoSchema, OtherOutput,
    VertexOccurrence,
};
pub use dedup::{CanonicalEntity, EntityDeduplicator, GraphEntity, ParsedOutput};
pub use error::DecodeError;
pub use ordered::OrderedMap;

use serde_json::Value;

/// Decodes every frame, then merges repeated vertices and edges.
pub fn parse_query_output<C: EdgeCatalog + ?Sized>(
    output: &Value,
    catalog: &C,
) -> Result<ParsedOutput, DecodeError> {
    let decoded = decode_output(output, catalog)?;
    Ok(EntityDeduplicator::dedup(decoded))
}
