use serde_json::{json, Value};
use tgadapt_results::{parse_query_output, DecodeError, NoSchema, OtherOutput};
use tgadapt_schema::SchemaSnapshot;

fn social() -> SchemaSnapshot {
    serde_json::from_value(json!({
        "GraphName": "Social",
        "VertexTypes": [{"Name": "Person"}],
        "EdgeTypes": [
            {"Name": "Follows", "IsDirected": true,
             "FromVertexTypeName": "Person", "ToVertexTypeName": "Person",
             "Config": {"REVERSE_EDGE": "reverse_Follows"}},
            {"Name": "Knows", "IsDirected": false,
             "FromVertexTypeName": "Person", "ToVertexTypeName": "Person",
             "Config": {}}
        ]
    }))
    .expect("schema")
}

fn follows(from: &str, to: &str, attributes: Value) -> Value {
    json!({
        "e_type": "Follows", "directed": true,
        "from_type": "Person", "from_id": from,
        "to_type": "Person", "to_id": to,
        "attributes": attributes
    })
}

#[test]
fn repeated_vertex_merges_with_later_attributes() {
    let output = json!([
        {"result": [{"v_type": "Person", "v_id": "7", "attributes": {"age": 30}}]},
        {"other": [{"v_type": "Person", "v_id": "7", "attributes": {"age": 31}}]}
    ]);
    let parsed = parse_query_output(&output, &NoSchema).expect("parse");

    assert_eq!(parsed.vertex_count(), 1);
    let person = parsed.vertex("Person", "7").expect("Person 7");
    assert_eq!(person.entity.attributes["age"], json!(31));
    assert_eq!(person.occurrences, 2);
    assert_eq!(person.sources, vec!["result", "other"]);
    assert!(parsed.other.is_empty());
}

#[test]
fn scalar_payload_goes_to_other() {
    let parsed = parse_query_output(&json!([{"cnt": 5}]), &NoSchema).expect("parse");
    assert!(parsed.vertices.is_empty());
    assert!(parsed.edges.is_empty());
    assert_eq!(
        parsed.other,
        vec![OtherOutput {
            label: "cnt".into(),
            value: json!(5)
        }]
    );
}

#[test]
fn repeated_edge_merges_and_carries_its_reverse() {
    let output = json!([
        {"@@edges": [follows("1", "2", json!({"since": "2020"})), follows("2", "1", json!({}))]},
        {"path": [follows("1", "2", json!({"weight": 2}))]}
    ]);
    let parsed = parse_query_output(&output, &social()).expect("parse");

    assert_eq!(parsed.edge_count(), 2);
    let edge = parsed.edge("Follows", "Person(1)->Person(2)").expect("edge");
    assert_eq!(edge.occurrences, 2);
    assert_eq!(edge.sources, vec!["@@edges", "path"]);
    assert_eq!(edge.entity.attributes["since"], json!("2020"));
    assert_eq!(edge.entity.attributes["weight"], json!(2));
    assert_eq!(edge.entity.reverse_edge.as_deref(), Some("reverse_Follows"));
}

#[test]
fn undirected_edges_get_no_reverse() {
    let output = json!([{"k": [{
        "e_type": "Knows", "from_type": "Person", "from_id": 1,
        "to_type": "Person", "to_id": 2, "attributes": {}
    }]}]);
    let parsed = parse_query_output(&output, &social()).expect("parse");
    let edge = parsed.edge("Knows", "Person(1)->Person(2)").expect("edge");
    assert_eq!(edge.entity.reverse_edge, None);
}

#[test]
fn mixed_payload_keeps_graph_elements_and_is_also_other() {
    let mixed = json!([{"v_type": "Person", "v_id": "1"}, {"score": 0.5}]);
    let parsed = parse_query_output(&json!([{"mixed": mixed.clone()}]), &NoSchema).expect("parse");
    assert!(parsed.vertex("Person", "1").is_some());
    assert_eq!(parsed.other.len(), 1);
    assert_eq!(parsed.other[0].value, mixed);
}

#[test]
fn discovery_order_is_preserved() {
    let output = json!([
        {"b": [{"v_type": "Post", "v_id": "p1"}], "a": [{"v_type": "Person", "v_id": "9"}]},
        {"c": [{"v_type": "Person", "v_id": "3"}, {"v_type": "Post", "v_id": "p0"}]}
    ]);
    let parsed = parse_query_output(&output, &NoSchema).expect("parse");
    let types: Vec<&str> = parsed.vertices.keys().collect();
    assert_eq!(types, vec!["Post", "Person"]);
    let people: Vec<&str> = parsed.vertices.get("Person").expect("Person").keys().collect();
    assert_eq!(people, vec!["9", "3"]);
}

#[test]
fn empty_output_is_empty() {
    let parsed = parse_query_output(&json!([]), &NoSchema).expect("parse");
    assert_eq!(parsed, Default::default());
}

#[test]
fn malformed_frames_report_their_index() {
    let err = parse_query_output(&json!([{}, {}, "oops"]), &NoSchema).expect_err("bad frame");
    assert_eq!(
        err,
        DecodeError::FrameNotObject {
            frame: 2,
            found: "string"
        }
    );
    assert!(err.to_string().contains("frame 2"));
}

#[test]
fn vertex_with_null_attributes_is_kept() {
    let output = json!([{"r": [{"v_type": "Person", "v_id": "1", "attributes": null}]}]);
    let parsed = parse_query_output(&output, &NoSchema).expect("parse");
    assert_eq!(parsed.vertex_count(), 1);
    assert!(parsed.other.is_empty());
    let person = parsed.vertex("Person", "1").expect("Person 1");
    assert!(person.entity.attributes.is_empty());
}
