use proptest::prelude::*;
use tgadapt_schema::ls_text::merge_ls_output;
use tgadapt_schema::model::SchemaSnapshot;

fn ident() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z][A-Za-z0-9_]{0,10}").unwrap()
}

fn index_entry() -> impl Strategy<Value = (String, String, String)> {
    (ident(), ident(), ident())
}

fn listing(
    vertices: &[String],
    indexes: &[(String, String, String)],
    queries: &[(String, bool)],
) -> String {
    let mut text = String::from("Vertex Types:\n");
    for v in vertices {
        text.push_str(&format!("  - VERTEX {v}(PRIMARY_ID id STRING)\n"));
    }
    text.push_str("\nQueries:\n");
    for (q, deprecated) in queries {
        let marker = if *deprecated { "(deprecated)" } else { "(installed v2)" };
        text.push_str(&format!("  - {q}() {marker}\n"));
    }
    text.push_str("\nIndexes:\n");
    for (name, vertex, attr) in indexes {
        text.push_str(&format!("  - {name}:{vertex}({attr})\n"));
    }
    text.push('\n');
    text
}

fn merge(text: &str) -> SchemaSnapshot {
    let mut snapshot = SchemaSnapshot::default();
    merge_ls_output(&mut snapshot, text, "g", |q| Ok(format!("CREATE QUERY {q}() {{}}")))
        .expect("generated listing should parse");
    snapshot
}

proptest! {
    #[test]
    fn generated_listings_yield_one_record_per_line(
        vertices in proptest::collection::vec(ident(), 0..5),
        indexes in proptest::collection::vec(index_entry(), 0..6),
        queries in proptest::collection::vec((ident(), any::<bool>()), 0..5),
    ) {
        let text = listing(&vertices, &indexes, &queries);
        let s = merge(&text);

        prop_assert_eq!(s.indexes.len(), indexes.len());
        for (parsed, (name, vertex, attr)) in s.indexes.iter().zip(&indexes) {
            prop_assert_eq!(&parsed.name, name);
            prop_assert_eq!(&parsed.vertex, vertex);
            prop_assert_eq!(&parsed.attribute, attr);
        }

        // Vertex and query names may repeat; repeats merge by name.
        let distinct_vertices: std::collections::BTreeSet<_> = vertices.iter().collect();
        prop_assert_eq!(s.vertex_types.len(), distinct_vertices.len());
        prop_assert!(s.vertex_types.iter().all(|v| v.statement.is_some()));

        let distinct_queries: std::collections::BTreeSet<_> = queries.iter().map(|(q, _)| q).collect();
        prop_assert_eq!(s.queries.len(), distinct_queries.len());
        for (q, _) in &queries {
            // Last listing of a name wins.
            let last = queries.iter().rev().find(|(n, _)| n == q).map(|(_, d)| *d);
            prop_assert_eq!(s.query(q).map(|x| x.deprecated), last);
        }
    }

    #[test]
    fn merging_is_deterministic(
        vertices in proptest::collection::vec(ident(), 0..4),
        indexes in proptest::collection::vec(index_entry(), 0..4),
    ) {
        let text = listing(&vertices, &indexes, &[]);
        prop_assert_eq!(merge(&text), merge(&text));
    }
}
