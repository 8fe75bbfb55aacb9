//! Parser for the `ls` schema listing.
//!
//! The listing is console text without a formal grammar. Blocks are recognized
//! by their header line and end at a blank line (lists) or at the next header
//! (loading jobs). A single cursor walks an immutable line array forward; each
//! block extractor is a pure function `(lines, start) -> (record, next)`, where
//! `next` is the first line the extractor did not consume.
//!
//! Recognized headers, in priority order:
//!
//! ```text
//!   - VERTEX Person(...)                  vertex statement
//!   - DIRECTED EDGE Follows(...)          edge statement (also UNDIRECTED)
//! Indexes:                                `name:Vertex(attr)` list
//!   - CREATE LOADING JOB job FOR GRAPH g  job body up to the next `  - CREATE` / `Queries`
//! Queries:                                `name(params)` list
//! User defined tuples:                    `name(fields)` list
//! Data Sources:                           `kind name details` list
//!   - Graph g(V:v, E:e)                   graph statement
//! ```
//!
//! Everything else (schema change jobs, comments, section titles) is skipped.

use crate::error::{LsParseError, SchemaError};
use crate::model::{
    DataSource, EdgeType, GraphDef, IndexDef, LoadingJob, Name, QueryDef, SchemaSnapshot, Udt,
    VertexType,
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::char as pchar,
    sequence::{preceded, terminated, tuple},
    IResult,
};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Width of the `"  - "` list item marker.
const ITEM_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Vertex,
    Edge,
    Index,
    LoadingJob,
    Query,
    Udt,
    DataSource,
    Graph,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Vertex => "vertex",
            BlockKind::Edge => "edge",
            BlockKind::Index => "index",
            BlockKind::LoadingJob => "loading job",
            BlockKind::Query => "query",
            BlockKind::Udt => "user defined tuple",
            BlockKind::DataSource => "data source",
            BlockKind::Graph => "graph",
        };
        f.write_str(name)
    }
}

/// A recognized block of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LsBlock {
    Vertex { name: Name, statement: String },
    Edge { name: Name, statement: String },
    Indexes(Vec<IndexDef>),
    LoadingJob(LoadingJob),
    Queries(Vec<QueryListing>),
    Udts(Vec<UdtListing>),
    DataSources(Vec<DataSource>),
    Graph(GraphDef),
}

/// A query as listed; its text is fetched separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryListing {
    pub name: Name,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdtListing {
    pub name: Name,
    pub statement: String,
}

type Extracted<T> = Result<(T, usize), LsParseError>;

// ============================================================================
// Scanner
// ============================================================================

/// Splits the listing into recognized blocks without touching any snapshot.
pub fn scan_ls_output(text: &str, graph_name: &str) -> Result<Vec<LsBlock>, LsParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();

    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i];
        let header = line.trim_end();

        let (block, next) = if line.starts_with("  - VERTEX") {
            let ((name, statement), next) = extract_vertex(&lines, i)?;
            (LsBlock::Vertex { name, statement }, next)
        } else if line.starts_with("  - DIRECTED") || line.starts_with("  - UNDIRECTED") {
            let ((name, statement), next) = extract_edge(&lines, i)?;
            (LsBlock::Edge { name, statement }, next)
        } else if header == "Indexes:" {
            let (indexes, next) = extract_indexes(&lines, i)?;
            (LsBlock::Indexes(indexes), next)
        } else if line.starts_with("  - CREATE LOADING JOB") {
            let (job, next) = extract_loading_job(&lines, i)?;
            (LsBlock::LoadingJob(job), next)
        } else if header == "Queries:" {
            let (queries, next) = extract_queries(&lines, i)?;
            (LsBlock::Queries(queries), next)
        } else if header == "User defined tuples:" {
            let (udts, next) = extract_udts(&lines, i)?;
            (LsBlock::Udts(udts), next)
        } else if header == "Data Sources:" {
            let (sources, next) = extract_data_sources(&lines, i, graph_name)?;
            (LsBlock::DataSources(sources), next)
        } else if line.starts_with("  - Graph") {
            let (graph, next) = extract_graph(&lines, i)?;
            (LsBlock::Graph(graph), next)
        } else {
            i += 1;
            continue;
        };

        debug!(line = i + 1, ?block, "ls block");
        blocks.push(block);
        i = next;
    }

    Ok(blocks)
}

/// Parses the listing and merges it into `snapshot`.
///
/// `query_detail` returns the `SHOW QUERY` text for a query name. The listing is
/// scanned completely before anything is merged, so a malformed listing leaves
/// `snapshot` untouched.
pub fn merge_ls_output<F>(
    snapshot: &mut SchemaSnapshot,
    text: &str,
    graph_name: &str,
    mut query_detail: F,
) -> Result<(), SchemaError>
where
    F: FnMut(&str) -> anyhow::Result<String>,
{
    let blocks = scan_ls_output(text, graph_name)?;

    for block in blocks {
        match block {
            LsBlock::Vertex { name, statement } => match snapshot.vertex_type_mut(&name) {
                Some(vt) => vt.statement = Some(statement),
                None => {
                    warn!(vertex = %name, "vertex type listed but absent from base schema");
                    snapshot.vertex_types.push(VertexType {
                        name,
                        statement: Some(statement),
                        ..VertexType::default()
                    });
                }
            },
            LsBlock::Edge { name, statement } => match snapshot.edge_type_mut(&name) {
                Some(et) => et.statement = Some(statement),
                None => {
                    warn!(edge = %name, "edge type listed but absent from base schema");
                    snapshot.edge_types.push(EdgeType {
                        name,
                        statement: Some(statement),
                        ..EdgeType::default()
                    });
                }
            },
            LsBlock::Indexes(indexes) => {
                for index in indexes {
                    if snapshot.vertex_type(&index.vertex).is_none() {
                        warn!(index = %index.name, vertex = %index.vertex, "index on unknown vertex type");
                    }
                    snapshot.indexes.push(index);
                }
            }
            LsBlock::LoadingJob(job) => snapshot.loading_jobs.push(job),
            LsBlock::Queries(listings) => {
                for listing in listings {
                    let detail = query_detail(&listing.name).map_err(|err| {
                        SchemaError::collaborator(format!("SHOW QUERY {}", listing.name), err)
                    })?;
                    let statement = normalize_query_text(&detail);
                    match snapshot.query_mut(&listing.name) {
                        Some(query) => {
                            query.statement = Some(statement);
                            query.deprecated = listing.deprecated;
                        }
                        // Created but not installed.
                        None => snapshot.queries.push(QueryDef {
                            name: listing.name,
                            statement: Some(statement),
                            deprecated: listing.deprecated,
                            ..QueryDef::default()
                        }),
                    }
                }
            }
            LsBlock::Udts(listings) => {
                for listing in listings {
                    match snapshot.udt_mut(&listing.name) {
                        Some(udt) => udt.statement = Some(listing.statement),
                        None => {
                            warn!(udt = %listing.name, "tuple listed but absent from UDT list");
                            snapshot.udts.push(Udt {
                                name: listing.name,
                                fields: Vec::new(),
                                statement: Some(listing.statement),
                            });
                        }
                    }
                }
            }
            LsBlock::DataSources(sources) => snapshot.data_sources.extend(sources),
            LsBlock::Graph(graph) => snapshot.graphs.push(graph),
        }
    }

    Ok(())
}

/// Drops everything up to the last `CREATE` of a `SHOW QUERY` reply, so only
/// the query definition itself remains.
pub fn normalize_query_text(detail: &str) -> String {
    static PREAMBLE: OnceLock<Regex> = OnceLock::new();
    let preamble =
        PREAMBLE.get_or_init(|| Regex::new(r"(?s)^.+CREATE").expect("static preamble regex"));
    let trimmed = detail.trim_end_matches([' ', '\r', '\n']);
    preamble.replace(trimmed, "CREATE").into_owned()
}

// ============================================================================
// Block extractors
// ============================================================================

pub fn extract_vertex(lines: &[&str], start: usize) -> Extracted<(Name, String)> {
    let body = drop_columns(lines[start], ITEM_WIDTH);
    let name = header_name(preceded(tag("VERTEX "), name_before_paren)(body))
        .ok_or_else(|| structure(start, BlockKind::Vertex, "expected `VERTEX <name>(`"))?;
    Ok(((name, format!("CREATE {body}")), start + 1))
}

pub fn extract_edge(lines: &[&str], start: usize) -> Extracted<(Name, String)> {
    let body = drop_columns(lines[start], ITEM_WIDTH);
    let name = header_name(preceded(
        tuple((alt((tag("DIRECTED"), tag("UNDIRECTED"))), tag(" EDGE "))),
        name_before_paren,
    )(body))
    .ok_or_else(|| structure(start, BlockKind::Edge, "expected `[UN]DIRECTED EDGE <name>(`"))?;
    Ok(((name, format!("CREATE {body}")), start + 1))
}

/// `Indexes:` followed by `  - name:Vertex(attribute)` lines.
pub fn extract_indexes(lines: &[&str], start: usize) -> Extracted<Vec<IndexDef>> {
    let (items, next) = list_items(lines, start);
    let mut indexes = Vec::with_capacity(items.len());
    for (line_index, item) in items {
        let parsed: IResult<&str, (&str, &str, &str)> = tuple((
            terminated(take_until(":"), pchar(':')),
            terminated(take_until("("), pchar('(')),
            terminated(take_until(")"), pchar(')')),
        ))(item);
        let (name, vertex, attribute) = match parsed {
            Ok((_, (n, v, a))) if !n.trim().is_empty() && !v.trim().is_empty() => {
                (n.trim(), v.trim(), a.trim())
            }
            _ => {
                return Err(structure(
                    line_index,
                    BlockKind::Index,
                    format!("expected `name:Vertex(attribute)`, got `{item}`"),
                ))
            }
        };
        indexes.push(IndexDef {
            name: name.to_string(),
            vertex: vertex.to_string(),
            attribute: attribute.to_string(),
            statement: format!("ALTER VERTEX {vertex} ADD INDEX {name} ON ({attribute})"),
        });
    }
    Ok((indexes, next))
}

/// A loading job runs until the next `  - CREATE ...` item or the `Queries`
/// section. The stop line is left for the caller.
pub fn extract_loading_job(lines: &[&str], start: usize) -> Extracted<LoadingJob> {
    let header = drop_columns(lines[start], ITEM_WIDTH);
    let name = header
        .split_whitespace()
        .nth(3)
        .ok_or_else(|| structure(start, BlockKind::LoadingJob, "loading job name missing"))?;

    let mut text = String::new();
    text.push_str(header);
    text.push('\n');

    let mut i = start + 1;
    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("  - CREATE") || line.starts_with("Queries") {
            break;
        }
        text.push_str(drop_columns(line, ITEM_WIDTH));
        text.push('\n');
        i += 1;
    }

    let job = LoadingJob {
        name: name.to_string(),
        statement: text.trim_end_matches([' ', '\n']).to_string(),
    };
    Ok((job, i))
}

/// `Queries:` followed by `  - name(params) ...` lines; a trailing
/// `(deprecated)` marks the query deprecated.
pub fn extract_queries(lines: &[&str], start: usize) -> Extracted<Vec<QueryListing>> {
    let (items, next) = list_items(lines, start);
    let mut queries = Vec::with_capacity(items.len());
    for (line_index, item) in items {
        let name = header_name(name_before_paren(item)).ok_or_else(|| {
            structure(
                line_index,
                BlockKind::Query,
                format!("expected `name(...)`, got `{item}`"),
            )
        })?;
        queries.push(QueryListing {
            name,
            deprecated: item.trim_end().ends_with("(deprecated)"),
        });
    }
    Ok((queries, next))
}

/// `User defined tuples:` followed by `  - name(field TYPE, ...)` lines.
pub fn extract_udts(lines: &[&str], start: usize) -> Extracted<Vec<UdtListing>> {
    let (items, next) = list_items(lines, start);
    let mut udts = Vec::with_capacity(items.len());
    for (line_index, item) in items {
        let item = item.trim_end();
        let (open, close) = match (item.find('('), item.rfind(')')) {
            (Some(open), Some(close)) if open < close => (open, close),
            _ => {
                return Err(structure(
                    line_index,
                    BlockKind::Udt,
                    format!("expected `name(fields)`, got `{item}`"),
                ))
            }
        };
        let name = item[..open].trim();
        if name.is_empty() {
            return Err(structure(line_index, BlockKind::Udt, "tuple name missing"));
        }
        let fields = &item[open + 1..close];
        udts.push(UdtListing {
            name: name.to_string(),
            statement: format!("TYPEDEF TUPLE <{fields}> {name}"),
        });
    }
    Ok((udts, next))
}

/// `Data Sources:` followed by `  - kind name (details)` lines.
pub fn extract_data_sources(
    lines: &[&str],
    start: usize,
    graph_name: &str,
) -> Extracted<Vec<DataSource>> {
    let (items, next) = list_items(lines, start);
    let mut sources = Vec::with_capacity(items.len());
    for (line_index, item) in items {
        let tokens: Vec<&str> = item.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(structure(
                line_index,
                BlockKind::DataSource,
                format!("expected `kind name details`, got `{item}`"),
            ));
        }
        let (kind, name) = (tokens[0], tokens[1]);
        let details = tokens[2..].join(" ");
        let config = details
            .trim_start_matches('(')
            .trim_end_matches(')')
            .replace('"', "'");
        sources.push(DataSource {
            name: name.to_string(),
            kind: kind.to_string(),
            statement: vec![
                format!(
                    "CREATE DATA_SOURCE {} {name} = \"{config}\"",
                    kind.to_uppercase()
                ),
                format!("GRANT DATA_SOURCE {name} TO GRAPH {graph_name}"),
            ],
            details,
        });
    }
    Ok((sources, next))
}

/// `  - Graph name(Vertex:v, Edge:e, ...)`.
pub fn extract_graph(lines: &[&str], start: usize) -> Extracted<GraphDef> {
    let rest = drop_columns(lines[start], "  - Graph ".len());
    let name = header_name(name_before_paren(rest))
        .ok_or_else(|| structure(start, BlockKind::Graph, "expected `Graph <name>(`"))?;
    let graph = GraphDef {
        name,
        statement: format!("CREATE GRAPH {}", rest.replace(":v", "").replace(":e", "")),
        text: rest.to_string(),
    };
    Ok((graph, start + 1))
}

// ============================================================================
// Helpers
// ============================================================================

/// Item lines following a list header, up to the first blank line (or end of
/// text). Returns `(line index, item without marker)` pairs and the index of the
/// terminating line.
fn list_items<'a>(lines: &[&'a str], header: usize) -> (Vec<(usize, &'a str)>, usize) {
    let mut items = Vec::new();
    let mut i = header + 1;
    while i < lines.len() && !lines[i].trim().is_empty() {
        items.push((i, drop_columns(lines[i], ITEM_WIDTH)));
        i += 1;
    }
    (items, i)
}

fn name_before_paren(input: &str) -> IResult<&str, &str> {
    terminated(take_until("("), pchar('('))(input)
}

fn header_name(parsed: IResult<&str, &str>) -> Option<Name> {
    parsed
        .ok()
        .map(|(_, name)| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// `line[n..]` counted in characters; empty when the line is shorter.
fn drop_columns(line: &str, n: usize) -> &str {
    match line.char_indices().nth(n) {
        Some((idx, _)) => &line[idx..],
        None => "",
    }
}

fn structure(line_index: usize, block: BlockKind, message: impl Into<String>) -> LsParseError {
    LsParseError::Structure {
        line: line_index + 1,
        block,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn vertex_header_yields_name_and_statement() {
        let l = lines("  - VERTEX Person(PRIMARY_ID id STRING, name STRING) WITH STATS=\"OUTDEGREE_BY_EDGETYPE\"");
        let ((name, statement), next) = extract_vertex(&l, 0).expect("vertex");
        assert_eq!(name, "Person");
        assert_eq!(
            statement,
            "CREATE VERTEX Person(PRIMARY_ID id STRING, name STRING) WITH STATS=\"OUTDEGREE_BY_EDGETYPE\""
        );
        assert_eq!(next, 1);
    }

    #[test]
    fn vertex_header_without_paren_is_a_structure_error() {
        let l = lines("  - VERTEX Person");
        let err = extract_vertex(&l, 0).expect_err("should error");
        assert!(matches!(
            err,
            LsParseError::Structure { line: 1, block: BlockKind::Vertex, .. }
        ));
    }

    #[test]
    fn edge_headers_directed_and_undirected() {
        let l = lines(
            "  - DIRECTED EDGE Follows(FROM Person, TO Person) WITH REVERSE_EDGE=\"reverse_Follows\"\n  - UNDIRECTED EDGE Knows(FROM Person, TO Person)",
        );
        let ((name, statement), _) = extract_edge(&l, 0).expect("directed");
        assert_eq!(name, "Follows");
        assert!(statement.starts_with("CREATE DIRECTED EDGE Follows("));
        let ((name, _), next) = extract_edge(&l, 1).expect("undirected");
        assert_eq!(name, "Knows");
        assert_eq!(next, 2);
    }

    #[test]
    fn index_list_stops_at_blank_line() {
        let l = lines("Indexes:\n  - idx1:Person(name)\n  - idx2:Post(title)\n\n  - VERTEX X(");
        let (indexes, next) = extract_indexes(&l, 0).expect("indexes");
        assert_eq!(next, 3);
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[1].vertex, "Post");
        assert_eq!(indexes[1].attribute, "title");
    }

    #[test]
    fn index_without_colon_reports_its_line() {
        let l = lines("Indexes:\n  - idx1:Person(name)\n  - broken\n");
        let err = extract_indexes(&l, 0).expect_err("should error");
        assert!(matches!(
            err,
            LsParseError::Structure { line: 3, block: BlockKind::Index, .. }
        ));
    }

    #[test]
    fn loading_job_leaves_stop_line_unconsumed() {
        let l = lines(
            "  - CREATE LOADING JOB load_people FOR GRAPH Social {\n      DEFINE FILENAME f1;\n      LOAD f1 TO VERTEX Person VALUES($0, $1);\n    }\n\n  - CREATE LOADING JOB load_posts FOR GRAPH Social {",
        );
        let (job, next) = extract_loading_job(&l, 0).expect("job");
        assert_eq!(job.name, "load_people");
        assert_eq!(next, 5);
        assert_eq!(
            job.statement,
            "CREATE LOADING JOB load_people FOR GRAPH Social {\n  DEFINE FILENAME f1;\n  LOAD f1 TO VERTEX Person VALUES($0, $1);\n}"
        );
    }

    #[test]
    fn loading_job_may_run_to_end_of_text() {
        let l = lines("  - CREATE LOADING JOB j FOR GRAPH g {\n    }");
        let (job, next) = extract_loading_job(&l, 0).expect("job");
        assert_eq!(next, 2);
        assert!(job.statement.ends_with('}'));
    }

    #[test]
    fn loading_job_stops_at_queries_header() {
        let text = "  - CREATE LOADING JOB j FOR GRAPH g {\n      DEFINE FILENAME f;\n    }\nQueries:\n  - q() (installed v2)\n";
        let blocks = scan_ls_output(text, "g").expect("scan");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            LsBlock::LoadingJob(job) => {
                assert_eq!(job.name, "j");
                assert!(!job.statement.contains("Queries"), "{}", job.statement);
                assert!(job.statement.ends_with('}'));
            }
            other => panic!("expected a loading job, got {other:?}"),
        }
        assert_eq!(
            blocks[1],
            LsBlock::Queries(vec![QueryListing { name: "q".into(), deprecated: false }])
        );
    }

    #[test]
    fn query_listing_flags_deprecated() {
        let l = lines("Queries:\n  - hello(VERTEX<Person> p) (installed v2)\n  - old_one() (deprecated)\n");
        let (queries, _) = extract_queries(&l, 0).expect("queries");
        assert_eq!(
            queries,
            vec![
                QueryListing { name: "hello".into(), deprecated: false },
                QueryListing { name: "old_one".into(), deprecated: true },
            ]
        );
    }

    #[test]
    fn udt_statement_uses_field_list() {
        let l = lines("User defined tuples:\n  - Pair(a INT, b STRING(10))\n");
        let (udts, _) = extract_udts(&l, 0).expect("udts");
        assert_eq!(udts[0].name, "Pair");
        assert_eq!(udts[0].statement, "TYPEDEF TUPLE <a INT, b STRING(10)> Pair");
    }

    #[test]
    fn data_source_statements() {
        let l = lines("Data Sources:\n  - s3 s3ds (\"file.reader.settings.fs.s3.access.key\":\"none\")\n");
        let (sources, _) = extract_data_sources(&l, 0, "Social").expect("sources");
        assert_eq!(sources[0].kind, "s3");
        assert_eq!(sources[0].name, "s3ds");
        assert_eq!(
            sources[0].statement,
            vec![
                "CREATE DATA_SOURCE S3 s3ds = \"'file.reader.settings.fs.s3.access.key':'none'\""
                    .to_string(),
                "GRANT DATA_SOURCE s3ds TO GRAPH Social".to_string(),
            ]
        );
    }

    #[test]
    fn data_source_with_two_tokens_is_rejected() {
        let l = lines("Data Sources:\n  - s3 s3ds\n");
        assert!(extract_data_sources(&l, 0, "g").is_err());
    }

    #[test]
    fn graph_statement_strips_kind_markers() {
        let l = lines("  - Graph Social(Person:v, Follows:e, reverse_Follows:e)");
        let (graph, _) = extract_graph(&l, 0).expect("graph");
        assert_eq!(graph.name, "Social");
        assert_eq!(graph.statement, "CREATE GRAPH Social(Person, Follows, reverse_Follows)");
        assert_eq!(graph.text, "Social(Person:v, Follows:e, reverse_Follows:e)");
    }

    #[test]
    fn query_preamble_is_replaced_by_create() {
        let detail = "Warning: something\nCREATE QUERY hello(VERTEX<Person> p) FOR GRAPH Social {\n  PRINT p;\n}\n \n";
        assert_eq!(
            normalize_query_text(detail),
            "CREATE QUERY hello(VERTEX<Person> p) FOR GRAPH Social {\n  PRINT p;\n}"
        );
    }

    #[test]
    fn query_text_with_crlf_endings_is_trimmed() {
        let detail = "Warning: x\r\nCREATE QUERY q1() {}\r\n";
        assert_eq!(normalize_query_text(detail), "CREATE QUERY q1() {}");
    }

    #[test]
    fn unrecognized_lines_are_skipped() {
        let blocks = scan_ls_output("---- Graph Social\nVertex Types:\n# comment\n\n", "Social")
            .expect("scan");
        assert!(blocks.is_empty());
    }
}
