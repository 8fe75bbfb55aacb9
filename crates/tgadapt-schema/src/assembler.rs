//! Schema assembly.
//!
//! A snapshot is assembled from several collaborator replies:
//!
//! ```text
//!   base schema JSON ──► SchemaSnapshot (vertex/edge shapes)
//!   UDT list         ──► UDTs (fields)
//!   `ls` text        ──► statements, indexes, jobs, queries, data sources, graphs
//!   SHOW QUERY text  ──► query statements
//!   endpoints        ──► query parameters, REST endpoint and method
//!   SHOW USER/GROUP  ──► users and groups
//! ```
//!
//! [`SchemaAssembler`] owns the resulting snapshot and hands out `Arc`s, so a
//! reader keeps a consistent view while a refresh builds its replacement.
//! Synchronization is up to the caller; [`SharedSchema`] is a ready-made
//! mutex boundary.

use crate::config::SchemaConfig;
use crate::error::SchemaError;
use crate::ls_text::merge_ls_output;
use crate::model::{SchemaSnapshot, Udt};
use crate::principals::{parse_show_group, parse_show_user};
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// The replies the assembler consumes, as plain data.
///
/// Transport (HTTP, auth, the query-language client) lives behind this trait.
pub trait MetadataSource {
    /// Structured schema JSON (`VertexTypes`, `EdgeTypes`, ...).
    fn base_schema(&self) -> anyhow::Result<Value>;

    /// Output of the `ls` command.
    fn ls_output(&self) -> anyhow::Result<String>;

    /// Output of `SHOW QUERY <query>`.
    fn query_detail(&self, query: &str) -> anyhow::Result<String>;

    /// Dynamically generated endpoints, keyed by `"<METHOD> <path>"`.
    fn endpoints(&self) -> anyhow::Result<Map<String, Value>>;

    fn udts(&self) -> anyhow::Result<Vec<Udt>> {
        Ok(Vec::new())
    }

    /// Output of `SHOW USER`, if the source can provide it.
    fn show_users(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Output of `SHOW GROUP`, if the source can provide it.
    fn show_groups(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

impl<T: MetadataSource + ?Sized> MetadataSource for &T {
    fn base_schema(&self) -> anyhow::Result<Value> {
        (**self).base_schema()
    }
    fn ls_output(&self) -> anyhow::Result<String> {
        (**self).ls_output()
    }
    fn query_detail(&self, query: &str) -> anyhow::Result<String> {
        (**self).query_detail(query)
    }
    fn endpoints(&self) -> anyhow::Result<Map<String, Value>> {
        (**self).endpoints()
    }
    fn udts(&self) -> anyhow::Result<Vec<Udt>> {
        (**self).udts()
    }
    fn show_users(&self) -> anyhow::Result<Option<String>> {
        (**self).show_users()
    }
    fn show_groups(&self) -> anyhow::Result<Option<String>> {
        (**self).show_groups()
    }
}

// ============================================================================
// Assembler
// ============================================================================

pub struct SchemaAssembler<S> {
    source: S,
    config: SchemaConfig,
    snapshot: Option<Arc<SchemaSnapshot>>,
}

impl<S: MetadataSource> SchemaAssembler<S> {
    pub fn new(source: S, config: SchemaConfig) -> Self {
        Self {
            source,
            config,
            snapshot: None,
        }
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The current snapshot, if one has been loaded.
    pub fn get(&self) -> Option<Arc<SchemaSnapshot>> {
        self.snapshot.clone()
    }

    /// Drops the current snapshot; the next `ensure_loaded` rebuilds it.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    /// Returns the cached snapshot, or discards it and rebuilds when there is
    /// none or `force_refresh` is set. A failed rebuild leaves no snapshot.
    pub fn ensure_loaded(&mut self, force_refresh: bool) -> Result<Arc<SchemaSnapshot>, SchemaError> {
        if let Some(snapshot) = &self.snapshot {
            if !force_refresh {
                return Ok(Arc::clone(snapshot));
            }
        }

        self.snapshot = None;
        let snapshot = Arc::new(build_snapshot(&self.source, &self.config)?);
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

/// Builds a fresh snapshot from `source`.
pub fn build_snapshot<S: MetadataSource + ?Sized>(
    source: &S,
    config: &SchemaConfig,
) -> Result<SchemaSnapshot, SchemaError> {
    let graph = config.graph_name.as_str();
    debug!(graph, full = config.full, "assembling schema snapshot");

    let base = source
        .base_schema()
        .map_err(|err| SchemaError::collaborator("base schema", err))?;
    let mut snapshot: SchemaSnapshot = serde_json::from_value(base)?;
    if snapshot.graph_name.is_none() {
        snapshot.graph_name = Some(config.graph_name.clone());
    }
    if !config.full {
        return Ok(snapshot);
    }

    let udts = source
        .udts()
        .map_err(|err| SchemaError::collaborator("UDT list", err))?;
    snapshot.udts.extend(udts);

    let listing = source
        .ls_output()
        .map_err(|err| SchemaError::collaborator("ls", err))?;
    merge_ls_output(&mut snapshot, &listing, graph, |query| source.query_detail(query))?;

    let endpoints = source
        .endpoints()
        .map_err(|err| SchemaError::collaborator("endpoint list", err))?;
    let endpoints = filter_query_endpoints(endpoints, graph)?;
    attach_query_endpoints(&mut snapshot, &endpoints)?;

    if config.include_principals {
        if let Some(text) = source
            .show_users()
            .map_err(|err| SchemaError::collaborator("SHOW USER", err))?
        {
            snapshot.users = parse_show_user(&text, graph)?;
        }
        if let Some(text) = source
            .show_groups()
            .map_err(|err| SchemaError::collaborator("SHOW GROUP", err))?
        {
            snapshot.groups = parse_show_group(&text, graph)?;
        }
    }

    debug!(
        graph,
        vertex_types = snapshot.vertex_types.len(),
        edge_types = snapshot.edge_types.len(),
        queries = snapshot.queries.len(),
        loading_jobs = snapshot.loading_jobs.len(),
        "schema snapshot assembled"
    );
    Ok(snapshot)
}

/// Keeps the endpoints generated for installed queries of `graph_name`
/// (`GET /query/<graph>/...`).
pub fn filter_query_endpoints(
    endpoints: Map<String, Value>,
    graph_name: &str,
) -> Result<Map<String, Value>, SchemaError> {
    let pattern = Regex::new(&format!("^GET /query/{}/", regex::escape(graph_name)))?;
    Ok(endpoints
        .into_iter()
        .filter(|(key, _)| pattern.is_match(key))
        .collect())
}

/// Attaches parameters, path and method of each query endpoint to its query.
///
/// The target query is the default of the endpoint's `query` parameter; a
/// query not yet in the snapshot gets a stub entry.
pub fn attach_query_endpoints(
    snapshot: &mut SchemaSnapshot,
    endpoints: &Map<String, Value>,
) -> Result<(), SchemaError> {
    for (key, definition) in endpoints {
        let malformed = |message: &str| SchemaError::Endpoint {
            endpoint: key.clone(),
            message: message.to_string(),
        };

        let (method, path) = key
            .split_once(' ')
            .ok_or_else(|| malformed("expected `<METHOD> <path>`"))?;
        let mut parameters = definition
            .get("parameters")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| malformed("no `parameters` object"))?;
        let name = parameters
            .get("query")
            .and_then(|q| q.get("default"))
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("no default for the `query` parameter"))?
            .to_string();
        parameters.remove("query");

        if snapshot.query(&name).is_none() {
            debug!(query = %name, "endpoint for a query missing from the listing");
        }
        let query = snapshot.query_or_insert(&name);
        query.parameters = Some(parameters);
        query.endpoint = Some(path.to_string());
        query.method = Some(method.to_string());
    }
    Ok(())
}

// ============================================================================
// Shared access
// ============================================================================

/// An assembler behind a mutex: refreshes are serialized and readers never
/// observe a half-built snapshot.
pub struct SharedSchema<S> {
    inner: Arc<Mutex<SchemaAssembler<S>>>,
}

impl<S> Clone for SharedSchema<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: MetadataSource> SharedSchema<S> {
    pub fn new(assembler: SchemaAssembler<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(assembler)),
        }
    }

    pub fn ensure_loaded(&self, force_refresh: bool) -> Result<Arc<SchemaSnapshot>, SchemaError> {
        self.inner.lock().ensure_loaded(force_refresh)
    }

    pub fn get(&self) -> Option<Arc<SchemaSnapshot>> {
        self.inner.lock().get()
    }

    pub fn invalidate(&self) {
        self.inner.lock().invalidate();
    }
}
