//! Assembler configuration.

use serde::{Deserialize, Serialize};

/// What to load on a refresh, and for which graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Active graph; used for `GRANT` statements, endpoint filtering and
    /// principal roles.
    pub graph_name: String,
    /// Also load loading jobs, queries, UDTs, data sources and graphs. When
    /// false only the structured base schema is loaded.
    pub full: bool,
    /// Also load users and groups (requires `full`).
    pub include_principals: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            graph_name: "MyGraph".to_string(),
            full: true,
            include_principals: true,
        }
    }
}

impl SchemaConfig {
    pub fn for_graph(graph_name: impl Into<String>) -> Self {
        Self {
            graph_name: graph_name.into(),
            ..Self::default()
        }
    }

    /// Load from environment variables, falling back to [`Default`].
    ///
    /// - `TG_GRAPHNAME`: active graph
    /// - `TGADAPT_FULL_SCHEMA`: `0`/`false` for base schema only
    /// - `TGADAPT_PRINCIPALS`: `0`/`false` to skip users and groups
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            graph_name: std::env::var("TG_GRAPHNAME").unwrap_or(defaults.graph_name),
            full: env_flag("TGADAPT_FULL_SCHEMA").unwrap_or(defaults.full),
            include_principals: env_flag("TGADAPT_PRINCIPALS")
                .unwrap_or(defaults.include_principals),
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
