//! Collaborator replies read from files.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tgadapt_schema::model::Udt;
use tgadapt_schema::MetadataSource;

/// Files standing in for a live server, one per reply.
#[derive(Debug, Clone, Args)]
pub struct SourceFiles {
    /// Structured schema JSON (`VertexTypes`, `EdgeTypes`, ...)
    #[arg(long)]
    pub base: PathBuf,
    /// Captured `ls` output
    #[arg(long)]
    pub ls: Option<PathBuf>,
    /// Directory of `SHOW QUERY` outputs, one `<query>.gsql` file per query
    #[arg(long)]
    pub queries: Option<PathBuf>,
    /// Dynamic endpoint map JSON
    #[arg(long)]
    pub endpoints: Option<PathBuf>,
    /// UDT list JSON
    #[arg(long)]
    pub udts: Option<PathBuf>,
    /// Captured `SHOW USER` output
    #[arg(long)]
    pub users: Option<PathBuf>,
    /// Captured `SHOW GROUP` output
    #[arg(long)]
    pub groups: Option<PathBuf>,
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

impl MetadataSource for SourceFiles {
    fn base_schema(&self) -> Result<Value> {
        read_json(&self.base)
    }

    fn ls_output(&self) -> Result<String> {
        match &self.ls {
            Some(path) => read_text(path),
            None => Ok(String::new()),
        }
    }

    fn query_detail(&self, query: &str) -> Result<String> {
        let dir = self
            .queries
            .as_ref()
            .ok_or_else(|| anyhow!("no --queries directory to look up `{query}` in"))?;
        read_text(&dir.join(format!("{query}.gsql")))
    }

    fn endpoints(&self) -> Result<Map<String, Value>> {
        match &self.endpoints {
            Some(path) => read_json(path),
            None => Ok(Map::new()),
        }
    }

    fn udts(&self) -> Result<Vec<Udt>> {
        match &self.udts {
            Some(path) => read_json(path),
            None => Ok(Vec::new()),
        }
    }

    fn show_users(&self) -> Result<Option<String>> {
        self.users.as_deref().map(read_text).transpose()
    }

    fn show_groups(&self) -> Result<Option<String>> {
        self.groups.as_deref().map(read_text).transpose()
    }
}
