//! tgadapt CLI
//!
//! Offline front end for the adapter core:
//! - `schema`: assemble a schema snapshot from captured server replies
//! - `results`: decode and deduplicate installed-query output
//! - `describe`: summarize a snapshot

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tgadapt_results::{parse_query_output, EdgeCatalog, NoSchema};
use tgadapt_schema::{SchemaAssembler, SchemaConfig, SchemaSnapshot};
use tracing::Level;

mod describe;
mod source;

use source::{read_json, SourceFiles};

#[derive(Parser)]
#[command(name = "tgadapt")]
#[command(author, version, about = "TigerGraph schema and query output adapter")]
struct Cli {
    /// More logging on stderr (-v debug, -vv trace); `TGADAPT_LOG` sets the level otherwise
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a schema snapshot and print it as JSON.
    ///
    /// `TG_GRAPHNAME`, `TGADAPT_FULL_SCHEMA` and `TGADAPT_PRINCIPALS` set the
    /// defaults; flags override them.
    Schema {
        #[command(flatten)]
        files: SourceFiles,
        /// Active graph name
        #[arg(long)]
        graph: Option<String>,
        /// Load only the structured base schema
        #[arg(long)]
        base_only: bool,
        /// Skip users and groups
        #[arg(long)]
        no_principals: bool,
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Decode query output JSON into deduplicated vertices, edges and other output.
    Results {
        /// Query output JSON (array of frames)
        input: PathBuf,
        /// Snapshot JSON used to attach reverse edge names
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Leave out non-graph output
        #[arg(long)]
        graph_only: bool,
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Summarize the vertex and edge types of a snapshot.
    Describe {
        /// Snapshot JSON, as written by `tgadapt schema`
        snapshot: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Schema {
            files,
            graph,
            base_only,
            no_principals,
            out,
        } => {
            let mut config = SchemaConfig::from_env();
            if let Some(graph) = graph {
                config.graph_name = graph;
            }
            if base_only {
                config.full = false;
            }
            if no_principals {
                config.include_principals = false;
            }
            cmd_schema(files, config, out.as_deref())?;
        }
        Commands::Results {
            input,
            schema,
            graph_only,
            out,
        } => {
            cmd_results(&input, schema.as_deref(), graph_only, out.as_deref())?;
        }
        Commands::Describe { snapshot } => {
            let snapshot: SchemaSnapshot = read_json(&snapshot)?;
            describe::print_summary(&snapshot);
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => std::env::var("TGADAPT_LOG")
            .ok()
            .and_then(|v| v.parse::<Level>().ok())
            .unwrap_or(Level::WARN),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn cmd_schema(files: SourceFiles, config: SchemaConfig, out: Option<&Path>) -> Result<()> {
    let graph = config.graph_name.clone();
    let mut assembler = SchemaAssembler::new(files, config);
    let snapshot = assembler.ensure_loaded(false)?;

    write_json(&serde_json::to_value(&*snapshot)?, out)?;
    eprintln!(
        "{} schema for {} (vertex types={} edge types={} queries={})",
        "ok".green().bold(),
        graph.bold(),
        snapshot.vertex_types.len(),
        snapshot.edge_types.len(),
        snapshot.queries.len()
    );
    Ok(())
}

fn cmd_results(
    input: &Path,
    schema: Option<&Path>,
    graph_only: bool,
    out: Option<&Path>,
) -> Result<()> {
    let output: Value = read_json(input)?;
    let catalog: Box<dyn EdgeCatalog> = match schema {
        Some(path) => Box::new(read_json::<SchemaSnapshot>(path)?),
        None => Box::new(NoSchema),
    };
    let parsed = parse_query_output(&output, catalog.as_ref())
        .with_context(|| format!("cannot decode {}", input.display()))?;

    write_json(&parsed.to_json(graph_only)?, out)?;
    eprintln!(
        "{} vertices={} edges={} other={}",
        "ok".green().bold(),
        parsed.vertex_count(),
        parsed.edge_count(),
        parsed.other.len()
    );
    Ok(())
}

fn write_json(value: &Value, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            fs::write(path, text + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
        }
        None => println!("{text}"),
    }
    Ok(())
}
