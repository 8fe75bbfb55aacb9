//! Graph schema snapshots, recovered from console output.
//!
//! The schema of a graph is spread over several server replies: a structured
//! JSON schema with vertex/edge shapes, and the console listing of the `ls`
//! command, which is the only place declarative statements, loading jobs,
//! data sources and uninstalled queries show up. This crate parses the console
//! text (`ls_text`, `principals`), merges it into one typed [`SchemaSnapshot`]
//! (`assembler`) and answers schema lookups on it (`model`).
//!
//! Nothing here performs I/O; collaborator replies arrive through
//! [`MetadataSource`].

pub mod assembler;
pub mod config;
pub mod error;
pub mod ls_text;
pub mod model;
pub mod principals;

pub use assembler::{build_snapshot, MetadataSource, SchemaAssembler, SharedSchema};
pub use config::SchemaConfig;
pub use error::{LsParseError, PrincipalParseError, SchemaError};
pub use ls_text::{merge_ls_output, scan_ls_output, BlockKind, LsBlock};
pub use model::{EdgeType, EndpointTypes, SchemaSnapshot, VertexType};
