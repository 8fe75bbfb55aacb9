use crate::ls_text::BlockKind;
use thiserror::Error;

/// A listing block did not have the shape its header promised.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LsParseError {
    #[error("parse error on line {line} ({block} block): {message}")]
    Structure {
        line: usize,
        block: BlockKind,
        message: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrincipalParseError {
    #[error("parse error on line {line} (SHOW {listing}): {message}")]
    Line {
        line: usize,
        listing: &'static str,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Listing(#[from] LsParseError),

    #[error(transparent)]
    Principals(#[from] PrincipalParseError),

    /// A collaborator (metadata endpoint, query client) failed.
    #[error("{call} failed: {source}")]
    Source {
        call: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("base schema is not a schema object: {0}")]
    BaseSchema(#[from] serde_json::Error),

    #[error("malformed endpoint `{endpoint}`: {message}")]
    Endpoint { endpoint: String, message: String },

    #[error("invalid endpoint filter: {0}")]
    EndpointFilter(#[from] regex::Error),
}

impl SchemaError {
    pub(crate) fn collaborator(call: impl Into<String>, err: anyhow::Error) -> Self {
        SchemaError::Source {
            call: call.into(),
            source: err.into(),
        }
    }
}
