use thiserror::Error;

/// Query output that is not shaped as an array of labelled frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("query output must be a JSON array of frames, found {found}")]
    NotAnArray { found: &'static str },

    #[error("output frame {frame} must be a JSON object, found {found}")]
    FrameNotObject { frame: usize, found: &'static str },
}
