use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the frame pipeline and the container codec.
#[derive(Error, Debug)]
pub enum Error {
    /// A frame or container record could not be turned back into a usable value.
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    /// The input video does not exist.
    #[error("input source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The decoding subprocess could not be launched.
    #[error("failed to start {program}: {source}")]
    SubprocessStart {
        /// Executable that was launched.
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid settings or config file contents.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Error::DecodeFailure(msg.into())
    }
}
