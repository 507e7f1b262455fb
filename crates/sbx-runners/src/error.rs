//! Error taxonomy for the language runners (§7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("invalid base64 encoding")]
    InvalidEncoding,

    #[error("unsafe source file: {0}")]
    UnsafeSource(String),

    #[error(transparent)]
    Container(#[from] sbx_container::ContainerError),

    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact retrieval failed: {0}")]
    ArtifactRetrieval(String),
}

impl From<sbx_io::IoError> for RunnerError {
    fn from(e: sbx_io::IoError) -> Self {
        match e {
            sbx_io::IoError::InvalidEncoding => RunnerError::InvalidEncoding,
            sbx_io::IoError::UnsafeSource(name, reason) => {
                RunnerError::UnsafeSource(format!("{name}: {reason}"))
            }
            sbx_io::IoError::UnsafePath(name) => RunnerError::UnsafeSource(name),
            sbx_io::IoError::Io(e) => RunnerError::Io(e),
            sbx_io::IoError::Archive(msg) => RunnerError::ArtifactRetrieval(msg),
            sbx_io::IoError::InvalidMemoryLimit(msg) => RunnerError::ArtifactRetrieval(msg),
        }
    }
}
