//! Error taxonomy for the interactive session coordinator (§7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InteractiveError>;

#[derive(Error, Debug)]
pub enum InteractiveError {
    #[error("session {0} not found")]
    SessionNotFound(uuid::Uuid),

    #[error("bad command: {0}")]
    BadCommand(String),

    #[error(transparent)]
    Container(#[from] sbx_container::ContainerError),

    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sbx_io::IoError> for InteractiveError {
    fn from(e: sbx_io::IoError) -> Self {
        match e {
            sbx_io::IoError::Io(e) => InteractiveError::Io(e),
            other => InteractiveError::BadCommand(other.to_string()),
        }
    }
}
