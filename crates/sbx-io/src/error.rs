//! Error taxonomy for the IO Core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Error, Debug)]
pub enum IoError {
    /// A base64 payload failed the strict alphabet/padding check.
    #[error("invalid base64 encoding")]
    InvalidEncoding,

    /// The sanitizer predicate rejected a file.
    #[error("unsafe source file {0:?}: {1}")]
    UnsafeSource(String, String),

    /// A filename attempted to escape the workspace root (absolute path or `..` segment).
    #[error("filename escapes workspace: {0:?}")]
    UnsafePath(String),

    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("invalid memory limit: {0}")]
    InvalidMemoryLimit(String),
}
