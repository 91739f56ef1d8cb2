use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ExecutorError {
    #[error("Local command error: {0}")]
    LocalError(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("File access error on {path}: {message}", path = .path.display())]
    FileAccess { path: PathBuf, message: String },

    #[error("Generic executor error: {0}")]
    Other(String),
}
