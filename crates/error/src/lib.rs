
use std::path::Path;
use thiserror::Error;

/// EngineError enum
/// Every failure the engine reports, tagged with the kind of failure so that callers can tell a
/// missing asset apart from a broken one or from a GPU-side problem.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Missing resource: {0}")]
    MissingResource(String),
    #[error("Malformed data: {0}")]
    Malformed(String),
    #[error("Operation failed: {0}")]
    OpFailed(String),
    #[error("Not ready: {0}")]
    NotReady(String),
    #[error("Compatibility: {0}")]
    Compatibility(String),
    #[error("Configuration error: {0}")]
    Config(String)
}

impl EngineError {

    /// Translate an IO error raised while opening or reading a file. A missing file becomes
    /// MissingResource; anything else is reported as a failed operation.
    pub fn from_io(path: &Path, e: std::io::Error) -> EngineError {
        match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::MissingResource(
                format!("{}", path.display())),
            _ => EngineError::OpFailed(
                format!("Error reading {}: {}", path.display(), e))
        }
    }

    /// Prefix the message with where the failure happened, keeping the kind
    pub fn with_context(self, context: &str) -> EngineError {
        match self {
            EngineError::MissingResource(m) => EngineError::MissingResource(format!("{}: {}", context, m)),
            EngineError::Malformed(m) => EngineError::Malformed(format!("{}: {}", context, m)),
            EngineError::OpFailed(m) => EngineError::OpFailed(format!("{}: {}", context, m)),
            EngineError::NotReady(m) => EngineError::NotReady(format!("{}: {}", context, m)),
            EngineError::Compatibility(m) => EngineError::Compatibility(format!("{}: {}", context, m)),
            EngineError::Config(m) => EngineError::Config(format!("{}: {}", context, m))
        }
    }

    pub fn is_missing_resource(&self) -> bool {
        matches!(self, EngineError::MissingResource(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, EngineError::Malformed(_))
    }
}
