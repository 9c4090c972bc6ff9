use tabula_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// Target column does not resolve in the table.
    #[error("column '{column}' not found")]
    MissingColumn { column: String },

    /// A journal entry no longer fits the table it is applied to.
    #[error("structural mismatch: {detail}")]
    StructuralMismatch { detail: String },

    /// Apply/revert requested from a state that does not allow it.
    #[error("journal for column '{column}' is {state}, cannot {action}")]
    InvalidState {
        column: String,
        state: String,
        action: &'static str,
    },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error.
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (config file read, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EngineError> for ReconError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::MissingColumn { column } => Self::MissingColumn { column },
            other => Self::StructuralMismatch {
                detail: other.to_string(),
            },
        }
    }
}

pub type ReconResult<T> = Result<T, ReconError>;
