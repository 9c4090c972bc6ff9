//! Engine error types.

use thiserror::Error;

/// Errors raised by the tabular storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A column name does not resolve in the column model.
    #[error("column '{column}' not found")]
    MissingColumn { column: String },

    /// A row/cell address no longer exists in the table.
    #[error("no cell at row {row}, cell index {cell_index}")]
    StructuralMismatch { row: usize, cell_index: usize },

    /// A column name is already taken.
    #[error("column '{column}' already exists")]
    DuplicateColumn { column: String },

    /// CSV import error.
    #[error("CSV error: {0}")]
    Csv(String),
}

impl EngineError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
