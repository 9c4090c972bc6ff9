//! `tabula-engine` — tabular storage for reconciliation operations.
//!
//! Columns, rows and immutable cells, the reconciliation records cells carry,
//! and the row selection operations are scoped by.

pub mod cell;
pub mod columns;
pub mod error;
pub mod filter;
pub mod recon;
pub mod table;

pub use cell::{Cell, CellValue};
pub use columns::ColumnsDiff;
pub use error::{EngineError, EngineResult};
pub use filter::{AllRows, EngineConfig, Facet, RowSelector};
pub use recon::{Judgment, Recon, ReconCandidate, ReconConfig, ReconId, ReconStats};
pub use table::{CellStore, Column, ColumnModel, ColumnReconState, Row, Table};
