//! Column model, rows and the table that stores them.
//!
//! Columns map a name to a stable `cell_index`. Rows store cells by that
//! index, so renaming or reordering columns never moves cell data. A row
//! slot is `None` when no cell was ever assigned there, which is distinct
//! from a present cell holding an empty value.

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellValue};
use crate::error::{EngineError, EngineResult};
use crate::recon::{ReconConfig, ReconStats};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cell_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recon_config: Option<ReconConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recon_stats: Option<ReconStats>,
}

impl Column {
    pub fn new(name: impl Into<String>, cell_index: usize) -> Self {
        Self {
            name: name.into(),
            cell_index,
            recon_config: None,
            recon_stats: None,
        }
    }

    pub fn recon_state(&self) -> ColumnReconState {
        ColumnReconState {
            config: self.recon_config.clone(),
            stats: self.recon_stats,
        }
    }
}

/// Reconciliation config and stats of one column, captured or restored as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReconState {
    pub config: Option<ReconConfig>,
    pub stats: Option<ReconStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnModel {
    columns: Vec<Column>,
    next_cell_index: usize,
}

impl ColumnModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Append a column and allocate its cell index.
    pub fn add_column(&mut self, name: &str) -> EngineResult<usize> {
        if self.column_by_name(name).is_some() {
            return Err(EngineError::DuplicateColumn {
                column: name.to_string(),
            });
        }
        let cell_index = self.next_cell_index;
        self.next_cell_index += 1;
        self.columns.push(Column::new(name, cell_index));
        Ok(cell_index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_by_name_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_cell_index(&self, cell_index: usize) -> bool {
        self.columns.iter().any(|c| c.cell_index == cell_index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Option<Cell>>,
}

impl Row {
    pub fn new(mut cells: Vec<Option<Cell>>) -> Self {
        // Trailing empty slots carry no information; keep rows canonical.
        while matches!(cells.last(), Some(None)) {
            cells.pop();
        }
        Self { cells }
    }

    pub fn get_cell(&self, cell_index: usize) -> Option<&Cell> {
        self.cells.get(cell_index).and_then(|c| c.as_ref())
    }

    /// Copy of this row with one slot replaced.
    pub fn with_cell(&self, cell_index: usize, cell: Option<Cell>) -> Row {
        let mut cells = self.cells.clone();
        if cells.len() <= cell_index {
            cells.resize(cell_index + 1, None);
        }
        cells[cell_index] = cell;
        Row::new(cells)
    }
}

/// Narrow storage interface used by change journals.
///
/// `replace_cell` must be atomic per row: either the row is swapped for a
/// copy with the new cell, or nothing changes.
pub trait CellStore {
    fn cell_index(&self, column_name: &str) -> Option<usize>;

    fn get_cell(&self, row: usize, cell_index: usize) -> Option<&Cell>;

    fn replace_cell(&mut self, row: usize, cell_index: usize, cell: Option<Cell>) -> EngineResult<()>;

    fn column_recon_state(&self, column_name: &str) -> Option<ColumnReconState>;

    fn set_column_recon_state(&mut self, column_name: &str, state: ColumnReconState) -> EngineResult<()>;

    fn compute_recon_stats(&self, cell_index: usize) -> ReconStats;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: ColumnModel,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: ColumnModel::new(),
            rows: Vec::new(),
        }
    }

    /// Table with the given columns and no rows.
    pub fn with_columns(name: impl Into<String>, column_names: &[&str]) -> EngineResult<Self> {
        let mut table = Self::new(name);
        for column in column_names {
            table.columns.add_column(column)?;
        }
        Ok(table)
    }

    /// Load a table from CSV text. The first record is the header.
    ///
    /// Empty fields become absent cells.
    pub fn from_csv(name: impl Into<String>, data: &str) -> EngineResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| EngineError::Csv(e.to_string()))?
            .clone();
        let names: Vec<&str> = headers.iter().collect();
        let mut table = Self::with_columns(name, &names)?;

        for record in reader.records() {
            let record = record.map_err(|e| EngineError::Csv(e.to_string()))?;
            let values = record.iter().map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(CellValue::from_input(field))
                }
            });
            table.push_values(values);
        }
        Ok(table)
    }

    /// Append a row whose slots follow cell-index order.
    pub fn push_values(&mut self, values: impl IntoIterator<Item = Option<CellValue>>) -> usize {
        let cells = values.into_iter().map(|v| v.map(Cell::new)).collect();
        self.push_row(Row::new(cells))
    }

    pub fn push_row(&mut self, row: Row) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows.get(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = (usize, &Row)> + '_ {
        self.rows.iter().enumerate()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.column_by_name(name)
    }

    /// Resolve a column name, failing with `MissingColumn`.
    pub fn require_column(&self, name: &str) -> EngineResult<&Column> {
        self.column_by_name(name)
            .ok_or_else(|| EngineError::missing_column(name))
    }

    /// Swap a whole row, returning the previous one.
    pub fn replace_row(&mut self, row: usize, new_row: Row) -> EngineResult<Row> {
        match self.rows.get_mut(row) {
            Some(slot) => Ok(std::mem::replace(slot, new_row)),
            None => Err(EngineError::StructuralMismatch { row, cell_index: 0 }),
        }
    }
}

impl CellStore for Table {
    fn cell_index(&self, column_name: &str) -> Option<usize> {
        self.column_by_name(column_name).map(|c| c.cell_index)
    }

    fn get_cell(&self, row: usize, cell_index: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get_cell(cell_index))
    }

    fn replace_cell(&mut self, row: usize, cell_index: usize, cell: Option<Cell>) -> EngineResult<()> {
        if !self.columns.has_cell_index(cell_index) {
            return Err(EngineError::StructuralMismatch { row, cell_index });
        }
        let new_row = match self.rows.get(row) {
            Some(r) => r.with_cell(cell_index, cell),
            None => return Err(EngineError::StructuralMismatch { row, cell_index }),
        };
        self.replace_row(row, new_row)?;
        Ok(())
    }

    fn column_recon_state(&self, column_name: &str) -> Option<ColumnReconState> {
        self.column_by_name(column_name).map(Column::recon_state)
    }

    fn set_column_recon_state(&mut self, column_name: &str, state: ColumnReconState) -> EngineResult<()> {
        let column = self
            .columns
            .column_by_name_mut(column_name)
            .ok_or_else(|| EngineError::missing_column(column_name))?;
        column.recon_config = state.config;
        column.recon_stats = state.stats;
        Ok(())
    }

    fn compute_recon_stats(&self, cell_index: usize) -> ReconStats {
        ReconStats::from_cells(self.rows.iter().map(|r| r.get_cell(cell_index)))
    }
}
