//! Reversible record of a batch reconciliation change.
//!
//! A [`ReconJournal`] holds one [`CellChange`] per touched cell, in the order
//! rows were visited, plus the recon config the column ends up with. Old and
//! new cells are full snapshots, so applying writes fixed data and reverting
//! restores the table exactly.
//!
//! # States
//!
//! ```text
//! Pending --apply--> Applied --revert--> Reverted --apply--> Applied
//!                     |   ^
//!                     +---+ apply (idempotent)
//! ```
//!
//! The column's previous recon config/stats are captured on the transition
//! into `Applied` and restored on revert. Re-applying an applied journal
//! rewrites the same cells and keeps the captured state.

use serde::{Deserialize, Serialize};
use tabula_engine::table::ColumnReconState;
use tabula_engine::{Cell, CellStore, ReconConfig, ReconStats};
use tracing::{info, warn};

use crate::error::{ReconError, ReconResult};

/// One before/after cell mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellChange {
    pub row: usize,
    pub cell_index: usize,
    pub old_cell: Option<Cell>,
    pub new_cell: Option<Cell>,
}

impl CellChange {
    pub fn new(row: usize, cell_index: usize, old_cell: Option<Cell>, new_cell: Option<Cell>) -> Self {
        Self {
            row,
            cell_index,
            old_cell,
            new_cell,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalState {
    #[default]
    Pending,
    Applied,
    Reverted,
}

impl std::fmt::Display for JournalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Applied => write!(f, "applied"),
            Self::Reverted => write!(f, "reverted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconJournal {
    changes: Vec<CellChange>,
    column_name: String,
    new_recon_config: ReconConfig,
    #[serde(default)]
    new_recon_stats: Option<ReconStats>,
    #[serde(default)]
    old_column_state: Option<ColumnReconState>,
    #[serde(default)]
    state: JournalState,
}

impl ReconJournal {
    pub fn new(changes: Vec<CellChange>, column_name: impl Into<String>, new_recon_config: ReconConfig) -> Self {
        Self {
            changes,
            column_name: column_name.into(),
            new_recon_config,
            new_recon_stats: None,
            old_column_state: None,
            state: JournalState::Pending,
        }
    }

    pub fn changes(&self) -> &[CellChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// Recon config the column carries once applied.
    pub fn recon_config(&self) -> &ReconConfig {
        &self.new_recon_config
    }

    pub fn state(&self) -> JournalState {
        self.state
    }

    /// Write every new cell, in journal order.
    ///
    /// Stops at the first entry that does not fit the store. Entries written
    /// before the failure stay written; undoing them is the caller's job.
    pub fn apply<S: CellStore + ?Sized>(&mut self, store: &mut S) -> ReconResult<()> {
        let cell_index = self.resolve_column(store, "apply")?;

        let old_state = if self.state == JournalState::Applied {
            None
        } else {
            store.column_recon_state(&self.column_name)
        };

        for change in &self.changes {
            store
                .replace_cell(change.row, change.cell_index, change.new_cell.clone())
                .map_err(|e| {
                    warn!(column = %self.column_name, row = change.row, error = %e, "journal apply aborted");
                    ReconError::from(e)
                })?;
        }

        let stats = *self
            .new_recon_stats
            .get_or_insert_with(|| store.compute_recon_stats(cell_index));
        store.set_column_recon_state(
            &self.column_name,
            ColumnReconState {
                config: Some(self.new_recon_config.clone()),
                stats: Some(stats),
            },
        )?;

        if let Some(old_state) = old_state {
            self.old_column_state = Some(old_state);
        }
        self.state = JournalState::Applied;
        info!(column = %self.column_name, changes = self.changes.len(), "journal applied");
        Ok(())
    }

    /// Write every old cell back and restore the column's recon state.
    pub fn revert<S: CellStore + ?Sized>(&mut self, store: &mut S) -> ReconResult<()> {
        if self.state != JournalState::Applied {
            return Err(ReconError::InvalidState {
                column: self.column_name.clone(),
                state: self.state.to_string(),
                action: "revert",
            });
        }
        self.resolve_column(store, "revert")?;

        for change in self.changes.iter().rev() {
            store
                .replace_cell(change.row, change.cell_index, change.old_cell.clone())
                .map_err(|e| {
                    warn!(column = %self.column_name, row = change.row, error = %e, "journal revert aborted");
                    ReconError::from(e)
                })?;
        }

        store.set_column_recon_state(&self.column_name, self.old_column_state.clone().unwrap_or_default())?;
        self.state = JournalState::Reverted;
        info!(column = %self.column_name, changes = self.changes.len(), "journal reverted");
        Ok(())
    }

    fn resolve_column<S: CellStore + ?Sized>(&self, store: &S, action: &str) -> ReconResult<usize> {
        store.cell_index(&self.column_name).ok_or_else(|| {
            warn!(column = %self.column_name, action, "journal column missing");
            ReconError::StructuralMismatch {
                detail: format!("column '{}' no longer exists", self.column_name),
            }
        })
    }

    pub fn to_json(&self) -> ReconResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(input: &str) -> ReconResult<Self> {
        Ok(serde_json::from_str(input)?)
    }
}
