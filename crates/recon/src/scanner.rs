//! Row scanning for mark-new-topics.
//!
//! The scanner visits rows in the order the selector yields them and emits
//! one [`CellChange`] per present cell in the target column. Absent cells are
//! skipped: an empty slot is not marked.
//!
//! Shared mode groups cells by normalized value through a [`DedupCache`].
//! Because later rows keep bumping a group's batch size, shared changes are
//! held as slots during the pass and resolved to owned snapshots in
//! [`RowScanner::finish`]; every cell of a group then carries the group's
//! final batch size, and no two journal entries alias one record.

use rustc_hash::FxHashSet;
use tabula_engine::{Cell, Column, Recon, ReconConfig, Row, RowSelector, Table};
use tracing::{debug, warn};

use crate::dedup::{normalize_key, DedupCache, SharedSlot};
use crate::factory::ReconFactory;
use crate::journal::{CellChange, ReconJournal};

enum PendingRecon {
    Shared(SharedSlot),
    Owned(Recon),
}

struct PendingChange {
    row: usize,
    old_cell: Cell,
    recon: PendingRecon,
}

/// Single-pass scanner for one batch run. Owns its dedup cache.
pub struct RowScanner {
    column_name: String,
    cell_index: usize,
    share: bool,
    judgment_action: String,
    factory: ReconFactory,
    cache: DedupCache,
    visited: FxHashSet<usize>,
    pending: Vec<PendingChange>,
}

impl RowScanner {
    pub fn new(
        column: &Column,
        config: ReconConfig,
        history_entry: u64,
        share: bool,
        judgment_action: impl Into<String>,
    ) -> Self {
        Self {
            column_name: column.name.clone(),
            cell_index: column.cell_index,
            share,
            judgment_action: judgment_action.into(),
            factory: ReconFactory::new(config, history_entry),
            cache: DedupCache::new(),
            visited: FxHashSet::default(),
            pending: Vec::new(),
        }
    }

    pub fn visit(&mut self, row_index: usize, row: &Row) {
        let Some(cell) = row.get_cell(self.cell_index) else {
            return;
        };
        if !self.visited.insert(row_index) {
            warn!(row = row_index, column = %self.column_name, "row selected twice, ignoring repeat");
            return;
        }

        let recon = if self.share {
            let key = normalize_key(&cell.value);
            let factory = &mut self.factory;
            let (slot, _) = self
                .cache
                .lookup_or_insert(&key, &self.judgment_action, || factory.create_fresh());
            PendingRecon::Shared(slot)
        } else {
            let mut recon = match &cell.recon {
                Some(existing) => self.factory.duplicate(existing),
                None => self.factory.create_fresh(),
            };
            recon.mark_new(&self.judgment_action, 1);
            PendingRecon::Owned(recon)
        };

        self.pending.push(PendingChange {
            row: row_index,
            old_cell: cell.clone(),
            recon,
        });
    }

    /// Resolve shared slots and build the journal.
    pub fn finish(self) -> ReconJournal {
        let RowScanner {
            column_name,
            cell_index,
            share,
            factory,
            cache,
            visited,
            pending,
            ..
        } = self;

        let changes: Vec<CellChange> = pending
            .into_iter()
            .map(|p| {
                let recon = match p.recon {
                    PendingRecon::Shared(slot) => cache.get(slot).clone(),
                    PendingRecon::Owned(recon) => recon,
                };
                let new_cell = Cell::with_recon(p.old_cell.value.clone(), recon);
                CellChange::new(p.row, cell_index, Some(p.old_cell), Some(new_cell))
            })
            .collect();

        debug!(
            column = %column_name,
            share,
            rows = visited.len(),
            changes = changes.len(),
            shared_records = cache.len(),
            allocated = factory.allocated(),
            "mark-new-topics scan finished"
        );

        let config = factory.config().clone();
        ReconJournal::new(changes, column_name, config)
    }
}

/// Scan every row `selector` yields from `table`.
pub fn scan_rows<S: RowSelector + ?Sized>(selector: &S, table: &Table, mut scanner: RowScanner) -> ReconJournal {
    for (row_index, row) in selector.select_rows(table) {
        scanner.visit(row_index, row);
    }
    scanner.finish()
}
