//! Undo/Redo history for batch reconciliation operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabula_engine::CellStore;

use crate::error::ReconResult;
use crate::journal::ReconJournal;
use crate::operation::MarkNewTopicsOperation;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub time: DateTime<Utc>,
    pub description: String,
    pub operation: MarkNewTopicsOperation,
    pub journal: ReconJournal,
}

impl HistoryEntry {
    pub fn new(id: u64, description: String, operation: MarkNewTopicsOperation, journal: ReconJournal) -> Self {
        Self {
            id,
            time: Utc::now(),
            description,
            operation,
            journal,
        }
    }
}

pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_entries: usize,
    next_id: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: 100,
            next_id: 1,
        }
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            ..Self::new()
        }
    }

    /// Allocate the next history entry id. Ids only grow.
    pub fn next_entry_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Apply the entry's journal and record it. Clears the redo stack.
    pub fn push<S: CellStore + ?Sized>(&mut self, mut entry: HistoryEntry, store: &mut S) -> ReconResult<&HistoryEntry> {
        entry.journal.apply(store)?;
        self.next_id = self.next_id.max(entry.id + 1);
        self.undo_stack.push(entry);
        self.redo_stack.clear();

        // Limit history size
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
        let last = self.undo_stack.len() - 1;
        Ok(&self.undo_stack[last])
    }

    /// Revert the most recent entry. On error the entry stays on the undo stack.
    pub fn undo<S: CellStore + ?Sized>(&mut self, store: &mut S) -> ReconResult<Option<&HistoryEntry>> {
        let Some(mut entry) = self.undo_stack.pop() else {
            return Ok(None);
        };
        if let Err(e) = entry.journal.revert(store) {
            self.undo_stack.push(entry);
            return Err(e);
        }
        self.redo_stack.push(entry);
        Ok(self.redo_stack.last())
    }

    /// Re-apply the most recently undone entry. On error it stays on the redo stack.
    pub fn redo<S: CellStore + ?Sized>(&mut self, store: &mut S) -> ReconResult<Option<&HistoryEntry>> {
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(e) = entry.journal.apply(store) {
            self.redo_stack.push(entry);
            return Err(e);
        }
        self.undo_stack.push(entry);
        Ok(self.undo_stack.last())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Applied entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.undo_stack
    }
}
