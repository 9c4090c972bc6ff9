//! Per-run cache of shared recons keyed by normalized cell value.

use rustc_hash::FxHashMap;
use tabula_engine::{CellValue, Recon};

/// Handle to a record owned by a [`DedupCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedSlot(usize);

/// Maps a normalized value to the one recon shared by every cell holding it.
///
/// The cache owns the records outright; the scanner refers to them through
/// [`SharedSlot`] handles and snapshots them once the run is over. Lives for
/// one scan only and is never shared between runs.
#[derive(Debug, Default)]
pub struct DedupCache {
    index: FxHashMap<String, SharedSlot>,
    records: Vec<Recon>,
}

/// Grouping key: the value's display string, "" for empty.
pub fn normalize_key(value: &CellValue) -> String {
    value.raw_display()
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the record for `key`, or create it with `factory`.
    ///
    /// A hit bumps the record's batch size. A miss stores the new record
    /// judged `New` with batch size 1. Returns whether the record was created.
    pub fn lookup_or_insert<F>(&mut self, key: &str, judgment_action: &str, factory: F) -> (SharedSlot, bool)
    where
        F: FnOnce() -> Recon,
    {
        if let Some(&slot) = self.index.get(key) {
            self.records[slot.0].judgment_batch_size += 1;
            return (slot, false);
        }

        let mut recon = factory();
        recon.mark_new(judgment_action, 1);
        let slot = SharedSlot(self.records.len());
        self.records.push(recon);
        self.index.insert(key.to_string(), slot);
        (slot, true)
    }

    pub fn get(&self, slot: SharedSlot) -> &Recon {
        &self.records[slot.0]
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
