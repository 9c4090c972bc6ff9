//! Recon allocation for one history entry.

use tabula_engine::{Recon, ReconConfig, ReconId};

/// Mints recons for a single history entry.
///
/// Ids combine the history entry id with a per-factory sequence, so two
/// recons from the same factory never collide and recons from different
/// entries never collide either. Allocation touches no external state.
#[derive(Debug, Clone)]
pub struct ReconFactory {
    config: ReconConfig,
    history_entry: u64,
    next_seq: u64,
}

impl ReconFactory {
    pub fn new(config: ReconConfig, history_entry: u64) -> Self {
        Self {
            config,
            history_entry,
            next_seq: 0,
        }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// Number of recons minted so far.
    pub fn allocated(&self) -> u64 {
        self.next_seq
    }

    fn next_id(&mut self) -> ReconId {
        let id = ReconId::new(self.history_entry, self.next_seq);
        self.next_seq += 1;
        id
    }

    /// Unjudged recon bound to the factory's service descriptor.
    pub fn create_fresh(&mut self) -> Recon {
        let id = self.next_id();
        self.config.create_new_recon(id)
    }

    /// Copy of `existing` under a new id, keeping its own service descriptor.
    ///
    /// Judgment fields are copied verbatim; callers reset them.
    pub fn duplicate(&mut self, existing: &Recon) -> Recon {
        let id = self.next_id();
        existing.duplicate(id)
    }
}
