//! `tabula-recon` — batch "mark new topics" with a reversible change journal.
//!
//! Pure core: scans rows handed over by a selector, mints or shares recons,
//! and records every cell mutation in a journal that can be applied,
//! reverted and persisted. No IO beyond optional config loading.

pub mod config;
pub mod dedup;
pub mod error;
pub mod factory;
pub mod history;
pub mod journal;
pub mod operation;
pub mod scanner;

pub use config::MarkDefaults;
pub use error::{ReconError, ReconResult};
pub use history::{History, HistoryEntry};
pub use journal::{CellChange, JournalState, ReconJournal};
pub use operation::MarkNewTopicsOperation;
pub use scanner::{scan_rows, RowScanner};
