//! Column-level dependency bookkeeping for operations.
//!
//! Each operation declares the columns it reads and a [`ColumnsDiff`]
//! describing what it does to the column model. An operation downstream of
//! a diff must be re-run only if it reads a column the diff touches.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnsDiff {
    #[serde(default)]
    pub added: BTreeSet<String>,
    #[serde(default)]
    pub deleted: BTreeSet<String>,
    #[serde(default)]
    pub modified: BTreeSet<String>,
}

impl ColumnsDiff {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Diff of an operation that rewrites cells of one existing column.
    pub fn modify_single_column(name: impl Into<String>) -> Self {
        Self {
            modified: BTreeSet::from([name.into()]),
            ..Self::default()
        }
    }

    /// Columns whose contents change, in any way.
    pub fn impacted_columns(&self) -> impl Iterator<Item = &String> + '_ {
        self.added.iter().chain(&self.deleted).chain(&self.modified)
    }

    /// True if any of `dependencies` is added, deleted or modified here.
    pub fn touches(&self, dependencies: &BTreeSet<String>) -> bool {
        self.impacted_columns().any(|c| dependencies.contains(c))
    }

    pub fn rename_columns(&self, new_names: &HashMap<String, String>) -> Self {
        let rename = |set: &BTreeSet<String>| -> BTreeSet<String> {
            set.iter()
                .map(|c| new_names.get(c).cloned().unwrap_or_else(|| c.clone()))
                .collect()
        };
        Self {
            added: rename(&self.added),
            deleted: rename(&self.deleted),
            modified: rename(&self.modified),
        }
    }
}
