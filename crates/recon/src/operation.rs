//! The mark-new-topics operation.
//!
//! Marks every selected cell of one column as a new topic. In shared mode,
//! cells with the same value get one shared recon; otherwise each cell gets
//! its own. The operation value is what gets persisted; running it against a
//! table produces a [`ReconJournal`] that applies and reverts the change.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tabula_engine::recon::MASS_JUDGMENT_ACTION;
use tabula_engine::{Column, ColumnsDiff, EngineConfig, ReconConfig, Table};

use crate::config::MarkDefaults;
use crate::error::ReconResult;
use crate::history::HistoryEntry;
use crate::journal::ReconJournal;
use crate::scanner::{scan_rows, RowScanner};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkNewTopicsOperation {
    #[serde(default)]
    pub engine_config: EngineConfig,
    pub column_name: String,
    #[serde(default)]
    pub share_new_topics: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_space: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_space: Option<String>,
}

impl MarkNewTopicsOperation {
    pub fn new(engine_config: EngineConfig, column_name: impl Into<String>, share_new_topics: bool) -> Self {
        Self {
            engine_config,
            column_name: column_name.into(),
            share_new_topics,
            service: None,
            identifier_space: None,
            schema_space: None,
        }
    }

    pub fn with_service(
        mut self,
        service: Option<String>,
        identifier_space: Option<String>,
        schema_space: Option<String>,
    ) -> Self {
        self.service = service;
        self.identifier_space = identifier_space;
        self.schema_space = schema_space;
        self
    }

    /// Operation whose fallback service comes from `defaults`.
    pub fn from_defaults(
        engine_config: EngineConfig,
        column_name: impl Into<String>,
        share_new_topics: bool,
        defaults: &MarkDefaults,
    ) -> Self {
        Self::new(engine_config, column_name, share_new_topics).with_service(
            defaults.service.endpoint.clone(),
            defaults.service.identifier_space.clone(),
            defaults.service.schema_space.clone(),
        )
    }

    pub fn brief_description(&self) -> String {
        if self.share_new_topics {
            format!(
                "Mark to create one single new item for each group of similar cells in column {}",
                self.column_name
            )
        } else {
            format!(
                "Mark to create one single new item for each cell in column {}",
                self.column_name
            )
        }
    }

    pub fn description(&self, change_count: usize, column_name: &str) -> String {
        if self.share_new_topics {
            format!(
                "Mark to create new items for {change_count} cells in column {column_name}, \
                 one item for each group of similar cells"
            )
        } else {
            format!(
                "Mark to create new items for {change_count} cells in column {column_name}, \
                 one item for each cell"
            )
        }
    }

    /// Columns this operation reads, not counting the row selection.
    pub fn column_dependencies(&self) -> BTreeSet<String> {
        BTreeSet::from([self.column_name.clone()])
    }

    /// Columns read by the operation and by its row selection.
    pub fn all_column_dependencies(&self) -> BTreeSet<String> {
        let mut deps = self.column_dependencies();
        deps.extend(self.engine_config.column_dependencies());
        deps
    }

    pub fn columns_diff(&self) -> ColumnsDiff {
        ColumnsDiff::modify_single_column(self.column_name.clone())
    }

    /// Same operation against renamed columns. Service settings are kept.
    pub fn rename_columns(&self, new_names: &HashMap<String, String>) -> Self {
        Self {
            engine_config: self.engine_config.rename_column_dependencies(new_names),
            column_name: new_names
                .get(&self.column_name)
                .cloned()
                .unwrap_or_else(|| self.column_name.clone()),
            ..self.clone()
        }
    }

    /// The column's own recon config, else a standard one from this operation's service.
    pub fn new_recon_config(&self, column: &Column) -> ReconConfig {
        column.recon_config.clone().unwrap_or_else(|| {
            ReconConfig::standard(
                self.service.clone(),
                self.identifier_space.clone(),
                self.schema_space.clone(),
            )
        })
    }

    /// Scan `table` and build the journal, tagging recons as batch judgments.
    pub fn create_journal(&self, table: &Table, history_entry: u64) -> ReconResult<ReconJournal> {
        self.create_journal_with_action(table, history_entry, MASS_JUDGMENT_ACTION)
    }

    pub fn create_journal_with(
        &self,
        table: &Table,
        history_entry: u64,
        defaults: &MarkDefaults,
    ) -> ReconResult<ReconJournal> {
        self.create_journal_with_action(table, history_entry, &defaults.judgment_action)
    }

    fn create_journal_with_action(
        &self,
        table: &Table,
        history_entry: u64,
        judgment_action: &str,
    ) -> ReconResult<ReconJournal> {
        let column = table.require_column(&self.column_name)?;
        let scanner = RowScanner::new(
            column,
            self.new_recon_config(column),
            history_entry,
            self.share_new_topics,
            judgment_action,
        );
        Ok(scan_rows(&self.engine_config, table, scanner))
    }

    /// Journal plus description, ready to be applied and recorded.
    pub fn create_history_entry(&self, table: &Table, history_entry: u64) -> ReconResult<HistoryEntry> {
        let journal = self.create_journal(table, history_entry)?;
        Ok(self.wrap_journal(history_entry, journal))
    }

    pub fn create_history_entry_with(
        &self,
        table: &Table,
        history_entry: u64,
        defaults: &MarkDefaults,
    ) -> ReconResult<HistoryEntry> {
        let journal = self.create_journal_with(table, history_entry, defaults)?;
        Ok(self.wrap_journal(history_entry, journal))
    }

    fn wrap_journal(&self, history_entry: u64, journal: ReconJournal) -> HistoryEntry {
        let description = self.description(journal.len(), journal.column_name());
        HistoryEntry::new(history_entry, description, self.clone(), journal)
    }

    pub fn to_json(&self) -> ReconResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(input: &str) -> ReconResult<Self> {
        Ok(serde_json::from_str(input)?)
    }
}
