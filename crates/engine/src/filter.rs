//! Row selection.
//!
//! Operations never pick rows themselves. They ask a [`RowSelector`] for an
//! ordered sequence of `(row_index, &Row)` pairs and visit exactly those, in
//! that order.
//!
//! [`EngineConfig`] is the persisted selector: a conjunction of facets, each
//! bound to a column by name. Facets resolve their column once per selection;
//! a facet whose column no longer exists passes no rows.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::table::{Row, Table};

/// Source of the rows an operation visits.
pub trait RowSelector {
    fn select_rows<'t>(&'t self, table: &'t Table) -> Box<dyn Iterator<Item = (usize, &'t Row)> + 't>;
}

/// Selects every row in table order.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllRows;

impl RowSelector for AllRows {
    fn select_rows<'t>(&'t self, table: &'t Table) -> Box<dyn Iterator<Item = (usize, &'t Row)> + 't> {
        Box::new(table.rows())
    }
}

// =============================================================================
// Text predicate
// =============================================================================

/// Text facet mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFilterMode {
    Contains,
    StartsWith,
    Equals,
}

/// Text predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFilter {
    pub mode: TextFilterMode,
    pub value: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl TextFilter {
    pub fn matches(&self, text: &str) -> bool {
        let (haystack, needle) = if self.case_sensitive {
            (text.to_string(), self.value.clone())
        } else {
            (text.to_lowercase(), self.value.to_lowercase())
        };

        match self.mode {
            TextFilterMode::Contains => haystack.contains(&needle),
            TextFilterMode::StartsWith => haystack.starts_with(&needle),
            TextFilterMode::Equals => haystack == needle,
        }
    }
}

// =============================================================================
// Facets
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Facet {
    /// Rows whose value is one of `selection` (or blank, if `select_blank`).
    List {
        #[serde(rename = "columnName")]
        column_name: String,
        #[serde(default)]
        selection: Vec<String>,
        #[serde(default, rename = "selectBlank")]
        select_blank: bool,
        #[serde(default)]
        invert: bool,
    },
    /// Rows whose value matches a text predicate. Blank cells never match.
    Text {
        #[serde(rename = "columnName")]
        column_name: String,
        mode: TextFilterMode,
        query: String,
        #[serde(default, rename = "caseSensitive")]
        case_sensitive: bool,
    },
}

impl Facet {
    pub fn column_name(&self) -> &str {
        match self {
            Facet::List { column_name, .. } | Facet::Text { column_name, .. } => column_name,
        }
    }

    fn renamed(&self, new_names: &HashMap<String, String>) -> Facet {
        let mut facet = self.clone();
        match &mut facet {
            Facet::List { column_name, .. } | Facet::Text { column_name, .. } => {
                if let Some(new_name) = new_names.get(column_name.as_str()) {
                    *column_name = new_name.clone();
                }
            }
        }
        facet
    }

    fn resolve(&self, table: &Table) -> ResolvedFacet {
        let cell_index = table.column_by_name(self.column_name()).map(|c| c.cell_index);
        let predicate = match self {
            Facet::List {
                selection,
                select_blank,
                invert,
                ..
            } => Predicate::List {
                selection: selection.iter().cloned().collect(),
                select_blank: *select_blank,
                invert: *invert,
            },
            Facet::Text {
                mode,
                query,
                case_sensitive,
                ..
            } => Predicate::Text(TextFilter {
                mode: *mode,
                value: query.clone(),
                case_sensitive: *case_sensitive,
            }),
        };
        ResolvedFacet {
            cell_index,
            predicate,
        }
    }
}

enum Predicate {
    List {
        selection: HashSet<String>,
        select_blank: bool,
        invert: bool,
    },
    Text(TextFilter),
}

struct ResolvedFacet {
    cell_index: Option<usize>,
    predicate: Predicate,
}

impl ResolvedFacet {
    fn passes(&self, row: &Row) -> bool {
        let Some(cell_index) = self.cell_index else {
            return false;
        };
        let cell = row.get_cell(cell_index).filter(|c| !c.is_blank());
        match &self.predicate {
            Predicate::List {
                selection,
                select_blank,
                invert,
            } => {
                let hit = match cell {
                    None => *select_blank,
                    Some(c) => selection.contains(&c.value.raw_display()),
                };
                hit != *invert
            }
            Predicate::Text(filter) => cell.is_some_and(|c| filter.matches(&c.value.raw_display())),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Persisted row selection: every facet must pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub facets: Vec<Facet>,
}

impl EngineConfig {
    pub fn new(facets: Vec<Facet>) -> Self {
        Self { facets }
    }

    /// Columns read by the facets.
    pub fn column_dependencies(&self) -> BTreeSet<String> {
        self.facets.iter().map(|f| f.column_name().to_string()).collect()
    }

    /// Same selection with facet columns renamed. Unmapped names are kept.
    pub fn rename_column_dependencies(&self, new_names: &HashMap<String, String>) -> EngineConfig {
        EngineConfig {
            facets: self.facets.iter().map(|f| f.renamed(new_names)).collect(),
        }
    }
}

impl RowSelector for EngineConfig {
    fn select_rows<'t>(&'t self, table: &'t Table) -> Box<dyn Iterator<Item = (usize, &'t Row)> + 't> {
        if self.facets.is_empty() {
            return Box::new(table.rows());
        }
        let resolved: Vec<ResolvedFacet> = self.facets.iter().map(|f| f.resolve(table)).collect();
        Box::new(
            table
                .rows()
                .filter(move |(_, row)| resolved.iter().all(|f| f.passes(row))),
        )
    }
}
