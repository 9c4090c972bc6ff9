//! Reconciliation records attached to cells.
//!
//! A [`Recon`] records a judgment about which external entity a cell value
//! refers to. The judgment is a sum type: only a `Matched` judgment carries a
//! match candidate and rank, so a `New` recon can never hold a stale match.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::cell::Cell;

/// Provenance tag for recons produced by batch operations.
pub const MASS_JUDGMENT_ACTION: &str = "mass";

/// Provenance tag for recons nobody has judged yet.
pub const UNKNOWN_JUDGMENT_ACTION: &str = "unknown";

/// Unique recon identity.
///
/// Allocated from the history entry that created the recon plus a sequence
/// number within that entry, so ids are unique without a global counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReconId {
    pub history_entry: u64,
    pub seq: u64,
}

impl ReconId {
    #[inline]
    pub fn new(history_entry: u64, seq: u64) -> Self {
        Self { history_entry, seq }
    }
}

impl std::fmt::Display for ReconId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.history_entry, self.seq)
    }
}

/// A candidate entity returned by a reconciliation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconCandidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    pub score: OrderedFloat<f64>,
}

impl ReconCandidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            types: Vec::new(),
            score: OrderedFloat(score),
        }
    }
}

/// How a cell's identity was determined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "judgment", rename_all = "snake_case")]
pub enum Judgment {
    /// Matched to a known entity.
    Matched {
        #[serde(rename = "match")]
        candidate: ReconCandidate,
        #[serde(rename = "matchRank")]
        rank: u32,
    },
    /// Explicitly judged to have no entity.
    None,
    /// Marked to create a new entity.
    New,
    #[default]
    Unknown,
}

impl Judgment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Judgment::Matched { .. } => "matched",
            Judgment::None => "none",
            Judgment::New => "new",
            Judgment::Unknown => "unknown",
        }
    }

    /// Match rank, or -1 when the judgment carries no match.
    pub fn match_rank(&self) -> i32 {
        match self {
            Judgment::Matched { rank, .. } => i32::try_from(*rank).unwrap_or(i32::MAX),
            _ => -1,
        }
    }

    pub fn matched_candidate(&self) -> Option<&ReconCandidate> {
        match self {
            Judgment::Matched { candidate, .. } => Some(candidate),
            _ => None,
        }
    }
}

impl std::fmt::Display for Judgment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reconciliation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recon {
    pub id: ReconId,
    /// History entry that last judged this recon.
    pub judgment_history_entry: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_space: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_space: Option<String>,
    pub judgment: Judgment,
    pub judgment_action: String,
    /// Number of cells judged together with this one.
    pub judgment_batch_size: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<ReconCandidate>,
}

impl Recon {
    pub fn new(
        id: ReconId,
        service: Option<String>,
        identifier_space: Option<String>,
        schema_space: Option<String>,
    ) -> Self {
        Self {
            id,
            judgment_history_entry: id.history_entry,
            service,
            identifier_space,
            schema_space,
            judgment: Judgment::Unknown,
            judgment_action: UNKNOWN_JUDGMENT_ACTION.to_string(),
            judgment_batch_size: 0,
            candidates: Vec::new(),
        }
    }

    /// Copy this recon under a new id. Judgment fields are kept as-is.
    pub fn duplicate(&self, id: ReconId) -> Self {
        Self {
            id,
            judgment_history_entry: id.history_entry,
            ..self.clone()
        }
    }

    /// Judge as `New`, dropping any previous match.
    pub fn mark_new(&mut self, judgment_action: &str, batch_size: u32) {
        self.judgment = Judgment::New;
        self.judgment_action = judgment_action.to_string();
        self.judgment_batch_size = batch_size;
    }

    pub fn match_rank(&self) -> i32 {
        self.judgment.match_rank()
    }

    pub fn matched(&self) -> Option<&ReconCandidate> {
        self.judgment.matched_candidate()
    }
}

/// Expected entity type for a reconciled column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconType {
    pub id: String,
    pub name: String,
}

/// Service descriptor plus the options a column was reconciled with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_space: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_space: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<ReconType>,
    #[serde(default)]
    pub auto_match: bool,
    #[serde(default)]
    pub limit: u32,
}

impl ReconConfig {
    /// Standard config for the given service triple, no type, no auto-match.
    pub fn standard(
        service: Option<String>,
        identifier_space: Option<String>,
        schema_space: Option<String>,
    ) -> Self {
        Self {
            service,
            identifier_space,
            schema_space,
            expected_type: None,
            auto_match: false,
            limit: 0,
        }
    }

    /// Fresh, unjudged recon bound to this service.
    pub fn create_new_recon(&self, id: ReconId) -> Recon {
        Recon::new(
            id,
            self.service.clone(),
            self.identifier_space.clone(),
            self.schema_space.clone(),
        )
    }
}

/// Per-column reconciliation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconStats {
    pub nonblanks: usize,
    pub new_topics: usize,
    pub matched_topics: usize,
}

impl ReconStats {
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = Option<&'a Cell>>) -> Self {
        let mut stats = ReconStats::default();
        for cell in cells.into_iter().flatten() {
            if cell.is_blank() {
                continue;
            }
            stats.nonblanks += 1;
            match cell.recon.as_ref().map(|r| &r.judgment) {
                Some(Judgment::New) => stats.new_topics += 1,
                Some(Judgment::Matched { .. }) => stats.matched_topics += 1,
                _ => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    fn matched_recon() -> Recon {
        let mut recon = Recon::new(ReconId::new(1, 0), Some("svc".into()), None, None);
        recon.judgment = Judgment::Matched {
            candidate: ReconCandidate::new("Q90", "Paris", 98.5),
            rank: 0,
        };
        recon.candidates.push(ReconCandidate::new("Q90", "Paris", 98.5));
        recon
    }

    #[test]
    fn test_match_rank_only_for_matched() {
        assert_eq!(matched_recon().match_rank(), 0);
        assert_eq!(Judgment::New.match_rank(), -1);
        assert_eq!(Judgment::Unknown.match_rank(), -1);
        assert!(Judgment::None.matched_candidate().is_none());
    }

    #[test]
    fn test_mark_new_drops_match() {
        let mut recon = matched_recon();
        recon.mark_new(MASS_JUDGMENT_ACTION, 1);
        assert_eq!(recon.judgment, Judgment::New);
        assert!(recon.matched().is_none());
        assert_eq!(recon.match_rank(), -1);
        assert_eq!(recon.judgment_action, "mass");
    }

    #[test]
    fn test_duplicate_keeps_service_and_candidates() {
        let recon = matched_recon();
        let dup = recon.duplicate(ReconId::new(7, 3));
        assert_eq!(dup.id, ReconId::new(7, 3));
        assert_eq!(dup.judgment_history_entry, 7);
        assert_eq!(dup.service, recon.service);
        assert_eq!(dup.candidates, recon.candidates);
    }

    #[test]
    fn test_judgment_serde_shape() {
        let json = serde_json::to_value(&matched_recon().judgment).unwrap();
        assert_eq!(json["judgment"], "matched");
        assert_eq!(json["matchRank"], 0);
        assert_eq!(json["match"]["id"], "Q90");

        let json = serde_json::to_value(&Judgment::New).unwrap();
        assert_eq!(json, serde_json::json!({ "judgment": "new" }));
    }

    #[test]
    fn test_recon_id_display() {
        assert_eq!(ReconId::new(1712, 4).to_string(), "1712-4");
    }

    #[test]
    fn test_stats_skip_blanks() {
        let mut new_recon = Recon::new(ReconId::new(1, 1), None, None, None);
        new_recon.mark_new(MASS_JUDGMENT_ACTION, 1);
        let cells = vec![
            Cell::with_recon(CellValue::from("Paris"), new_recon.clone()),
            Cell::with_recon(CellValue::from("Lyon"), matched_recon()),
            Cell::with_recon(CellValue::Empty, new_recon),
            Cell::new("Nice"),
        ];
        let stats = ReconStats::from_cells(cells.iter().map(Some).chain([None]));
        assert_eq!(
            stats,
            ReconStats {
                nonblanks: 3,
                new_topics: 1,
                matched_topics: 1
            }
        );
    }
}
