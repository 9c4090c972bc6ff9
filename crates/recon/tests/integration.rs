use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use tabula_engine::{
    Cell, CellValue, EngineConfig, Facet, Judgment, Recon, ReconCandidate, ReconId, Row, RowSelector, Table,
};
use tabula_recon::{JournalState, MarkNewTopicsOperation, ReconJournal, RowScanner};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

/// Topic column: ["Paris", "Paris", <absent>, "Lyon"].
fn topics() -> Table {
    let mut table = Table::with_columns("places", &["Topic", "Country"]).unwrap();
    table.push_values([Some(CellValue::from("Paris")), Some(CellValue::from("FR"))]);
    table.push_values([Some(CellValue::from("Paris")), Some(CellValue::from("FR"))]);
    table.push_values([None, Some(CellValue::from("FR"))]);
    table.push_values([Some(CellValue::from("Lyon")), Some(CellValue::from("FR"))]);
    table
}

fn mark(share: bool) -> MarkNewTopicsOperation {
    MarkNewTopicsOperation::new(EngineConfig::default(), "Topic", share).with_service(
        Some("https://wikidata.reconci.link/en/api".into()),
        Some("http://www.wikidata.org/entity/".into()),
        Some("http://www.wikidata.org/prop/direct/".into()),
    )
}

fn recon_at(journal: &ReconJournal, i: usize) -> &Recon {
    journal.changes()[i]
        .new_cell
        .as_ref()
        .and_then(|c| c.recon.as_ref())
        .expect("marked cell carries a recon")
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn shared_marking_groups_identical_values() {
    init_tracing();
    let table = topics();
    let journal = mark(true).create_journal(&table, 1).unwrap();

    assert_eq!(journal.len(), 3);
    let rows: Vec<usize> = journal.changes().iter().map(|c| c.row).collect();
    assert_eq!(rows, vec![0, 1, 3]);

    let (paris_0, paris_1, lyon) = (recon_at(&journal, 0), recon_at(&journal, 1), recon_at(&journal, 2));
    assert_eq!(paris_0.id, paris_1.id);
    assert_eq!(paris_0.judgment_batch_size, 2);
    assert_eq!(paris_1.judgment_batch_size, 2);
    assert_ne!(lyon.id, paris_0.id);
    assert_eq!(lyon.judgment_batch_size, 1);
    assert_eq!(paris_0.service.as_deref(), Some("https://wikidata.reconci.link/en/api"));
}

#[test]
fn per_row_marking_mints_one_recon_per_cell() {
    init_tracing();
    let table = topics();
    let journal = mark(false).create_journal(&table, 1).unwrap();

    assert_eq!(journal.len(), 3);
    let ids: BTreeSet<ReconId> = (0..3).map(|i| recon_at(&journal, i).id).collect();
    assert_eq!(ids.len(), 3);
    for i in 0..3 {
        assert_eq!(recon_at(&journal, i).judgment_batch_size, 1);
    }
}

#[test]
fn rename_moves_write_dependency() {
    let renamed = mark(true).rename_columns(&HashMap::from([("Topic".to_string(), "Subject".to_string())]));

    assert_eq!(renamed.columns_diff().modified, BTreeSet::from(["Subject".to_string()]));
    assert_eq!(renamed.column_dependencies(), BTreeSet::from(["Subject".to_string()]));
    assert!(renamed.share_new_topics);
    assert_eq!(renamed.service, mark(true).service);
    assert_eq!(renamed.identifier_space, mark(true).identifier_space);
    assert_eq!(renamed.schema_space, mark(true).schema_space);
}

#[test]
fn history_entry_description_counts_changes() {
    let table = topics();
    let entry = mark(false).create_history_entry(&table, 12).unwrap();
    assert_eq!(entry.id, 12);
    assert_eq!(
        entry.description,
        "Mark to create new items for 3 cells in column Topic, one item for each cell"
    );
    assert_eq!(entry.journal.state(), JournalState::Pending);
}

#[test]
fn facets_limit_marked_rows() {
    let mut table = topics();
    let country = table.cell_index_of("Country");
    table.replace_row(1, table.row(1).unwrap().with_cell(country, Some(Cell::new("DE")))).unwrap();

    let op = MarkNewTopicsOperation::new(
        EngineConfig::new(vec![Facet::List {
            column_name: "Country".into(),
            selection: vec!["FR".into()],
            select_blank: false,
            invert: false,
        }]),
        "Topic",
        true,
    );
    let journal = op.create_journal(&table, 1).unwrap();
    let rows: Vec<usize> = journal.changes().iter().map(|c| c.row).collect();
    assert_eq!(rows, vec![0, 3]);
    assert_eq!(recon_at(&journal, 0).judgment_batch_size, 1);
}

/// Yields rows last-to-first.
struct Reversed;

impl RowSelector for Reversed {
    fn select_rows<'t>(&'t self, table: &'t Table) -> Box<dyn Iterator<Item = (usize, &'t Row)> + 't> {
        let rows: Vec<(usize, &Row)> = table.rows().collect();
        Box::new(rows.into_iter().rev())
    }
}

#[test]
fn journal_follows_selector_order() {
    let table = topics();
    let column = table.column_by_name("Topic").unwrap();
    let scanner = RowScanner::new(column, Default::default(), 4, true, "mass");
    let journal = tabula_recon::scan_rows(&Reversed, &table, scanner);

    let rows: Vec<usize> = journal.changes().iter().map(|c| c.row).collect();
    assert_eq!(rows, vec![3, 1, 0]);
    // Lyon was seen first, so it took the first id.
    assert_eq!(recon_at(&journal, 0).id, ReconId::new(4, 0));
    assert_eq!(recon_at(&journal, 1).id, ReconId::new(4, 1));
}

#[test]
fn cold_reload_reverts_and_reapplies() {
    init_tracing();
    let mut table = topics();
    let original = table.clone();

    let mut journal = mark(true).create_journal(&table, 1).unwrap();
    journal.apply(&mut table).unwrap();
    let marked = table.clone();

    let persisted = journal.to_json().unwrap();
    drop(journal);

    let mut reloaded = ReconJournal::from_json(&persisted).unwrap();
    assert_eq!(reloaded.state(), JournalState::Applied);
    assert_eq!(reloaded.recon_config().identifier_space.as_deref(), Some("http://www.wikidata.org/entity/"));

    reloaded.revert(&mut table).unwrap();
    assert_eq!(table, original);
    reloaded.apply(&mut table).unwrap();
    assert_eq!(table, marked);
}

#[test]
fn operation_survives_json_roundtrip() {
    let op = mark(true);
    let json = op.to_json().unwrap();
    assert_eq!(MarkNewTopicsOperation::from_json(&json).unwrap(), op);
}

#[test]
fn remarking_keeps_service_of_existing_recon() {
    let mut table = topics();
    let mut first = mark(false).create_journal(&table, 1).unwrap();
    first.apply(&mut table).unwrap();

    // The column now has a recon config, so the operation's own service is ignored.
    let other = MarkNewTopicsOperation::new(EngineConfig::default(), "Topic", false)
        .with_service(Some("https://elsewhere.example".into()), None, None);
    let second = other.create_journal(&table, 2).unwrap();

    for i in 0..second.len() {
        let recon = recon_at(&second, i);
        assert_eq!(recon.service.as_deref(), Some("https://wikidata.reconci.link/en/api"));
        assert_eq!(recon.id.history_entry, 2);
        assert_ne!(recon.id, recon_at(&first, i).id);
    }
    assert_eq!(second.recon_config(), first.recon_config());
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

trait CellIndexOf {
    fn cell_index_of(&self, name: &str) -> usize;
}

impl CellIndexOf for Table {
    fn cell_index_of(&self, name: &str) -> usize {
        self.column_by_name(name).map(|c| c.cell_index).unwrap()
    }
}

fn matched_recon(seq: u32) -> Recon {
    let mut recon = Recon::new(ReconId::new(0, seq.into()), Some("old-svc".into()), None, None);
    recon.judgment = Judgment::Matched {
        candidate: ReconCandidate::new(format!("Q{seq}"), "somewhere", 80.0),
        rank: seq,
    };
    recon.judgment_batch_size = 4;
    recon
}

fn build_table(rows: &[(Option<&'static str>, bool)]) -> Table {
    let mut table = Table::with_columns("t", &["Topic", "Country"]).unwrap();
    for (seq, (value, has_recon)) in rows.iter().enumerate() {
        let topic = value.map(|v| {
            let mut cell = Cell::new(v);
            if *has_recon {
                cell.recon = Some(matched_recon(seq as u32));
            }
            cell
        });
        table.push_row(Row::new(vec![topic, Some(Cell::new("FR"))]));
    }
    table
}

fn rows_strategy() -> impl Strategy<Value = Vec<(Option<&'static str>, bool)>> {
    prop::collection::vec(
        (
            prop::option::of(prop::sample::select(vec!["Paris", "Lyon", "Nice", "", "42"])),
            any::<bool>(),
        ),
        0..24,
    )
}

proptest! {
    #[test]
    fn revert_restores_table(rows in rows_strategy(), share in any::<bool>()) {
        let mut table = build_table(&rows);
        let original = table.clone();
        let mut journal = mark(share).create_journal(&table, 7).unwrap();

        journal.apply(&mut table).unwrap();
        journal.revert(&mut table).unwrap();
        prop_assert_eq!(table, original);
    }

    #[test]
    fn apply_is_idempotent(rows in rows_strategy(), share in any::<bool>()) {
        let mut table = build_table(&rows);
        let mut journal = mark(share).create_journal(&table, 7).unwrap();

        journal.apply(&mut table).unwrap();
        let once = table.clone();
        journal.apply(&mut table).unwrap();
        prop_assert_eq!(&table, &once);
    }

    #[test]
    fn every_recon_is_reset_new(rows in rows_strategy(), share in any::<bool>()) {
        let table = build_table(&rows);
        let journal = mark(share).create_journal(&table, 7).unwrap();

        for change in journal.changes() {
            let recon = change.new_cell.as_ref().and_then(|c| c.recon.as_ref()).unwrap();
            prop_assert_eq!(&recon.judgment, &Judgment::New);
            prop_assert!(recon.matched().is_none());
            prop_assert_eq!(recon.match_rank(), -1);
            prop_assert_eq!(recon.judgment_action.as_str(), "mass");
            prop_assert_eq!(
                &change.new_cell.as_ref().unwrap().value,
                &change.old_cell.as_ref().unwrap().value
            );
        }
    }

    #[test]
    fn absent_cells_produce_no_entries(rows in rows_strategy(), share in any::<bool>()) {
        let table = build_table(&rows);
        let journal = mark(share).create_journal(&table, 7).unwrap();

        let present: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, (v, _))| v.is_some())
            .map(|(i, _)| i)
            .collect();
        let touched: Vec<usize> = journal.changes().iter().map(|c| c.row).collect();
        prop_assert_eq!(touched, present);
    }

    #[test]
    fn shared_batch_size_counts_group(rows in rows_strategy()) {
        let table = build_table(&rows);
        let journal = mark(true).create_journal(&table, 7).unwrap();

        let mut counts: HashMap<String, u32> = HashMap::new();
        for (value, _) in &rows {
            if let Some(v) = value {
                *counts.entry(v.to_string()).or_default() += 1;
            }
        }
        let mut ids_by_value: HashMap<String, BTreeSet<ReconId>> = HashMap::new();
        for change in journal.changes() {
            let cell = change.new_cell.as_ref().unwrap();
            let recon = cell.recon.as_ref().unwrap();
            let key = cell.value.raw_display();
            prop_assert_eq!(recon.judgment_batch_size, counts[&key]);
            ids_by_value.entry(key).or_default().insert(recon.id);
        }
        let mut all_ids = BTreeSet::new();
        for ids in ids_by_value.values() {
            prop_assert_eq!(ids.len(), 1);
            all_ids.extend(ids.iter().copied());
        }
        prop_assert_eq!(all_ids.len(), ids_by_value.len());
    }

    #[test]
    fn per_row_ids_distinct(rows in rows_strategy()) {
        let table = build_table(&rows);
        let journal = mark(false).create_journal(&table, 7).unwrap();

        let ids: BTreeSet<ReconId> = journal
            .changes()
            .iter()
            .map(|c| c.new_cell.as_ref().unwrap().recon.as_ref().unwrap().id)
            .collect();
        prop_assert_eq!(ids.len(), journal.len());
        for change in journal.changes() {
            prop_assert_eq!(change.new_cell.as_ref().unwrap().recon.as_ref().unwrap().judgment_batch_size, 1);
        }
    }
}
