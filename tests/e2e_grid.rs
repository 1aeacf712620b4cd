// FilterGrid - tests/e2e_grid.rs
//
// End-to-end tests for the grid pipeline: popup candidates, filter apply,
// preset save and reload through the real filesystem, natural sorting and
// select-all over a large view.

use filtergrid::app::persistence;
use filtergrid::app::select_all::SelectAllOutcome;
use filtergrid::app::selection::SelectionMode;
use filtergrid::app::state::{GridOptions, GridState};
use filtergrid::core::accessor::JsonAccessor;
use filtergrid::core::date_tree::{CheckState, DateTree};
use filtergrid::core::model::{Column, FieldType, FieldValue, ItemKind};
use filtergrid::core::natural_sort::SortDirection;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn grid(rows: Vec<Value>, columns: Vec<Column>) -> GridState<Value> {
    GridState::new(rows, columns, Arc::new(JsonAccessor), GridOptions::default())
}

fn numbered_rows() -> Vec<Value> {
    (1..=5)
        .map(|n| json!({ "n": n, "name": format!("row{n}") }))
        .collect()
}

fn numbered_columns() -> Vec<Column> {
    vec![
        Column::new("n", FieldType::Integer),
        Column::new("name", FieldType::Text),
    ]
}

fn value_labels(g: &GridState<Value>) -> Vec<String> {
    g.popup()
        .map(|p| {
            p.items()
                .iter()
                .filter(|i| i.kind != ItemKind::SelectAll)
                .map(|i| i.label.clone())
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// Filter + persistence
// =============================================================================

#[test]
fn e2e_filter_survives_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("preset.json");

    let mut g = grid(numbered_rows(), numbered_columns());
    let popup = g.open_filter("n").unwrap();
    for n in [2, 3] {
        let idx = popup.position(Some(&FieldValue::Integer(n))).unwrap();
        popup.set_item_checked(idx, false);
    }
    assert!(g.apply_filter());
    assert_eq!(g.view(), &[0, 3, 4]);
    g.save_preset_to(&path).unwrap();

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["filters"][0]["field_name"], "n");
    assert_eq!(on_disk["filters"][0]["previously_filtered_items"], json!([2, 3]));

    let mut reloaded = grid(numbered_rows(), numbered_columns());
    assert_eq!(reloaded.load_preset_from(&path), 1);
    assert_eq!(reloaded.view(), &[0, 3, 4]);
    assert_eq!(reloaded.store().last_filter(), Some("n"));

    // The restored filter rejects exactly the excluded values.
    let reloaded_items: Vec<i64> = reloaded
        .view_items()
        .filter_map(|row| row["n"].as_i64())
        .collect();
    assert_eq!(reloaded_items, vec![1, 4, 5]);
}

#[test]
fn e2e_corrupt_preset_restores_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("preset.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let mut g = grid(numbered_rows(), numbered_columns());
    assert!(persistence::load(&path).is_none());
    assert_eq!(g.load_preset_from(&path), 0);
    assert_eq!(g.view().len(), 5);
}

#[test]
fn e2e_preset_for_changed_column_type_is_dropped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("preset.json");

    let mut g = grid(numbered_rows(), numbered_columns());
    let mut excluded = filtergrid::core::model::ExclusionSet::new();
    excluded.insert(Some(FieldValue::Integer(1)));
    g.set_exclusions("n", excluded);
    g.save_preset_to(&path).unwrap();

    let mut retyped = grid(
        numbered_rows(),
        vec![
            Column::new("n", FieldType::Text),
            Column::new("name", FieldType::Text),
        ],
    );
    assert_eq!(retyped.load_preset_from(&path), 0);
    assert!(retyped.store().is_empty());
}

// =============================================================================
// Distinct values + natural sort
// =============================================================================

#[test]
fn e2e_distinct_candidates_are_natural_with_blank_last() {
    let rows = vec![
        json!({ "code": "a10" }),
        json!({ "code": "b" }),
        json!({ "code": "a2" }),
        json!({ "code": "a2" }),
        json!({ "code": "" }),
        json!({}),
    ];
    let mut g = grid(rows, vec![Column::new("code", FieldType::Text)]);
    g.open_filter("code").unwrap();

    let popup = g.popup().unwrap();
    assert_eq!(popup.items()[0].kind, ItemKind::SelectAll);
    assert!(popup.items()[0].is_checked());
    // Null and "" collapse into one blank entry.
    assert_eq!(value_labels(&g), vec!["b", "a2", "a10", "(Blank)"]);
}

#[test]
fn e2e_view_sorts_naturally_with_nulls_first() {
    let rows = vec![
        json!({ "name": "file10" }),
        json!({ "name": "file2" }),
        json!({}),
        json!({ "name": "File1" }),
    ];
    let mut g = grid(rows, vec![Column::new("name", FieldType::Text)]);

    g.sort_by("name", SortDirection::Ascending);
    assert_eq!(g.view(), &[2, 3, 1, 0]);

    g.sort_by("name", SortDirection::Descending);
    assert_eq!(g.view(), &[0, 1, 3, 2]);
}

// =============================================================================
// Date hierarchy
// =============================================================================

#[test]
fn e2e_date_tree_groups_and_filters_by_year() {
    let rows = vec![
        json!({ "when": "2024-01-05T10:30:00" }),
        json!({ "when": "2024-01-20" }),
        json!({ "when": "2024-03-02" }),
        json!({ "when": "2023-12-31" }),
        json!({ "when": null }),
    ];
    let mut g = grid(rows, vec![Column::new("when", FieldType::DateTime)]);
    let popup = g.open_filter("when").unwrap();

    let tree = popup.tree().unwrap();
    let years: Vec<_> = tree
        .children(DateTree::ROOT)
        .map(|(_, n)| n.label.clone())
        .collect();
    assert_eq!(years, vec!["2023", "2024", "(Blank)"]);

    let y2024 = tree.find_year(2024).unwrap();
    let months: Vec<_> = tree.children(y2024).map(|(_, n)| n.label.clone()).collect();
    assert_eq!(months, vec!["January", "March"]);

    let january = tree.find_month(2024, 1).unwrap();
    let days: Vec<_> = tree.children(january).map(|(_, n)| n.label.clone()).collect();
    assert_eq!(days, vec!["05", "20"]);

    let y2023 = tree.find_year(2023).unwrap();
    popup.set_node_checked(y2023, false);
    let tree = popup.tree().unwrap();
    assert_eq!(tree.state(DateTree::ROOT), Some(CheckState::Indeterminate));
    assert_eq!(tree.state(y2023), Some(CheckState::Unchecked));

    assert!(g.apply_filter());
    assert_eq!(g.view(), &[0, 1, 2, 4]);
}

// =============================================================================
// Select-all
// =============================================================================

#[test]
fn e2e_virtual_select_all_then_manual_selection() {
    let rows: Vec<Value> = (0..10_000).map(|id| json!({ "id": id })).collect();
    let mut g = grid(rows, vec![Column::new("id", FieldType::Integer)]);

    assert_eq!(g.select_all(), SelectAllOutcome::Virtual);
    g.run_pending();
    assert_eq!(g.selection().mode(), SelectionMode::Virtual);
    assert_eq!(g.effective_count(), 10_000);

    g.set_row_selected(42, false);
    assert_eq!(g.effective_count(), 9_999);
    assert!(!g.is_effectively_selected(42));
    assert!(g.is_effectively_selected(43));

    g.select_rows(&[7, 8, 9]);
    g.run_pending();
    assert_eq!(g.selection().mode(), SelectionMode::Real);
    assert_eq!(g.effective_selection(), vec![7, 8, 9]);
    assert_eq!(g.effective_count(), 3);
    assert!(g.selection().exceptions().is_empty());
}

#[test]
fn e2e_select_all_respects_the_filtered_view() {
    let rows: Vec<Value> = (0..4_000).map(|id| json!({ "id": id, "even": id % 2 == 0 })).collect();
    let mut g = grid(
        rows,
        vec![
            Column::new("id", FieldType::Integer),
            Column::new("even", FieldType::Boolean),
        ],
    );
    let mut excluded = filtergrid::core::model::ExclusionSet::new();
    excluded.insert(Some(FieldValue::Boolean(false)));
    g.set_exclusions("even", excluded);
    assert_eq!(g.view().len(), 2_000);

    // 2,000 rows sit below the fast threshold.
    assert_eq!(g.select_all(), SelectAllOutcome::Deferred);
    assert_eq!(g.effective_count(), 2_000);
    assert!(!g.is_effectively_selected(1));
    assert!(g.is_effectively_selected(2));
}
