// FilterGrid - app/state.rs
//
// Grid state: the single owner of the source items, column metadata, filter
// criteria, filtered/sorted view, popup session and selection model.
//
// Every mutation happens on the owning thread. The only background work is
// the preset load, whose result is reconciled and applied in one step by
// `poll_preset`.

use crate::app::persistence::{self, PresetFile};
use crate::app::select_all::{FastSelectAllCoordinator, SelectAllConfig, SelectAllOutcome};
use crate::app::selection::{JobStatus, RowId, VirtualSelectionModel};
use crate::core::accessor::{AccessorCache, FieldAccessor};
use crate::core::criteria::FilterCriteriaStore;
use crate::core::distinct::{build_candidates, collect_distinct, DisplayOptions};
use crate::core::model::{Column, ExclusionSet, FilterCommon};
use crate::core::natural_sort::{NaturalKey, NaturalSortComparer, SortDirection};
use crate::core::popup::{PopupSession, SearchMode};
use crate::util::constants::VISIBLE_ROW_PREFIX;
use crate::util::error::PersistError;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Instant;

/// Behaviour switches of one grid.
#[derive(Debug, Clone, Default)]
pub struct GridOptions {
    pub display: DisplayOptions,
    pub search_mode: SearchMode,
    pub select_all: SelectAllConfig,
    /// Save the preset after every apply/remove.
    pub persistent: bool,
    pub preset_path: Option<PathBuf>,
}

/// Top-level grid state.
pub struct GridState<T> {
    items: Vec<T>,
    columns: Vec<Column>,
    cache: AccessorCache<T>,
    store: FilterCriteriaStore<T>,

    /// Indices into `items` of the rows passing every filter, in display
    /// order.
    view: Vec<RowId>,
    sort: Option<(String, SortDirection)>,

    popup: Option<PopupSession>,
    selection: VirtualSelectionModel,
    coordinator: FastSelectAllCoordinator,
    options: GridOptions,
    preset_rx: Option<mpsc::Receiver<Option<PresetFile>>>,
}

impl<T: 'static> GridState<T> {
    pub fn new(
        items: Vec<T>,
        columns: Vec<Column>,
        accessor: Arc<dyn FieldAccessor<T>>,
        options: GridOptions,
    ) -> Self {
        let view = (0..items.len()).collect();
        Self {
            items,
            columns,
            cache: AccessorCache::new(accessor),
            store: FilterCriteriaStore::new(),
            view,
            sort: None,
            popup: None,
            selection: VirtualSelectionModel::with_sync_batch_size(options.select_all.batch_size),
            coordinator: FastSelectAllCoordinator::new(options.select_all),
            options,
            preset_rx: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, field: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field_name == field)
    }

    /// Filtered and sorted rows.
    pub fn view(&self) -> &[RowId] {
        &self.view
    }

    pub fn view_items(&self) -> impl Iterator<Item = &T> + '_ {
        self.view.iter().map(move |&row| &self.items[row])
    }

    pub fn store(&self) -> &FilterCriteriaStore<T> {
        &self.store
    }

    pub fn selection(&self) -> &VirtualSelectionModel {
        &self.selection
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn popup(&self) -> Option<&PopupSession> {
        self.popup.as_ref()
    }

    pub fn popup_mut(&mut self) -> Option<&mut PopupSession> {
        self.popup.as_mut()
    }

    // -------------------------------------------------------------------------
    // Filter popup
    // -------------------------------------------------------------------------

    /// Open the filter popup for `field`. Candidates come from the current
    /// view; when `field` was filtered last, its previous exclusions are
    /// listed too. Returns `None` for an unknown field.
    pub fn open_filter(&mut self, field: &str) -> Option<&mut PopupSession> {
        let started = Instant::now();
        let column = self.column(field)?.clone();
        let reader = self.cache.reader(&column);
        let prior = self.store.get(field);
        let carry_over = self.store.last_filter() == Some(field);

        let rows = self.view.iter().map(|&row| &self.items[row]);
        let candidates = build_candidates(rows, &*reader, prior, carry_over, &self.options.display);
        tracing::debug!(
            field,
            candidates = candidates.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Filter popup opened"
        );

        self.popup = Some(PopupSession::new(
            column,
            candidates,
            self.options.display.language,
            self.options.search_mode,
        ));
        self.popup.as_mut()
    }

    /// Close the popup without applying.
    pub fn close_filter(&mut self) {
        self.popup = None;
    }

    /// Apply the open popup's edits. Returns whether the field is filtered
    /// afterwards; `false` also when no popup is open.
    pub fn apply_filter(&mut self) -> bool {
        let Some(popup) = self.popup.take() else {
            return false;
        };
        let started = Instant::now();
        let field = popup.field_name().to_string();
        let Some(column) = self.column(&field).cloned() else {
            return false;
        };
        let reader = self.cache.reader(&column);

        let empty = ExclusionSet::new();
        let prior = self
            .store
            .get(&field)
            .map(|f| &f.previously_filtered)
            .unwrap_or(&empty);
        let excluded = popup.apply(prior);

        let distinct = collect_distinct(&self.items, &*reader);
        let mut common = FilterCommon::new(&column);
        common.filtered_items = excluded.intersection(&distinct).cloned().collect();
        common.previously_filtered = excluded;

        let filtered = self.store.insert(reader, common);
        self.refresh_view();
        tracing::debug!(
            field = %field,
            filtered,
            rows = self.view.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Filter applied"
        );
        self.persist_if_enabled();
        filtered
    }

    /// Install an exclusion set on `field` directly, without a popup.
    pub fn set_exclusions(&mut self, field: &str, excluded: ExclusionSet) -> bool {
        let Some(column) = self.column(field).cloned() else {
            tracing::warn!(field, "Exclusions for unknown field ignored");
            return false;
        };
        let reader = self.cache.reader(&column);
        let filtered = self.store.add_or_update(reader, excluded);
        self.refresh_view();
        self.persist_if_enabled();
        filtered
    }

    pub fn remove_filter(&mut self, field: &str) {
        self.popup = None;
        if self.store.remove(field) {
            self.refresh_view();
        }
        self.persist_if_enabled();
    }

    pub fn remove_all_filters(&mut self) {
        self.popup = None;
        self.store.remove_all();
        self.refresh_view();
        self.persist_if_enabled();
    }

    /// Recompute the view from the criteria and re-apply the active sort.
    pub fn refresh_view(&mut self) {
        self.view = self.store.apply(&self.items);
        if let Some((field, direction)) = self.sort.clone() {
            self.sort_view(&field, direction);
        }
        if self.selection.is_virtual() {
            self.selection.retain_view(&self.view);
        }
    }

    // -------------------------------------------------------------------------
    // Sorting
    // -------------------------------------------------------------------------

    /// Sort the view by `field` in natural order. Unknown fields are
    /// ignored.
    pub fn sort_by(&mut self, field: &str, direction: SortDirection) {
        if self.column(field).is_none() {
            tracing::warn!(field, "Sort on unknown field ignored");
            return;
        }
        self.sort = Some((field.to_string(), direction));
        self.sort_view(field, direction);
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
        self.refresh_view();
    }

    fn sort_view(&mut self, field: &str, direction: SortDirection) {
        let Some(column) = self.column(field).cloned() else {
            return;
        };
        let reader = self.cache.reader(&column);
        let mut keyed: Vec<(Option<NaturalKey>, RowId)> = self
            .view
            .iter()
            .map(|&row| (reader.read_exact(&self.items[row]).map(|v| NaturalKey::new(&v)), row))
            .collect();
        NaturalSortComparer::new(direction).sort_keyed(&mut keyed);
        self.view = keyed.into_iter().map(|(_, row)| row).collect();
    }

    // -------------------------------------------------------------------------
    // Presets
    // -------------------------------------------------------------------------

    /// Snapshot of the active filters.
    pub fn preset(&self) -> PresetFile {
        PresetFile::from_filters(self.store.active_filters())
    }

    pub fn save_preset_to(&self, path: &Path) -> Result<(), PersistError> {
        persistence::save(&self.preset(), path)
    }

    fn persist_if_enabled(&self) {
        if !self.options.persistent {
            return;
        }
        if let Some(path) = &self.options.preset_path {
            if let Err(e) = self.save_preset_to(path) {
                tracing::warn!(error = %e, "Persistent filter save failed");
            }
        }
    }

    /// Replace every active filter with the reconciled content of `preset`.
    /// Returns the number of filters restored.
    pub fn apply_preset(&mut self, preset: &PresetFile) -> usize {
        let started = Instant::now();
        let restored =
            persistence::reconcile(&preset.filters, &self.items, &self.columns, &mut self.cache);
        self.store.remove_all();
        let count = restored.len();
        for filter in restored {
            self.store.insert(filter.reader, filter.common);
        }
        self.popup = None;
        self.refresh_view();
        tracing::info!(
            restored = count,
            rows = self.view.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Filter preset applied"
        );
        count
    }

    /// Load and apply a preset synchronously. An unusable file restores no
    /// filters and leaves the current ones untouched.
    pub fn load_preset_from(&mut self, path: &Path) -> usize {
        match persistence::load(path) {
            Some(preset) => self.apply_preset(&preset),
            None => 0,
        }
    }

    /// Start loading the configured preset on a worker thread.
    pub fn begin_preset_load(&mut self) -> bool {
        match &self.options.preset_path {
            Some(path) => {
                self.preset_rx = Some(persistence::spawn_load(path.clone()));
                true
            }
            None => false,
        }
    }

    /// Apply the background-loaded preset if it has arrived. Returns the
    /// number of filters restored once the load completes.
    pub fn poll_preset(&mut self) -> Option<usize> {
        let rx = self.preset_rx.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => None,
        };
        self.preset_rx = None;
        Some(match result {
            Some(preset) => self.apply_preset(&preset),
            None => 0,
        })
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Select every row of the view using the strategy the row count calls
    /// for.
    pub fn select_all(&mut self) -> SelectAllOutcome {
        let visible_len = self.view.len().min(VISIBLE_ROW_PREFIX);
        let outcome =
            self.coordinator
                .select_all(&mut self.selection, &self.view, &self.view[..visible_len]);
        if outcome == SelectAllOutcome::Deferred {
            self.selection.select_only(&self.view);
        }
        outcome
    }

    /// Manual gesture: select exactly `rows`.
    pub fn select_rows(&mut self, rows: &[RowId]) {
        self.coordinator.cancel(&mut self.selection);
        self.selection.select_only(rows);
    }

    /// Manual gesture: add `rows` to the selection.
    pub fn add_rows(&mut self, rows: &[RowId]) {
        self.coordinator.cancel(&mut self.selection);
        self.selection.add_to_selection(rows);
    }

    /// Manual gesture: remove `rows` from the selection.
    pub fn remove_rows(&mut self, rows: &[RowId]) {
        self.coordinator.cancel(&mut self.selection);
        self.selection.remove_from_selection(rows);
    }

    /// Per-row checkbox. Keeps virtual mode and edits the exception set.
    /// In virtual mode a row outside the view is already unselected and is
    /// left alone.
    pub fn set_row_selected(&mut self, row: RowId, selected: bool) {
        if selected {
            self.selection.select_row(row);
        } else if !self.selection.is_virtual() || self.view.contains(&row) {
            self.selection.deselect_row(row);
        }
    }

    pub fn clear_selection(&mut self) {
        self.coordinator.cancel(&mut self.selection);
        self.selection.clear();
    }

    /// Advance pending selection work by one chunk (call once per frame).
    pub fn pump(&mut self) -> JobStatus {
        self.coordinator.pump(&mut self.selection)
    }

    /// Finish all pending selection work now.
    pub fn run_pending(&mut self) {
        self.coordinator.run_to_completion(&mut self.selection);
    }

    pub fn effective_selection(&self) -> Vec<RowId> {
        self.selection.effective_selection(&self.view)
    }

    pub fn effective_count(&self) -> usize {
        self.selection.effective_count(self.view.len())
    }

    pub fn is_effectively_selected(&self, row: RowId) -> bool {
        self.selection.is_effectively_selected(row)
    }
}

impl<T> std::fmt::Debug for GridState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridState")
            .field("items", &self.items.len())
            .field("columns", &self.columns)
            .field("view", &self.view.len())
            .field("store", &self.store)
            .field("selection", &self.selection.mode())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accessor::JsonAccessor;
    use crate::core::model::{FieldType, FieldValue, ItemKind};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn grid(rows: Vec<Value>, options: GridOptions) -> GridState<Value> {
        GridState::new(
            rows,
            vec![
                Column::new("n", FieldType::Integer),
                Column::new("name", FieldType::Text),
            ],
            Arc::new(JsonAccessor),
            options,
        )
    }

    fn rows() -> Vec<Value> {
        vec![
            json!({ "n": 1, "name": "item10" }),
            json!({ "n": 2, "name": "item2" }),
            json!({ "n": 2, "name": "item1" }),
            json!({ "n": null, "name": "" }),
        ]
    }

    fn ints(values: &[i64]) -> ExclusionSet {
        values.iter().map(|&n| Some(FieldValue::Integer(n))).collect()
    }

    #[test]
    fn test_popup_apply_filters_view() {
        let mut g = grid(rows(), GridOptions::default());
        let popup = g.open_filter("n").unwrap();
        let idx = popup.position(Some(&FieldValue::Integer(2))).unwrap();
        popup.set_item_checked(idx, false);

        assert!(g.apply_filter());
        assert_eq!(g.view(), &[0, 3]);
        let common = g.store().get("n").unwrap();
        assert_eq!(common.filtered_items, ints(&[2]));
    }

    #[test]
    fn test_reopening_last_filter_lists_excluded_values() {
        let mut g = grid(rows(), GridOptions::default());
        g.set_exclusions("n", ints(&[1]));

        let popup = g.open_filter("n").unwrap();
        let one = popup.position(Some(&FieldValue::Integer(1))).unwrap();
        assert!(!popup.items()[one].is_checked());

        // Rechecking everything clears the filter.
        popup.toggle_select_all(true);
        assert!(!g.apply_filter());
        assert!(g.store().is_empty());
        assert_eq!(g.view().len(), 4);
    }

    #[test]
    fn test_other_field_candidates_come_from_view() {
        let mut g = grid(rows(), GridOptions::default());
        g.set_exclusions("n", ints(&[2]));
        let popup = g.open_filter("name").unwrap();
        let labels: Vec<_> = popup
            .items()
            .iter()
            .filter(|i| i.kind == ItemKind::Value)
            .map(|i| i.label.clone())
            .collect();
        assert_eq!(labels, vec!["item10"]);
    }

    #[test]
    fn test_sort_is_natural_and_survives_refresh() {
        let mut g = grid(rows(), GridOptions::default());
        g.sort_by("name", SortDirection::Ascending);
        assert_eq!(g.view(), &[3, 2, 1, 0]);

        g.set_exclusions("n", ints(&[1]));
        assert_eq!(g.view(), &[3, 2, 1]);

        g.sort_by("name", SortDirection::Descending);
        assert_eq!(g.view(), &[1, 2, 3]);
    }

    #[test]
    fn test_persistent_mode_saves_on_every_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preset.json");
        let options = GridOptions {
            persistent: true,
            preset_path: Some(path.clone()),
            ..Default::default()
        };
        let mut g = grid(rows(), options);

        g.set_exclusions("n", ints(&[2]));
        assert_eq!(persistence::load(&path).unwrap().filters.len(), 1);

        g.remove_all_filters();
        assert!(persistence::load(&path).unwrap().filters.is_empty());
    }

    #[test]
    fn test_background_preset_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preset.json");
        let mut source = grid(rows(), GridOptions::default());
        source.set_exclusions("n", ints(&[1]));
        source.save_preset_to(&path).unwrap();

        let mut g = grid(
            rows(),
            GridOptions {
                preset_path: Some(path),
                ..Default::default()
            },
        );
        assert!(g.begin_preset_load());
        let restored = loop {
            if let Some(n) = g.poll_preset() {
                break n;
            }
            std::thread::yield_now();
        };
        assert_eq!(restored, 1);
        assert_eq!(g.view(), &[1, 2, 3]);
        assert_eq!(g.store().last_filter(), Some("n"));
    }

    #[test]
    fn test_small_select_all_is_plain_selection() {
        let mut g = grid(rows(), GridOptions::default());
        assert_eq!(g.select_all(), SelectAllOutcome::Deferred);
        assert_eq!(g.effective_count(), 4);
        assert_eq!(g.selection().bound().len(), 4);
    }

    fn id_grid(count: usize) -> GridState<Value> {
        GridState::new(
            (0..count).map(|id| json!({ "id": id })).collect(),
            vec![Column::new("id", FieldType::Integer)],
            Arc::new(JsonAccessor),
            GridOptions::default(),
        )
    }

    #[test]
    fn test_manual_gesture_mid_bulk_select_all() {
        let mut g = id_grid(3_500);
        assert_eq!(g.select_all(), SelectAllOutcome::Bulk);
        assert_eq!(g.pump(), JobStatus::Yielded);

        g.select_rows(&[7]);
        g.run_pending();
        assert_eq!(g.effective_selection(), vec![7]);
        assert_eq!(g.selection().bound().as_slice(), &[7]);
    }

    #[test]
    fn test_virtual_count_tracks_filtered_view() {
        let mut g = id_grid(10_000);
        assert_eq!(g.select_all(), SelectAllOutcome::Virtual);
        g.run_pending();

        g.set_row_selected(5, false);
        g.set_exclusions("id", ints(&[5]));
        assert_eq!(g.effective_count(), 9_999);
        assert_eq!(g.effective_selection().len(), 9_999);

        // Deselecting a filtered-out row changes nothing.
        g.set_row_selected(5, false);
        assert_eq!(g.effective_count(), 9_999);
        assert_eq!(g.effective_selection().len(), 9_999);
    }

    #[test]
    fn test_leaving_virtual_resyncs_with_configured_batch_size() {
        let mut g = id_grid(10_000);
        g.select_all();
        g.run_pending();

        let picked: Vec<RowId> = (0..2_500).collect();
        g.select_rows(&picked);
        assert_eq!(g.pump(), JobStatus::Yielded);
        assert_eq!(g.selection().bound().len(), 1_000);
        g.run_pending();
        assert_eq!(g.selection().bound().len(), 2_500);
    }

    #[test]
    fn test_unknown_field_is_ignored() {
        let mut g = grid(rows(), GridOptions::default());
        assert!(g.open_filter("missing").is_none());
        assert!(!g.set_exclusions("missing", ints(&[1])));
        g.sort_by("missing", SortDirection::Ascending);
        assert_eq!(g.view(), &[0, 1, 2, 3]);
    }
}
