// FilterGrid - app/select_all.rs
//
// Fast select-all: picks a strategy from the row count and drives it.
//
//   count <  fast threshold                → host default select-all
//   fast  ≤ count < virtual threshold      → real select-all, bound list
//                                            synced in batches afterwards
//   count ≥ virtual threshold              → virtual selection
//
// A request arriving while a previous one is still batching is ignored.

use crate::app::selection::{JobStatus, RowId, VirtualSelectionModel};
use crate::util::constants::{
    DEFAULT_FAST_SELECT_ALL_BATCH_SIZE, DEFAULT_FAST_SELECT_ALL_THRESHOLD,
    DEFAULT_VIRTUAL_SELECT_THRESHOLD,
};

/// Select-all thresholds, normally taken from `[selection]` in config.toml.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectAllConfig {
    pub fast_threshold: usize,
    /// Bound-list sync batch size; 0 syncs in one pass.
    pub batch_size: usize,
    pub virtual_threshold: usize,
}

impl Default for SelectAllConfig {
    fn default() -> Self {
        Self {
            fast_threshold: DEFAULT_FAST_SELECT_ALL_THRESHOLD,
            batch_size: DEFAULT_FAST_SELECT_ALL_BATCH_SIZE,
            virtual_threshold: DEFAULT_VIRTUAL_SELECT_THRESHOLD,
        }
    }
}

/// Strategy chosen for one select-all request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllOutcome {
    /// Below the fast threshold; the host's own select-all applies.
    Deferred,
    /// Real select-all with a batched bound-list sync scheduled.
    Bulk,
    /// Virtual selection entered.
    Virtual,
    /// A previous request is still in flight.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct FastSelectAllCoordinator {
    config: SelectAllConfig,
    in_flight: bool,
}

impl FastSelectAllCoordinator {
    pub fn new(config: SelectAllConfig) -> Self {
        Self {
            config,
            in_flight: false,
        }
    }

    pub fn config(&self) -> &SelectAllConfig {
        &self.config
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Strategy for `count` rows, ignoring the in-flight guard.
    ///
    /// The virtual threshold is checked only once the fast threshold is met,
    /// so a fast threshold above the virtual one simply defers below it.
    pub fn decide(&self, count: usize) -> SelectAllOutcome {
        if count < self.config.fast_threshold {
            SelectAllOutcome::Deferred
        } else if count >= self.config.virtual_threshold {
            SelectAllOutcome::Virtual
        } else {
            SelectAllOutcome::Bulk
        }
    }

    /// Start a select-all over `view` (the filtered rows in display order).
    /// `visible` is the materialised prefix used for virtual feedback.
    pub fn select_all(
        &mut self,
        model: &mut VirtualSelectionModel,
        view: &[RowId],
        visible: &[RowId],
    ) -> SelectAllOutcome {
        if self.in_flight {
            tracing::debug!("Select-all ignored, previous request still running");
            return SelectAllOutcome::Ignored;
        }
        let outcome = self.decide(view.len());
        match outcome {
            SelectAllOutcome::Bulk => {
                self.in_flight = true;
                model.set_suppress_sync(true);
                model.select_all_rows(view);
                model.schedule_sync(view, self.config.batch_size);
            }
            SelectAllOutcome::Virtual => {
                self.in_flight = true;
                model.enter_virtual(visible);
            }
            SelectAllOutcome::Deferred | SelectAllOutcome::Ignored => {}
        }
        tracing::debug!(rows = view.len(), outcome = ?outcome, "Select-all requested");
        outcome
    }

    /// Advance the model's pending job by one chunk; clears the in-flight
    /// guard and lifts sync suppression once the job is done.
    pub fn pump(&mut self, model: &mut VirtualSelectionModel) -> JobStatus {
        let status = model.step();
        if self.in_flight && status != JobStatus::Yielded {
            self.finish(model);
        }
        status
    }

    pub fn run_to_completion(&mut self, model: &mut VirtualSelectionModel) {
        while self.pump(model) != JobStatus::Idle {}
    }

    /// Abandon the in-flight request (a manual gesture arrived mid-batch).
    pub fn cancel(&mut self, model: &mut VirtualSelectionModel) {
        if self.in_flight {
            tracing::debug!("Select-all abandoned");
            self.finish(model);
        }
    }

    fn finish(&mut self, model: &mut VirtualSelectionModel) {
        self.in_flight = false;
        model.set_suppress_sync(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::selection::SelectionMode;

    fn view(n: usize) -> Vec<RowId> {
        (0..n).collect()
    }

    #[test]
    fn test_strategy_by_thresholds() {
        let c = FastSelectAllCoordinator::default();
        assert_eq!(c.decide(2_999), SelectAllOutcome::Deferred);
        assert_eq!(c.decide(3_000), SelectAllOutcome::Bulk);
        assert_eq!(c.decide(4_999), SelectAllOutcome::Bulk);
        assert_eq!(c.decide(5_000), SelectAllOutcome::Virtual);
    }

    #[test]
    fn test_inverted_thresholds_skip_fast_path_below_fast_threshold() {
        let c = FastSelectAllCoordinator::new(SelectAllConfig {
            fast_threshold: 8_000,
            batch_size: 100,
            virtual_threshold: 5_000,
        });
        assert_eq!(c.decide(6_000), SelectAllOutcome::Deferred);
        assert_eq!(c.decide(8_000), SelectAllOutcome::Virtual);
    }

    #[test]
    fn test_bulk_path_suppresses_then_syncs_in_batches() {
        let rows = view(3_500);
        let mut model = VirtualSelectionModel::new();
        let mut c = FastSelectAllCoordinator::default();

        assert_eq!(c.select_all(&mut model, &rows, &rows), SelectAllOutcome::Bulk);
        assert!(model.is_sync_suppressed());
        assert_eq!(model.selected().len(), 3_500);
        assert!(model.bound().is_empty());

        assert_eq!(c.pump(&mut model), JobStatus::Yielded);
        assert_eq!(model.bound().len(), 1_000);
        assert!(c.is_in_flight());

        c.run_to_completion(&mut model);
        assert_eq!(model.bound().len(), 3_500);
        assert!(!c.is_in_flight());
        assert!(!model.is_sync_suppressed());
    }

    #[test]
    fn test_reentrant_request_is_ignored() {
        let rows = view(10_000);
        let mut model = VirtualSelectionModel::new();
        let mut c = FastSelectAllCoordinator::default();

        assert_eq!(c.select_all(&mut model, &rows, &rows), SelectAllOutcome::Virtual);
        model.deselect_row(1);
        assert_eq!(c.select_all(&mut model, &rows, &rows), SelectAllOutcome::Ignored);
        assert!(model.exceptions().contains(&1), "second request must not reset state");

        c.run_to_completion(&mut model);
        assert!(!c.is_in_flight());
        assert_eq!(model.mode(), SelectionMode::Virtual);
    }

    #[test]
    fn test_small_view_defers_to_host() {
        let rows = view(10);
        let mut model = VirtualSelectionModel::new();
        let mut c = FastSelectAllCoordinator::default();
        assert_eq!(c.select_all(&mut model, &rows, &rows), SelectAllOutcome::Deferred);
        assert!(!c.is_in_flight());
        assert!(model.selected().is_empty());
    }
}
