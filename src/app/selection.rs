// FilterGrid - app/selection.rs
//
// Virtual/batched selection model.
//
// Two representations of the same logical selection:
//   - Real:    the materialised per-row selection list is authoritative.
//   - Virtual: every row of the current view is selected except the rows in
//              the exception set; nothing is materialised.
//
// Long-running work (marking the visible prefix on virtual entry, copying
// the effective selection into the bound list) runs as a batch job that the
// host advances one chunk per frame via `step`. A job never touches the
// exception set, so no partial exception-set state is observable between
// chunks. `run_to_completion` drives a job to the end in one call and yields
// exactly the same final state.

use crate::util::constants::{VISIBLE_ROW_PREFIX, VISIBLE_ROW_SUB_BATCH};
use std::collections::HashSet;

/// Index of a row in the grid's source collection.
pub type RowId = usize;

/// Which representation is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Real,
    Virtual,
}

/// Result of advancing the pending batch job by one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// No job was pending.
    Idle,
    /// A chunk was processed and more remain.
    Yielded,
    /// The last chunk was processed.
    Finished,
}

/// Insertion-ordered set of rows with O(1) membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionList {
    order: Vec<RowId>,
    members: HashSet<RowId>,
}

impl SelectionList {
    pub fn insert(&mut self, row: RowId) -> bool {
        if self.members.insert(row) {
            self.order.push(row);
            true
        } else {
            false
        }
    }

    pub fn remove(&mut self, row: RowId) -> bool {
        if self.members.remove(&row) {
            self.order.retain(|&r| r != row);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, row: RowId) -> bool {
        self.members.contains(&row)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[RowId] {
        &self.order
    }
}

impl FromIterator<RowId> for SelectionList {
    fn from_iter<I: IntoIterator<Item = RowId>>(iter: I) -> Self {
        let mut list = Self::default();
        for row in iter {
            list.insert(row);
        }
        list
    }
}

#[derive(Debug, Clone)]
enum BatchJob {
    /// Mark a bounded prefix of visible rows selected for visual feedback.
    MarkVisible { rows: Vec<RowId>, cursor: usize },
    /// Copy a snapshot of the effective selection into the bound list.
    SyncBound {
        rows: Vec<RowId>,
        cursor: usize,
        batch_size: usize,
    },
}

/// Selection state of one grid.
#[derive(Debug, Clone, Default)]
pub struct VirtualSelectionModel {
    mode: SelectionMode,
    exceptions: HashSet<RowId>,
    /// The host's materialised selection.
    selected: SelectionList,
    /// The host-bound mirror of the selection.
    bound: SelectionList,
    suppress_sync: bool,
    /// Rows per step when resynchronising the bound list after leaving
    /// virtual mode; 0 = one step.
    sync_batch_size: usize,
    job: Option<BatchJob>,
}

impl VirtualSelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sync_batch_size(sync_batch_size: usize) -> Self {
        Self {
            sync_batch_size,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_virtual(&self) -> bool {
        self.mode == SelectionMode::Virtual
    }

    pub fn exceptions(&self) -> &HashSet<RowId> {
        &self.exceptions
    }

    /// The materialised selection list.
    pub fn selected(&self) -> &SelectionList {
        &self.selected
    }

    /// The bound mirror list.
    pub fn bound(&self) -> &SelectionList {
        &self.bound
    }

    pub fn has_pending_job(&self) -> bool {
        self.job.is_some()
    }

    /// Suppress immediate mirroring of manual changes into the bound list.
    pub fn set_suppress_sync(&mut self, suppress: bool) {
        self.suppress_sync = suppress;
    }

    pub fn is_sync_suppressed(&self) -> bool {
        self.suppress_sync
    }

    // -------------------------------------------------------------------------
    // Mode transitions
    // -------------------------------------------------------------------------

    /// Real → Virtual. `visible` is the currently materialised rows in
    /// display order; at most `VISIBLE_ROW_PREFIX` of them are marked
    /// selected by the scheduled job.
    pub fn enter_virtual(&mut self, visible: &[RowId]) {
        self.mode = SelectionMode::Virtual;
        self.exceptions.clear();
        let prefix = visible.iter().copied().take(VISIBLE_ROW_PREFIX).collect();
        self.job = Some(BatchJob::MarkVisible {
            rows: prefix,
            cursor: 0,
        });
        tracing::debug!(visible = visible.len(), "Virtual selection entered");
    }

    /// Real select-all over `view`, bypassing mirroring. Used by the fast
    /// path; the caller schedules the bulk sync.
    pub fn select_all_rows(&mut self, view: &[RowId]) {
        self.mode = SelectionMode::Real;
        self.exceptions.clear();
        self.job = None;
        self.selected = view.iter().copied().collect();
    }

    /// Abandon any in-flight job and discard virtual mode (if active) ahead
    /// of a manual gesture. The materialised list is kept as is. Returns
    /// whether virtual mode was left.
    fn prepare_gesture(&mut self) -> bool {
        if self.job.take().is_some() {
            tracing::debug!("Pending selection job abandoned on manual gesture");
        }
        if self.mode != SelectionMode::Virtual {
            return false;
        }
        self.mode = SelectionMode::Real;
        self.exceptions.clear();
        tracing::debug!("Virtual selection left on manual gesture");
        true
    }

    /// Clear the selection entirely and return to `Real` with nothing
    /// selected.
    pub fn clear(&mut self) {
        self.mode = SelectionMode::Real;
        self.exceptions.clear();
        self.selected.clear();
        self.bound.clear();
        self.job = None;
    }

    // -------------------------------------------------------------------------
    // Per-row edits
    // -------------------------------------------------------------------------

    /// Deselect one row. In `Virtual` mode this records an exception only;
    /// the caller passes rows of the current view.
    pub fn deselect_row(&mut self, row: RowId) {
        match self.mode {
            SelectionMode::Virtual => {
                self.exceptions.insert(row);
            }
            SelectionMode::Real => {
                self.selected.remove(row);
                if !self.suppress_sync {
                    self.bound.remove(row);
                }
            }
        }
    }

    /// Select one row. In `Virtual` mode this lifts an exception only.
    pub fn select_row(&mut self, row: RowId) {
        match self.mode {
            SelectionMode::Virtual => {
                self.exceptions.remove(&row);
            }
            SelectionMode::Real => {
                self.selected.insert(row);
                if !self.suppress_sync {
                    self.bound.insert(row);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Manual gestures (click, drag, keyboard range)
    // -------------------------------------------------------------------------

    /// Replace the selection with exactly `rows`.
    pub fn select_only(&mut self, rows: &[RowId]) {
        let left_virtual = self.prepare_gesture();
        self.selected = rows.iter().copied().collect();
        self.after_gesture(left_virtual);
    }

    /// Add `rows` to the selection.
    pub fn add_to_selection(&mut self, rows: &[RowId]) {
        let left_virtual = self.prepare_gesture();
        for &row in rows {
            self.selected.insert(row);
        }
        self.after_gesture(left_virtual);
    }

    /// Remove `rows` from the selection.
    pub fn remove_from_selection(&mut self, rows: &[RowId]) {
        let left_virtual = self.prepare_gesture();
        for &row in rows {
            self.selected.remove(row);
        }
        self.after_gesture(left_virtual);
    }

    fn after_gesture(&mut self, left_virtual: bool) {
        if left_virtual {
            self.schedule_sync(&[], self.sync_batch_size);
        } else if !self.suppress_sync {
            self.bound = self.selected.clone();
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Effective selection. Virtual: rows of `view` minus exceptions, in view
    /// order. Real: the materialised list as is.
    pub fn effective_selection(&self, view: &[RowId]) -> Vec<RowId> {
        match self.mode {
            SelectionMode::Virtual => view
                .iter()
                .copied()
                .filter(|row| !self.exceptions.contains(row))
                .collect(),
            SelectionMode::Real => self.selected.as_slice().to_vec(),
        }
    }

    pub fn is_effectively_selected(&self, row: RowId) -> bool {
        match self.mode {
            SelectionMode::Virtual => !self.exceptions.contains(&row),
            SelectionMode::Real => self.selected.contains(row),
        }
    }

    /// Number of effectively selected rows given the view size.
    pub fn effective_count(&self, view_len: usize) -> usize {
        match self.mode {
            SelectionMode::Virtual => view_len.saturating_sub(self.exceptions.len()),
            SelectionMode::Real => self.selected.len(),
        }
    }

    /// Drop exceptions for rows that left the view, so the exception set
    /// only ever names rows of `view`.
    pub fn retain_view(&mut self, view: &[RowId]) {
        if self.exceptions.is_empty() {
            return;
        }
        let in_view: HashSet<RowId> = view.iter().copied().collect();
        let before = self.exceptions.len();
        self.exceptions.retain(|row| in_view.contains(row));
        if self.exceptions.len() != before {
            tracing::debug!(
                dropped = before - self.exceptions.len(),
                "Selection exceptions outside the view dropped"
            );
        }
    }

    // -------------------------------------------------------------------------
    // Batch jobs
    // -------------------------------------------------------------------------

    /// Clear the bound list and schedule copying the current effective
    /// selection into it, `batch_size` rows per step (0 = one step).
    pub fn schedule_sync(&mut self, view: &[RowId], batch_size: usize) {
        self.bound.clear();
        let rows = self.effective_selection(view);
        self.job = Some(BatchJob::SyncBound {
            rows,
            cursor: 0,
            batch_size,
        });
    }

    /// Advance the pending job by one chunk.
    pub fn step(&mut self) -> JobStatus {
        let Some(job) = self.job.as_mut() else {
            return JobStatus::Idle;
        };
        let done = match job {
            BatchJob::MarkVisible { rows, cursor } => {
                let end = (*cursor + VISIBLE_ROW_SUB_BATCH).min(rows.len());
                for &row in &rows[*cursor..end] {
                    if !self.exceptions.contains(&row) {
                        self.selected.insert(row);
                    }
                }
                *cursor = end;
                end >= rows.len()
            }
            BatchJob::SyncBound {
                rows,
                cursor,
                batch_size,
            } => {
                let end = if *batch_size == 0 {
                    rows.len()
                } else {
                    (*cursor + *batch_size).min(rows.len())
                };
                for &row in &rows[*cursor..end] {
                    self.bound.insert(row);
                }
                *cursor = end;
                end >= rows.len()
            }
        };
        if done {
            self.job = None;
            JobStatus::Finished
        } else {
            JobStatus::Yielded
        }
    }

    /// Drive the pending job to the end. Returns the number of steps taken.
    pub fn run_to_completion(&mut self) -> usize {
        let mut steps = 0;
        while self.step() != JobStatus::Idle {
            steps += 1;
        }
        steps
    }
}

// =============================================================================
// Unit tests
// =============================================================================
