// FilterGrid - core/criteria.rs
//
// Multi-column filter criteria. One exclusion predicate per filtered field,
// all AND-combined. A field whose exclusion set becomes empty is removed
// outright, so "no exclusions" always means "no filter".
// Core layer: pure logic, no I/O.

use crate::core::accessor::ColumnReader;
use crate::core::model::{ExclusionSet, FilterCommon};
use std::collections::HashMap;
use std::sync::Arc;

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Owns the criteria map and the ordered list of active filter descriptors
/// for one grid.
pub struct FilterCriteriaStore<T> {
    predicates: HashMap<String, Predicate<T>>,
    active: Vec<FilterCommon>,
    last_filter: Option<String>,
}

impl<T> Default for FilterCriteriaStore<T> {
    fn default() -> Self {
        Self {
            predicates: HashMap::new(),
            active: Vec::new(),
            last_filter: None,
        }
    }
}

impl<T: 'static> FilterCriteriaStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the filter on `reader`'s field from a bare
    /// exclusion set. Returns whether the field is filtered afterwards.
    pub fn add_or_update(&mut self, reader: Arc<ColumnReader<T>>, excluded: ExclusionSet) -> bool {
        let mut common = FilterCommon::new(reader.column());
        common.filtered_items = excluded.clone();
        common.previously_filtered = excluded;
        self.insert(reader, common)
    }

    /// Install or replace the filter described by `common`.
    ///
    /// An existing descriptor keeps its position in the active list. An empty
    /// exclusion set removes the field instead.
    pub fn insert(&mut self, reader: Arc<ColumnReader<T>>, common: FilterCommon) -> bool {
        let field = common.field_name.clone();
        if !common.is_filtered() {
            self.remove(&field);
            return false;
        }

        let excluded = Arc::new(common.previously_filtered.clone());
        let predicate: Predicate<T> =
            Box::new(move |item: &T| !excluded.contains(&reader.read(item)));
        self.predicates.insert(field.clone(), predicate);

        match self.active.iter_mut().find(|f| f.field_name == field) {
            Some(existing) => *existing = common,
            None => self.active.push(common),
        }
        tracing::debug!(field = %field, active = self.active.len(), "Filter stored");
        self.last_filter = Some(field);
        true
    }

    /// Drop the filter on `field`. No-op if absent.
    pub fn remove(&mut self, field: &str) -> bool {
        let had_predicate = self.predicates.remove(field).is_some();
        let before = self.active.len();
        self.active.retain(|f| f.field_name != field);
        self.last_filter = self.active.last().map(|f| f.field_name.clone());
        had_predicate || before != self.active.len()
    }

    /// Drop every filter.
    pub fn remove_all(&mut self) {
        self.predicates.clear();
        self.active.clear();
        self.last_filter = None;
    }
}

impl<T> FilterCriteriaStore<T> {
    /// Aggregate predicate: true iff every active filter accepts `item`.
    pub fn matches(&self, item: &T) -> bool {
        self.predicates.values().all(|p| p(item))
    }

    /// Indices of the items accepted by every active filter.
    pub fn apply(&self, items: &[T]) -> Vec<usize> {
        if self.predicates.is_empty() {
            return (0..items.len()).collect();
        }
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.matches(item))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn get(&self, field: &str) -> Option<&FilterCommon> {
        self.active.iter().find(|f| f.field_name == field)
    }

    pub fn is_filtered(&self, field: &str) -> bool {
        self.predicates.contains_key(field)
    }

    /// Active filters in the order they were first applied.
    pub fn active_filters(&self) -> &[FilterCommon] {
        &self.active
    }

    /// Field edited most recently, or the last remaining filter after a
    /// removal.
    pub fn last_filter(&self) -> Option<&str> {
        self.last_filter.as_deref()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl<T> std::fmt::Debug for FilterCriteriaStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCriteriaStore")
            .field("active", &self.active)
            .field("last_filter", &self.last_filter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accessor::JsonAccessor;
    use crate::core::model::{Column, FieldType, FieldValue};
    use serde_json::{json, Value};

    fn reader(name: &str, field_type: FieldType) -> Arc<ColumnReader<Value>> {
        Arc::new(ColumnReader::new(Column::new(name, field_type), Arc::new(JsonAccessor)))
    }

    fn excl(values: &[Option<FieldValue>]) -> ExclusionSet {
        values.iter().cloned().collect()
    }

    fn rows() -> Vec<Value> {
        vec![
            json!({ "n": 1, "s": "a" }),
            json!({ "n": 2, "s": "" }),
            json!({ "n": 3 }),
            json!({ "n": null, "s": "b" }),
        ]
    }

    #[test]
    fn test_empty_store_accepts_everything() {
        let store: FilterCriteriaStore<Value> = FilterCriteriaStore::new();
        assert!(store.matches(&json!({})));
        assert_eq!(store.apply(&rows()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_aggregate_is_conjunction() {
        let mut store = FilterCriteriaStore::new();
        store.add_or_update(
            reader("n", FieldType::Integer),
            excl(&[Some(FieldValue::Integer(2))]),
        );
        store.add_or_update(reader("s", FieldType::Text), excl(&[None]));

        let rows = rows();
        assert_eq!(store.apply(&rows), vec![0, 3]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.last_filter(), Some("s"));
    }

    #[test]
    fn test_text_blank_and_empty_string_are_independent() {
        let rows = rows();
        let mut store = FilterCriteriaStore::new();
        store.add_or_update(
            reader("s", FieldType::Text),
            excl(&[Some(FieldValue::Text(String::new()))]),
        );
        assert_eq!(store.apply(&rows), vec![0, 2, 3]);

        store.add_or_update(
            reader("s", FieldType::Text),
            excl(&[None, Some(FieldValue::Text(String::new()))]),
        );
        assert_eq!(store.apply(&rows), vec![0, 3]);
    }

    #[test]
    fn test_emptied_exclusion_set_removes_filter() {
        let mut store = FilterCriteriaStore::new();
        let n = reader("n", FieldType::Integer);
        store.add_or_update(Arc::clone(&n), excl(&[Some(FieldValue::Integer(1))]));
        assert!(store.is_filtered("n"));

        let still = store.add_or_update(n, ExclusionSet::new());
        assert!(!still);
        assert!(!store.is_filtered("n"));
        assert!(store.get("n").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_keeps_position_and_remove_restores_last_filter() {
        let mut store = FilterCriteriaStore::new();
        let n = reader("n", FieldType::Integer);
        let s = reader("s", FieldType::Text);
        store.add_or_update(Arc::clone(&n), excl(&[Some(FieldValue::Integer(1))]));
        store.add_or_update(Arc::clone(&s), excl(&[None]));
        store.add_or_update(n, excl(&[Some(FieldValue::Integer(2))]));

        let order: Vec<_> = store.active_filters().iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(order, vec!["n", "s"]);
        assert_eq!(store.last_filter(), Some("n"));

        assert!(store.remove("n"));
        assert_eq!(store.last_filter(), Some("s"));
        assert!(!store.remove("missing"));
    }

    #[test]
    fn test_remove_all_clears_everything() {
        let mut store = FilterCriteriaStore::new();
        store.add_or_update(reader("n", FieldType::Integer), excl(&[None]));
        store.remove_all();
        assert!(store.is_empty());
        assert!(store.active_filters().is_empty());
        assert_eq!(store.last_filter(), None);
    }

    #[test]
    fn test_unreadable_value_counts_as_absent() {
        let mut store = FilterCriteriaStore::new();
        store.add_or_update(reader("n", FieldType::Integer), excl(&[None]));
        assert!(!store.matches(&json!({ "n": "not a number" })));
        assert!(store.matches(&json!({ "n": 4 })));
    }
}
