// FilterGrid - core/accessor.rs
//
// Field access capability. The core never inspects items itself: the host
// injects a `FieldAccessor` and the core reads values through a
// `ColumnReader`, which pairs a pre-split field path with the column's
// declared type.
//
// Accessor failures (missing field, wrong type) are "no value"; they are
// never propagated.

use crate::core::model::{Column, FieldType, FieldValue};
use std::collections::HashMap;
use std::sync::Arc;

/// A dotted field path, split once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        Self {
            raw: path.to_string(),
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Reads a field value from an item by path.
///
/// Returning `None` covers both a genuinely absent value and any lookup
/// failure.
pub trait FieldAccessor<T>: Send + Sync {
    fn get(&self, item: &T, path: &FieldPath) -> Option<FieldValue>;
}

impl<T, F> FieldAccessor<T> for F
where
    F: Fn(&T, &FieldPath) -> Option<FieldValue> + Send + Sync,
{
    fn get(&self, item: &T, path: &FieldPath) -> Option<FieldValue> {
        self(item, path)
    }
}

/// Accessor over `serde_json::Value` rows, walking nested objects by path
/// segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAccessor;

impl FieldAccessor<serde_json::Value> for JsonAccessor {
    fn get(&self, item: &serde_json::Value, path: &FieldPath) -> Option<FieldValue> {
        let mut current = item;
        for segment in path.segments() {
            current = current.as_object()?.get(segment)?;
        }
        FieldValue::from_json(current)
    }
}

/// A compiled accessor for one column: reads the raw value, re-types it to
/// the declared type and, for date columns, truncates it to the date.
pub struct ColumnReader<T> {
    column: Column,
    path: FieldPath,
    accessor: Arc<dyn FieldAccessor<T>>,
}

impl<T> ColumnReader<T> {
    pub fn new(column: Column, accessor: Arc<dyn FieldAccessor<T>>) -> Self {
        let path = FieldPath::parse(&column.field_name);
        Self {
            column,
            path,
            accessor,
        }
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn field_type(&self) -> &FieldType {
        &self.column.field_type
    }

    /// Typed value of the field, or `None` when absent or not convertible.
    pub fn read(&self, item: &T) -> Option<FieldValue> {
        let raw = self.accessor.get(item, &self.path)?;
        match raw.convert(&self.column.field_type) {
            Ok(value) if self.column.field_type.is_date() => Some(value.truncate_to_date()),
            Ok(value) => Some(value),
            Err(e) => {
                tracing::trace!(field = %self.path.as_str(), error = %e, "Field treated as absent");
                None
            }
        }
    }

    /// Typed value without date truncation, used for row sorting.
    pub fn read_exact(&self, item: &T) -> Option<FieldValue> {
        self.accessor
            .get(item, &self.path)?
            .convert(&self.column.field_type)
            .ok()
    }
}

impl<T> std::fmt::Debug for ColumnReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnReader")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// Memoises compiled readers per column so each path is parsed once.
pub struct AccessorCache<T> {
    accessor: Arc<dyn FieldAccessor<T>>,
    readers: HashMap<Column, Arc<ColumnReader<T>>>,
}

impl<T> AccessorCache<T> {
    pub fn new(accessor: Arc<dyn FieldAccessor<T>>) -> Self {
        Self {
            accessor,
            readers: HashMap::new(),
        }
    }

    pub fn reader(&mut self, column: &Column) -> Arc<ColumnReader<T>> {
        if let Some(reader) = self.readers.get(column) {
            return Arc::clone(reader);
        }
        let reader = Arc::new(ColumnReader::new(column.clone(), Arc::clone(&self.accessor)));
        self.readers.insert(column.clone(), Arc::clone(&reader));
        reader
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}
