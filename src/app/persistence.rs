// FilterGrid - app/persistence.rs
//
// Filter preset persistence: save the active filter descriptors keyed by
// field name and restore them against a possibly different live collection.
//
// - Presets are saved atomically (write→temp, rename→final) so a crash
//   during save never corrupts the previous good preset.
// - An unreadable, corrupt or incompatible preset restores no filters; the
//   failure is logged, never surfaced.
// - Restoration re-types every stored value to the live column type. Values
//   that fail to convert are dropped individually; a record whose field is
//   unknown, whose type changed, or whose exclusions match nothing in the
//   live collection is dropped as a whole.

use crate::core::accessor::{AccessorCache, ColumnReader};
use crate::core::distinct::collect_distinct;
use crate::core::model::{Column, ExclusionSet, FieldValue, FilterCommon};
use crate::core::natural_sort::NaturalSortComparer;
use crate::util::error::{ConvertError, PersistError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Instant;

/// Version stamp for forward-compatibility checks.
///
/// Increment whenever `PresetFile` changes in a breaking way. A mismatch
/// discards the preset.
pub const PRESET_VERSION: u32 = 1;

// =============================================================================
// On-disk data structures
// =============================================================================

/// Complete persisted filter preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetFile {
    /// Schema version; must equal `PRESET_VERSION` to be accepted.
    pub version: u32,

    /// Active filters in application order.
    #[serde(default)]
    pub filters: Vec<PersistedFilter>,
}

impl PresetFile {
    /// Snapshot of the given active filters.
    pub fn from_filters(filters: &[FilterCommon]) -> Self {
        Self {
            version: PRESET_VERSION,
            filters: filters.iter().map(PersistedFilter::from_common).collect(),
        }
    }
}

/// One persisted filter record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedFilter {
    pub field_name: String,

    /// Type identifier of the column when the preset was saved.
    pub field_type: String,

    /// Excluded values. `null` is "no value"; `""` is the empty string.
    #[serde(default)]
    pub previously_filtered_items: Vec<serde_json::Value>,
}

impl PersistedFilter {
    pub fn from_common(common: &FilterCommon) -> Self {
        // Stable file content: values in natural order, "no value" first.
        let comparer = NaturalSortComparer::default();
        let mut values: Vec<Option<&FieldValue>> =
            common.previously_filtered.iter().map(Option::as_ref).collect();
        values.sort_by(|a, b| comparer.compare(*a, *b));

        Self {
            field_name: common.field_name.clone(),
            field_type: common.field_type.type_id().to_string(),
            previously_filtered_items: values
                .into_iter()
                .map(|v| v.map_or(serde_json::Value::Null, FieldValue::to_json))
                .collect(),
        }
    }
}

// =============================================================================
// I/O helpers
// =============================================================================

/// Save `preset` to `path` atomically (write temp → rename).
///
/// Creates all parent directories as needed.
pub fn save(preset: &PresetFile, path: &Path) -> Result<(), PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let json = serde_json::to_string_pretty(preset).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes()).map_err(|source| PersistError::Io {
        path: tmp.clone(),
        source,
    })?;

    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        io_err(e)
    })?;

    tracing::debug!(
        path = %path.display(),
        filters = preset.filters.len(),
        "Filter preset saved"
    );
    Ok(())
}

/// Read and validate a preset, reporting why it is unusable.
pub fn read(path: &Path) -> Result<PresetFile, PersistError> {
    let content = std::fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let preset: PresetFile =
        serde_json::from_str(&content).map_err(|source| PersistError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    if preset.version != PRESET_VERSION {
        return Err(PersistError::VersionMismatch {
            found: preset.version,
            expected: PRESET_VERSION,
        });
    }
    Ok(preset)
}

/// Load a preset from `path`.
///
/// Returns `None` on any error (missing file, malformed JSON, version
/// mismatch); the caller treats that as "no filters restored".
pub fn load(path: &Path) -> Option<PresetFile> {
    match read(path) {
        Ok(preset) => {
            tracing::info!(
                path = %path.display(),
                filters = preset.filters.len(),
                "Filter preset loaded"
            );
            Some(preset)
        }
        Err(PersistError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No filter preset present");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Filter preset unusable, no filters restored");
            None
        }
    }
}

/// Load a preset on a worker thread. The single result arrives on the
/// returned channel; apply it on the owning thread.
pub fn spawn_load(path: PathBuf) -> mpsc::Receiver<Option<PresetFile>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        // The receiver may have been dropped; nothing to do then.
        let _ = tx.send(load(&path));
    });
    rx
}

// =============================================================================
// Reconciliation
// =============================================================================

/// A restored filter, ready to install into the criteria store.
pub struct RestoredFilter<T> {
    pub reader: Arc<ColumnReader<T>>,
    pub common: FilterCommon,
}

/// Re-type one stored value to the live column. `null` is "no value".
fn restore_value<T>(raw: &serde_json::Value, reader: &ColumnReader<T>) -> Option<Option<FieldValue>> {
    if raw.is_null() {
        return Some(None);
    }
    let field_type = reader.field_type();
    let converted = FieldValue::from_json(raw)
        .ok_or_else(|| ConvertError::new(raw, field_type.type_id()))
        .and_then(|value| value.convert(field_type));
    match converted {
        Ok(value) if field_type.is_date() => Some(Some(value.truncate_to_date())),
        Ok(value) => Some(Some(value)),
        Err(e) => {
            tracing::debug!(
                field = %reader.column().field_name,
                error = %e,
                "Persisted filter value dropped"
            );
            None
        }
    }
}

/// Reconcile persisted records against the live collection.
///
/// For each record, the stored exclusions are re-typed and intersected with
/// the field's current distinct values; the intersection becomes the
/// descriptor's `filtered_items`. Records are returned in file order.
pub fn reconcile<T>(
    records: &[PersistedFilter],
    items: &[T],
    columns: &[Column],
    cache: &mut AccessorCache<T>,
) -> Vec<RestoredFilter<T>> {
    let started = Instant::now();
    let mut restored = Vec::with_capacity(records.len());

    for record in records {
        let Some(column) = columns.iter().find(|c| c.field_name == record.field_name) else {
            tracing::warn!(field = %record.field_name, "Persisted filter for unknown field dropped");
            continue;
        };
        if column.field_type.type_id() != record.field_type {
            tracing::warn!(
                field = %record.field_name,
                saved = %record.field_type,
                live = %column.field_type.type_id(),
                "Persisted filter type no longer matches column, dropped"
            );
            continue;
        }

        let reader = cache.reader(column);
        let previously: ExclusionSet = record
            .previously_filtered_items
            .iter()
            .filter_map(|raw| restore_value(raw, &*reader))
            .collect();

        let distinct = collect_distinct(items, &*reader);
        let filtered: ExclusionSet = previously.intersection(&distinct).cloned().collect();
        if filtered.is_empty() {
            tracing::debug!(
                field = %record.field_name,
                "Persisted filter matches no live value, dropped"
            );
            continue;
        }

        let mut common = FilterCommon::new(column);
        common.previously_filtered = previously;
        common.filtered_items = filtered;
        restored.push(RestoredFilter { reader, common });
    }

    tracing::debug!(
        records = records.len(),
        restored = restored.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Filter preset reconciled"
    );
    restored
}

// =============================================================================
// Unit tests
// =============================================================================
