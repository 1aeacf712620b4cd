// FilterGrid - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "FilterGrid";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "FilterGrid";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Selection thresholds
// =============================================================================

/// Item count at or above which select-all takes the fast (batched) path
/// instead of the host's default select-all.
pub const DEFAULT_FAST_SELECT_ALL_THRESHOLD: usize = 3_000;

/// Batch size used when bulk-synchronising the bound selection list after a
/// fast select-all. 0 means copy everything in a single pass.
pub const DEFAULT_FAST_SELECT_ALL_BATCH_SIZE: usize = 1_000;

/// Item count at or above which select-all switches to virtual selection
/// ("all items except an exception set").
pub const DEFAULT_VIRTUAL_SELECT_THRESHOLD: usize = 5_000;

/// Hard upper bound accepted for either threshold from config.
pub const ABSOLUTE_MAX_SELECT_THRESHOLD: usize = 100_000_000;

/// Hard upper bound accepted for the bulk-sync batch size from config.
pub const ABSOLUTE_MAX_SYNC_BATCH_SIZE: usize = 1_000_000;

/// Maximum number of materialised rows marked selected for immediate visual
/// feedback when entering virtual selection.
pub const VISIBLE_ROW_PREFIX: usize = 50;

/// Rows processed between yields while marking the visible prefix.
pub const VISIBLE_ROW_SUB_BATCH: usize = 10;

// =============================================================================
// Sorting
// =============================================================================

/// Distinct-value count above which candidate sorting runs on the rayon pool.
/// Below this the sequential sort is cheaper than the fork/join overhead.
pub const PARALLEL_SORT_THRESHOLD: usize = 10_000;

// =============================================================================
// Filter popup
// =============================================================================

/// Default label format for date values (chrono strftime syntax).
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted formats when re-typing a persisted date value, tried in order.
pub const DATE_PARSE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Date-only formats tried after `DATE_PARSE_FORMATS`.
pub const DATE_ONLY_PARSE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Format used when writing date values into a preset file.
pub const PRESET_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Popup language codes accepted in config.toml.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "fr", "de", "es"];

/// Default popup language code.
pub const DEFAULT_LANGUAGE: &str = "en";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Filter preset file name (stored in the platform data directory).
pub const PRESET_FILE_NAME: &str = "filter_preset.json";
