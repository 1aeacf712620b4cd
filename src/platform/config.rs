// FilterGrid - platform/config.rs
//
// Platform-specific configuration, data directory resolution, and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use chrono::format::{Item, StrftimeItems};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for FilterGrid configuration and presets.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/filtergrid/ or %APPDATA%\FilterGrid\config\)
    pub config_dir: PathBuf,

    /// Data directory holding filter presets.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
                data_dir: PathBuf::from("."),
            }
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }

    /// Where the named preset file lives. Absolute names are used as is.
    pub fn preset_file(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub selection: SelectionSection,
    pub filter: FilterSection,
    pub logging: LoggingSection,
}

/// `[selection]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SelectionSection {
    pub fast_select_all_threshold: Option<usize>,
    /// 0 = synchronise the bound list in one pass.
    pub fast_select_all_batch_size: Option<usize>,
    pub virtual_select_threshold: Option<usize>,
}

/// `[filter]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct FilterSection {
    /// Save the preset after every apply/remove.
    pub persistent: Option<bool>,
    pub preset_file: Option<String>,
    /// Popup language code: "en", "fr", "de" or "es".
    pub language: Option<String>,
    /// Prefix search instead of substring search.
    pub starts_with: Option<bool>,
    /// strftime format for date labels.
    pub date_format: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Selection --
    pub fast_select_all_threshold: usize,
    pub fast_select_all_batch_size: usize,
    pub virtual_select_threshold: usize,

    // -- Filter --
    pub persistent: bool,
    pub preset_file: String,
    pub language: String,
    pub starts_with: bool,
    pub date_format: String,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fast_select_all_threshold: constants::DEFAULT_FAST_SELECT_ALL_THRESHOLD,
            fast_select_all_batch_size: constants::DEFAULT_FAST_SELECT_ALL_BATCH_SIZE,
            virtual_select_threshold: constants::DEFAULT_VIRTUAL_SELECT_THRESHOLD,
            persistent: false,
            preset_file: constants::PRESET_FILE_NAME.to_string(),
            language: constants::DEFAULT_LANGUAGE.to_string(),
            starts_with: false,
            date_format: constants::DEFAULT_DATE_FORMAT.to_string(),
            log_level: None,
        }
    }
}

/// Whether `format` is a strftime pattern chrono can render.
fn is_valid_date_format(format: &str) -> bool {
    !format.is_empty() && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

fn out_of_range(field: &str, value: impl ToString, expected: impl ToString) -> String {
    ConfigError::ValueOutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
    .to_string()
}

/// Load and validate `config.toml` at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing file yields defaults with no warnings; an unreadable or
/// unparseable file yields defaults with one warning.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let raw = match read_raw(config_path) {
        Ok(raw) => raw,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");
    let config = validate(raw, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }
    (config, warnings)
}

/// Validate each field against named constants, accumulating all warnings.
pub fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();
    let max = constants::ABSOLUTE_MAX_SELECT_THRESHOLD;

    // -- Selection: thresholds --
    if let Some(n) = raw.selection.fast_select_all_threshold {
        if (1..=max).contains(&n) {
            config.fast_select_all_threshold = n;
        } else {
            warnings.push(out_of_range(
                "selection.fast_select_all_threshold",
                n,
                format!("1-{max}"),
            ));
        }
    }
    if let Some(n) = raw.selection.virtual_select_threshold {
        if (1..=max).contains(&n) {
            config.virtual_select_threshold = n;
        } else {
            warnings.push(out_of_range(
                "selection.virtual_select_threshold",
                n,
                format!("1-{max}"),
            ));
        }
    }
    if let Some(n) = raw.selection.fast_select_all_batch_size {
        if n <= constants::ABSOLUTE_MAX_SYNC_BATCH_SIZE {
            config.fast_select_all_batch_size = n;
        } else {
            warnings.push(out_of_range(
                "selection.fast_select_all_batch_size",
                n,
                format!("0-{}", constants::ABSOLUTE_MAX_SYNC_BATCH_SIZE),
            ));
        }
    }
    if config.fast_select_all_threshold > config.virtual_select_threshold {
        warnings.push(format!(
            "[selection] fast_select_all_threshold ({}) exceeds virtual_select_threshold ({}); \
             the fast path is skipped below {}.",
            config.fast_select_all_threshold,
            config.virtual_select_threshold,
            config.fast_select_all_threshold,
        ));
    }

    // -- Filter --
    if let Some(persistent) = raw.filter.persistent {
        config.persistent = persistent;
    }
    if let Some(starts_with) = raw.filter.starts_with {
        config.starts_with = starts_with;
    }
    if let Some(file) = raw.filter.preset_file {
        if file.trim().is_empty() {
            warnings.push(format!(
                "[filter] preset_file is empty. Using default ({}).",
                constants::PRESET_FILE_NAME
            ));
        } else {
            config.preset_file = file;
        }
    }
    if let Some(language) = raw.filter.language {
        let code = language.trim().to_lowercase();
        if constants::SUPPORTED_LANGUAGES.contains(&code.as_str()) {
            config.language = code;
        } else {
            warnings.push(format!(
                "[filter] language = \"{language}\" is not supported. Valid values: {}. Using default ({}).",
                constants::SUPPORTED_LANGUAGES.join(", "),
                constants::DEFAULT_LANGUAGE,
            ));
        }
    }
    if let Some(format) = raw.filter.date_format {
        if is_valid_date_format(&format) {
            config.date_format = format;
        } else {
            warnings.push(format!(
                "[filter] date_format = \"{format}\" is not a valid strftime pattern. Using default ({}).",
                constants::DEFAULT_DATE_FORMAT,
            ));
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    config
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join(constants::CONFIG_FILE_NAME);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let (config, warnings) = load_config(&dir.path().join("config.toml"));
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_valid_config_is_applied() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[selection]
fast_select_all_threshold = 100
fast_select_all_batch_size = 0
virtual_select_threshold = 200

[filter]
persistent = true
language = "FR"
starts_with = true
date_format = "%d/%m/%Y"

[logging]
level = "debug"

[unknown]
ignored = 1
"#,
        );
        let (config, warnings) = load_config(&path);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.fast_select_all_threshold, 100);
        assert_eq!(config.fast_select_all_batch_size, 0);
        assert_eq!(config.virtual_select_threshold, 200);
        assert!(config.persistent && config.starts_with);
        assert_eq!(config.language, "fr");
        assert_eq!(config.date_format, "%d/%m/%Y");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_values_fall_back_with_warnings() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[selection]
fast_select_all_threshold = 0

[filter]
language = "xx"
date_format = "%Q"

[logging]
level = "loud"
"#,
        );
        let (config, warnings) = load_config(&path);
        assert_eq!(warnings.len(), 4);
        assert_eq!(
            config.fast_select_all_threshold,
            constants::DEFAULT_FAST_SELECT_ALL_THRESHOLD
        );
        assert_eq!(config.language, constants::DEFAULT_LANGUAGE);
        assert_eq!(config.date_format, constants::DEFAULT_DATE_FORMAT);
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn test_inverted_thresholds_are_kept_with_warning() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[selection]\nfast_select_all_threshold = 9000\nvirtual_select_threshold = 10\n",
        );
        let (config, warnings) = load_config(&path);
        assert_eq!(config.fast_select_all_threshold, 9000);
        assert_eq!(config.virtual_select_threshold, 10);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_unparseable_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[selection\nbroken");
        let (config, warnings) = load_config(&path);
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_relative_preset_file_lives_in_data_dir() {
        let paths = PlatformPaths {
            config_dir: PathBuf::from("/cfg"),
            data_dir: PathBuf::from("/data"),
        };
        assert_eq!(
            paths.preset_file("p.json"),
            PathBuf::from("/data").join("p.json")
        );
    }
}
