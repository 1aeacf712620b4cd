// FilterGrid - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Core filter/select operations never fail outward; these types cover the
// edges (preset files, config, dataset input) and value re-typing, whose
// failures are logged and degraded rather than propagated.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all FilterGrid operations.
#[derive(Debug)]
pub enum GridError {
    /// Filter preset persistence failed.
    Persist(PersistError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// A value could not be converted to a column's declared type.
    Convert(ConvertError),

    /// The input dataset could not be loaded.
    Dataset(DatasetError),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persist(e) => write!(f, "Preset error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Convert(e) => write!(f, "Conversion error: {e}"),
            Self::Dataset(e) => write!(f, "Dataset error: {e}"),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Persist(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Convert(e) => Some(e),
            Self::Dataset(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

/// Errors related to saving and loading filter presets.
#[derive(Debug)]
pub enum PersistError {
    /// I/O error reading or writing the preset file.
    Io { path: PathBuf, source: io::Error },

    /// JSON (de)serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The preset was written by an incompatible schema version.
    VersionMismatch { found: u32, expected: u32 },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Preset I/O error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "Preset JSON error '{}': {source}", path.display())
            }
            Self::VersionMismatch { found, expected } => write!(
                f,
                "Preset version {found} is not supported (expected {expected})"
            ),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::VersionMismatch { .. } => None,
        }
    }
}

impl From<PersistError> for GridError {
    fn from(e: PersistError) -> Self {
        Self::Persist(e)
    }
}

// ---------------------------------------------------------------------------
// Conversion errors
// ---------------------------------------------------------------------------

/// A raw value that cannot be re-typed to a column's declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertError {
    /// Text rendering of the offending value.
    pub value: String,

    /// Type identifier of the conversion target (e.g. "datetime").
    pub target: String,
}

impl ConvertError {
    pub fn new(value: impl fmt::Display, target: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            target: target.into(),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot convert '{}' to {}", self.value, self.target)
    }
}

impl std::error::Error for ConvertError {}

impl From<ConvertError> for GridError {
    fn from(e: ConvertError) -> Self {
        Self::Convert(e)
    }
}

// ---------------------------------------------------------------------------
// Dataset errors
// ---------------------------------------------------------------------------

/// Errors loading the row dataset handed to the CLI.
#[derive(Debug)]
pub enum DatasetError {
    /// The dataset file could not be read.
    Io { path: PathBuf, source: io::Error },

    /// The dataset is not valid JSON.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The dataset parsed but its top level is not an array of rows.
    NotAnArray { path: PathBuf },

    /// A `name:type` column declaration could not be parsed.
    InvalidColumn { declaration: String, reason: String },
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Cannot read dataset '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "Dataset '{}' is not valid JSON: {source}", path.display())
            }
            Self::NotAnArray { path } => write!(
                f,
                "Dataset '{}' must contain a JSON array of row objects",
                path.display()
            ),
            Self::InvalidColumn { declaration, reason } => {
                write!(f, "Invalid column declaration '{declaration}': {reason}")
            }
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DatasetError> for GridError {
    fn from(e: DatasetError) -> Self {
        Self::Dataset(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for GridError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for FilterGrid results.
pub type Result<T> = std::result::Result<T, GridError>;
