// FilterGrid - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::util::constants::{DATE_ONLY_PARSE_FORMATS, DATE_PARSE_FORMATS, PRESET_DATE_FORMAT};
use crate::util::error::ConvertError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

// =============================================================================
// Field values
// =============================================================================

/// A single cell value read from an item.
///
/// "No value" is modelled as `Option::None` at every use site, so the empty
/// string (`Text("")`) and an absent value stay distinguishable.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    /// Enum variant, by name.
    Enum(String),
}

/// Canonical bit pattern for float equality/hashing: all NaNs are one value
/// and -0.0 equals 0.0.
fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => float_key(*a) == float_key(*b),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Text(s) | Self::Enum(s) => s.hash(state),
            Self::Integer(n) => n.hash(state),
            Self::Float(f) => float_key(*f).hash(state),
            Self::Boolean(b) => b.hash(state),
            Self::DateTime(dt) => dt.hash(state),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Enum(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl FieldValue {
    /// Build a date value at midnight.
    pub fn date(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(|d| Self::DateTime(d.and_time(NaiveTime::MIN)))
    }

    /// The calendar date of a date/time value.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    /// Numeric view used by natural ordering of numeric columns.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    /// Drop the time-of-day part of a date/time value; other values pass
    /// through unchanged.
    pub fn truncate_to_date(self) -> Self {
        match self {
            Self::DateTime(dt) => Self::DateTime(dt.date().and_time(NaiveTime::MIN)),
            other => other,
        }
    }

    /// Re-type this value to a column's declared type.
    ///
    /// Mirrors a lenient "change type" conversion: numbers and booleans may
    /// arrive as text, integers widen to floats, whole floats narrow to
    /// integers, and enum names must name a declared variant.
    pub fn convert(&self, target: &FieldType) -> Result<FieldValue, ConvertError> {
        let fail = || ConvertError::new(self, target.type_id());
        match target {
            FieldType::Text => Ok(match self {
                Self::Text(s) => Self::Text(s.clone()),
                other => Self::Text(other.to_string()),
            }),
            FieldType::Integer => match self {
                Self::Integer(n) => Ok(Self::Integer(*n)),
                Self::Float(x) if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => {
                    Ok(Self::Integer(*x as i64))
                }
                Self::Text(s) => s.trim().parse().map(Self::Integer).map_err(|_| fail()),
                _ => Err(fail()),
            },
            FieldType::Float => match self {
                Self::Integer(n) => Ok(Self::Float(*n as f64)),
                Self::Float(x) => Ok(Self::Float(*x)),
                Self::Text(s) => s.trim().parse().map(Self::Float).map_err(|_| fail()),
                _ => Err(fail()),
            },
            FieldType::Boolean => match self {
                Self::Boolean(b) => Ok(Self::Boolean(*b)),
                Self::Text(s) => match s.trim().to_lowercase().as_str() {
                    "true" => Ok(Self::Boolean(true)),
                    "false" => Ok(Self::Boolean(false)),
                    _ => Err(fail()),
                },
                _ => Err(fail()),
            },
            FieldType::DateTime => match self {
                Self::DateTime(dt) => Ok(Self::DateTime(*dt)),
                Self::Text(s) => parse_date_time(s.trim()).map(Self::DateTime).ok_or_else(fail),
                _ => Err(fail()),
            },
            FieldType::Enum { variants } => match self {
                Self::Enum(name) | Self::Text(name) => {
                    if variants.is_empty() || variants.iter().any(|v| v == name) {
                        Ok(Self::Enum(name.clone()))
                    } else {
                        Err(fail())
                    }
                }
                _ => Err(fail()),
            },
        }
    }

    /// Untyped reading of a JSON scalar. `null`, objects and arrays have no
    /// field value.
    pub fn from_json(value: &serde_json::Value) -> Option<FieldValue> {
        match value {
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            _ => None,
        }
    }

    /// Self-describing JSON rendering used by filter presets.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) | Self::Enum(s) => serde_json::Value::String(s.clone()),
            Self::Integer(n) => serde_json::Value::from(*n),
            Self::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(x.to_string())),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::DateTime(dt) => {
                serde_json::Value::String(dt.format(PRESET_DATE_FORMAT).to_string())
            }
        }
    }
}

fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATE_PARSE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_ONLY_PARSE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

// =============================================================================
// Field types and columns
// =============================================================================

/// Declared type of a filterable column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Enum { variants: Vec<String> },
}

impl FieldType {
    /// Stable identifier written into filter presets.
    pub fn type_id(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Enum { .. } => "enum",
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Self::DateTime)
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Self::Enum { .. })
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum { variants } if !variants.is_empty() => {
                write!(f, "enum({})", variants.join("|"))
            }
            other => f.write_str(other.type_id()),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    /// Parses `text`, `integer`, `float`, `boolean`, `datetime`, `enum` or
    /// `enum(A|B|C)`. Common aliases (`string`, `int`, `bool`, `date`) are
    /// accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "text" | "string" => return Ok(Self::Text),
            "integer" | "int" => return Ok(Self::Integer),
            "float" | "number" | "decimal" => return Ok(Self::Float),
            "boolean" | "bool" => return Ok(Self::Boolean),
            "datetime" | "date" => return Ok(Self::DateTime),
            "enum" => return Ok(Self::Enum { variants: Vec::new() }),
            _ => {}
        }
        let trimmed = s.trim();
        if lower.starts_with("enum(") && trimmed.ends_with(')') {
            let inner = &trimmed["enum(".len()..trimmed.len() - 1];
            let variants = inner
                .split('|')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            return Ok(Self::Enum { variants });
        }
        Err(format!("unknown field type '{s}'"))
    }
}

/// Metadata of one filterable column, supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    /// Dotted field path into the item (e.g. "address.city").
    pub field_name: String,
    pub field_type: FieldType,
}

impl Column {
    pub fn new(field_name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field_name: field_name.into(),
            field_type,
        }
    }
}

// =============================================================================
// Filter popup items
// =============================================================================

/// Set of excluded raw values. `None` is the "no value" entry; for text
/// columns `Some(Text(""))` is tracked separately from it.
pub type ExclusionSet = HashSet<Option<FieldValue>>;

/// Role of a popup entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Synthetic "select all" sentinel.
    SelectAll,
    /// Synthetic "(blank)" sentinel for no value and, on text columns, "".
    Blank,
    /// An ordinary candidate value.
    Value,
}

impl ItemKind {
    /// Numeric level as used by tree nodes: 0 select-all, -1 blank, 1 value.
    pub fn level(self) -> i32 {
        match self {
            Self::SelectAll => 0,
            Self::Blank => -1,
            Self::Value => 1,
        }
    }
}

/// One selectable candidate (or sentinel) in a column's filter popup.
///
/// Created fresh each time a popup opens; `is_changed` tracks divergence from
/// the checked state the item was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterItem {
    pub content: Option<FieldValue>,
    pub label: String,
    pub kind: ItemKind,
    pub field_type: FieldType,
    is_checked: bool,
    initial: bool,
}

impl FilterItem {
    pub fn new(
        kind: ItemKind,
        content: Option<FieldValue>,
        label: impl Into<String>,
        field_type: FieldType,
        checked: bool,
    ) -> Self {
        Self {
            content,
            label: label.into(),
            kind,
            field_type,
            is_checked: checked,
            initial: checked,
        }
    }

    pub fn level(&self) -> i32 {
        self.kind.level()
    }

    pub fn is_checked(&self) -> bool {
        self.is_checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.is_checked = checked;
    }

    /// True once the checked state differs from the state at creation.
    pub fn is_changed(&self) -> bool {
        self.is_checked != self.initial
    }

    /// Character length of the content text, used by prefix search.
    pub fn content_len(&self) -> usize {
        self.content
            .as_ref()
            .map(|c| c.to_string().chars().count())
            .unwrap_or(0)
    }
}

// =============================================================================
// Active filter descriptor
// =============================================================================

/// Persistent descriptor of one column's active exclusion filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCommon {
    /// Unique key of the filter (the column's field path).
    pub field_name: String,
    pub field_type: FieldType,

    /// Every value the user has excluded, including values no longer present
    /// in the live collection.
    pub previously_filtered: ExclusionSet,

    /// The subset of `previously_filtered` currently present in the live
    /// collection (computed on preset restore).
    pub filtered_items: ExclusionSet,
}

impl FilterCommon {
    pub fn new(column: &Column) -> Self {
        Self {
            field_name: column.field_name.clone(),
            field_type: column.field_type.clone(),
            previously_filtered: ExclusionSet::new(),
            filtered_items: ExclusionSet::new(),
        }
    }

    /// A filter is active iff it excludes at least one value.
    pub fn is_filtered(&self) -> bool {
        !self.previously_filtered.is_empty()
    }

    pub fn column(&self) -> Column {
        Column::new(self.field_name.clone(), self.field_type.clone())
    }
}

// =============================================================================
// Unit tests
// =============================================================================
