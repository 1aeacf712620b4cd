// FilterGrid - core/natural_sort.rs
//
// Natural ordering of field values: the first embedded run of decimal digits
// compares numerically, then the full text compares case-insensitively.
// "No value" sorts first ascending and last descending.
//
// Numeric field values compare by their numeric value before the text rule,
// so negative numbers and fractions order correctly.
//
// Case folding is Unicode lowercasing (`str::to_lowercase`) followed by a
// code-point comparison. It is the same in every locale: accented letters
// sort after the ASCII alphabet rather than next to their base letter.

use crate::core::model::FieldValue;
use crate::util::constants::PARALLEL_SORT_THRESHOLD;
use rayon::prelude::*;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

fn digit_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // ASCII digits only; `\d` would also match other Unicode decimal digits.
    RE.get_or_init(|| Regex::new("[0-9]+").expect("digit-run pattern is valid"))
}

/// Sort direction of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Precomputed comparison key for one value.
#[derive(Debug, Clone)]
pub struct NaturalKey {
    number: Option<f64>,
    /// First digit run with leading zeros stripped ("" means 0).
    digits: String,
    folded: String,
    text: String,
}

impl NaturalKey {
    pub fn new(value: &FieldValue) -> Self {
        Self::from_text(value.to_string(), value.as_f64())
    }

    fn from_text(text: String, number: Option<f64>) -> Self {
        let digits = digit_run_regex()
            .find(&text)
            .map(|m| m.as_str().trim_start_matches('0').to_string())
            .unwrap_or_default();
        Self {
            number,
            digits,
            folded: text.to_lowercase(),
            text,
        }
    }
}

/// Compare two decimal digit strings without leading zeros by magnitude.
/// Works for runs of any length (no integer overflow).
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (self.number, other.number) {
            let ord = a.total_cmp(&b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        cmp_digit_runs(&self.digits, &other.digits)
            .then_with(|| self.folded.cmp(&other.folded))
            // Case-only differences still order deterministically.
            .then_with(|| self.text.cmp(&other.text))
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NaturalKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NaturalKey {}

/// Natural comparison of two present values, ascending.
pub fn natural_cmp(a: &FieldValue, b: &FieldValue) -> Ordering {
    NaturalKey::new(a).cmp(&NaturalKey::new(b))
}

/// Natural comparison of raw text, ascending.
pub fn natural_cmp_str(a: &str, b: &str) -> Ordering {
    NaturalKey::from_text(a.to_string(), None).cmp(&NaturalKey::from_text(b.to_string(), None))
}

/// Comparer for one column in one direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalSortComparer {
    direction: SortDirection,
}

impl NaturalSortComparer {
    pub fn new(direction: SortDirection) -> Self {
        Self { direction }
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn compare(&self, a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
        let ascending = match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => natural_cmp(x, y),
        };
        match self.direction {
            SortDirection::Ascending => ascending,
            SortDirection::Descending => ascending.reverse(),
        }
    }

    /// Sort `(key, payload)` pairs in place. Large inputs sort on the rayon
    /// pool; both paths use a stable sort over the same total order, so the
    /// result is identical either way.
    pub fn sort_keyed<P: Send>(&self, entries: &mut [(Option<NaturalKey>, P)]) {
        let direction = self.direction;
        let cmp = move |a: &(Option<NaturalKey>, P), b: &(Option<NaturalKey>, P)| {
            let ascending = match (&a.0, &b.0) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => x.cmp(y),
            };
            match direction {
                SortDirection::Ascending => ascending,
                SortDirection::Descending => ascending.reverse(),
            }
        };
        if entries.len() > PARALLEL_SORT_THRESHOLD {
            entries.par_sort_by(cmp);
        } else {
            entries.sort_by(cmp);
        }
    }
}

/// Sort distinct values ascending in natural order.
pub fn sort_values(values: Vec<FieldValue>) -> Vec<FieldValue> {
    let mut keyed: Vec<(Option<NaturalKey>, FieldValue)> = if values.len() > PARALLEL_SORT_THRESHOLD
    {
        values
            .into_par_iter()
            .map(|v| (Some(NaturalKey::new(&v)), v))
            .collect()
    } else {
        values
            .into_iter()
            .map(|v| (Some(NaturalKey::new(&v)), v))
            .collect()
    };
    NaturalSortComparer::default().sort_keyed(&mut keyed);
    keyed.into_iter().map(|(_, v)| v).collect()
}
