// FilterGrid - core/distinct.rs
//
// Distinct-value extraction for a column's filter popup.
//
// Pipeline: read every item's typed value (dates truncated to the day) →
// distinct set → split off the blank candidates (no value / "") → optionally
// union the values excluded by the previous filter on this field → natural
// sort → wrap as FilterItems with the select-all sentinel first and the
// blank sentinel last.

use crate::core::accessor::ColumnReader;
use crate::core::locale::Language;
use crate::core::model::{ExclusionSet, FieldType, FieldValue, FilterCommon, FilterItem, ItemKind};
use crate::core::natural_sort;
use crate::util::constants::DEFAULT_DATE_FORMAT;
use std::time::Instant;

/// Presentation settings for popup labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub language: Language,
    /// strftime format for date values.
    pub date_format: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            language: Language::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl DisplayOptions {
    /// Label shown for a present value.
    pub fn value_label(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Boolean(true) => self.language.true_label().to_string(),
            FieldValue::Boolean(false) => self.language.false_label().to_string(),
            FieldValue::DateTime(dt) => dt.format(&self.date_format).to_string(),
            other => other.to_string(),
        }
    }

    /// Label of the blank sentinel for a column type.
    pub fn blank_label(&self, field_type: &FieldType) -> String {
        if field_type.is_boolean() {
            self.language.indeterminate_label().to_string()
        } else {
            self.language.empty_label().to_string()
        }
    }
}

/// Distinct typed values of one column across `items`, including `None`
/// and `Some(Text(""))` when present.
pub fn collect_distinct<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    reader: &ColumnReader<T>,
) -> ExclusionSet {
    items.into_iter().map(|item| reader.read(item)).collect()
}

/// Candidate values of a column, ready to be wrapped into popup items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Candidates {
    /// Present values in natural order, without blanks.
    pub values: Vec<FieldValue>,
    /// Whether a blank candidate (no value, or "" on text columns) exists.
    pub has_blank: bool,
}

/// Scan `items` for the distinct candidates of one column.
///
/// When `carry_over` is set, values excluded by `prior` are added even if no
/// item holds them any more, so a filter survives a data reload and the user
/// can still re-include them.
pub fn extract<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    reader: &ColumnReader<T>,
    prior: Option<&FilterCommon>,
    carry_over: bool,
) -> Candidates {
    let mut distinct = collect_distinct(items, reader);
    if carry_over {
        if let Some(prior) = prior {
            distinct.extend(prior.previously_filtered.iter().cloned());
        }
    }

    let mut has_blank = false;
    let present: Vec<FieldValue> = distinct
        .into_iter()
        .filter_map(|value| match value {
            None => {
                has_blank = true;
                None
            }
            Some(v) if v.is_empty_text() => {
                has_blank = true;
                None
            }
            Some(v) => Some(v),
        })
        .collect();

    Candidates {
        values: natural_sort::sort_values(present),
        has_blank,
    }
}

/// Wrap candidates into popup items.
///
/// An item is checked unless `excluded` contains its value. Boolean columns
/// get no select-all sentinel.
pub fn to_filter_items(
    candidates: Candidates,
    field_type: &FieldType,
    excluded: &ExclusionSet,
    options: &DisplayOptions,
) -> Vec<FilterItem> {
    let mut items = Vec::with_capacity(candidates.values.len() + 2);

    for value in candidates.values {
        let content = Some(value);
        let checked = !excluded.contains(&content);
        let label = content
            .as_ref()
            .map(|v| options.value_label(v))
            .unwrap_or_default();
        items.push(FilterItem::new(
            ItemKind::Value,
            content,
            label,
            field_type.clone(),
            checked,
        ));
    }

    if candidates.has_blank {
        items.push(FilterItem::new(
            ItemKind::Blank,
            None,
            options.blank_label(field_type),
            field_type.clone(),
            !excluded.contains(&None),
        ));
    }

    if !field_type.is_boolean() {
        let all_checked = items.iter().all(FilterItem::is_checked);
        items.insert(
            0,
            FilterItem::new(
                ItemKind::SelectAll,
                None,
                options.language.all_label(),
                field_type.clone(),
                all_checked,
            ),
        );
    }

    items
}

/// Full candidate list for a column popup.
pub fn build_candidates<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    reader: &ColumnReader<T>,
    prior: Option<&FilterCommon>,
    carry_over: bool,
    options: &DisplayOptions,
) -> Vec<FilterItem> {
    let started = Instant::now();
    let candidates = extract(items, reader, prior, carry_over);
    let empty = ExclusionSet::new();
    let excluded = prior.map(|p| &p.previously_filtered).unwrap_or(&empty);
    let result = to_filter_items(candidates, reader.field_type(), excluded, options);
    tracing::debug!(
        field = %reader.column().field_name,
        candidates = result.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Filter candidates built"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accessor::JsonAccessor;
    use crate::core::model::Column;
    use serde_json::json;
    use std::sync::Arc;

    fn contents(items: &[FilterItem]) -> Vec<Option<FieldValue>> {
        items
            .iter()
            .filter(|i| i.kind != ItemKind::SelectAll)
            .map(|i| i.content.clone())
            .collect()
    }

    fn reader(name: &str, field_type: FieldType) -> ColumnReader<serde_json::Value> {
        ColumnReader::new(Column::new(name, field_type), Arc::new(JsonAccessor))
    }

    fn rows() -> Vec<serde_json::Value> {
        vec![
            json!({ "n": 1 }),
            json!({ "n": 2 }),
            json!({ "n": 2 }),
            json!({ "n": null }),
        ]
    }

    #[test]
    fn test_distinct_values_with_blank_sentinel() {
        let rows = rows();
        let r = reader("n", FieldType::Integer);
        let items = build_candidates(&rows, &r, None, false, &DisplayOptions::default());

        assert_eq!(items.len(), 4);
        assert_eq!(items[0].kind, ItemKind::SelectAll);
        assert_eq!(
            contents(&items),
            vec![
                Some(FieldValue::Integer(1)),
                Some(FieldValue::Integer(2)),
                None
            ]
        );
        assert_eq!(items[3].kind, ItemKind::Blank);
        assert!(items.iter().all(FilterItem::is_checked));
    }

    #[test]
    fn test_carried_over_exclusion_stays_selectable() {
        let r = reader("n", FieldType::Integer);
        let mut prior = FilterCommon::new(r.column());
        prior.previously_filtered.insert(Some(FieldValue::Integer(1)));

        // Reloaded data no longer contains 1.
        let rows = vec![json!({ "n": 2 }), json!({ "n": 3 })];
        let items = build_candidates(&rows, &r, Some(&prior), true, &DisplayOptions::default());

        let one = items
            .iter()
            .find(|i| i.content == Some(FieldValue::Integer(1)))
            .expect("excluded value must still be listed");
        assert!(!one.is_checked());
        assert!(!items[0].is_checked(), "select-all reflects the exclusion");

        // Without carry-over only live values are listed.
        let items = build_candidates(&rows, &r, Some(&prior), false, &DisplayOptions::default());
        assert!(items.iter().all(|i| i.content != Some(FieldValue::Integer(1))));
    }

    #[test]
    fn test_dates_collapse_to_one_candidate_per_day() {
        let rows = vec![
            json!({ "at": "2024-01-05T08:00:00" }),
            json!({ "at": "2024-01-05T19:30:00" }),
            json!({ "at": "2024-01-06T00:00:00" }),
        ];
        let c = extract(&rows, &reader("at", FieldType::DateTime), None, false);
        assert_eq!(
            c.values,
            vec![
                FieldValue::date(2024, 1, 5).unwrap(),
                FieldValue::date(2024, 1, 6).unwrap()
            ]
        );
    }

    #[test]
    fn test_text_blank_covers_empty_and_missing() {
        let rows = vec![
            json!({ "s": "" }),
            json!({}),
            json!({ "s": "b" }),
        ];
        let r = reader("s", FieldType::Text);
        let c = extract(&rows, &r, None, false);
        assert_eq!(c.values, vec![FieldValue::Text("b".into())]);
        assert!(c.has_blank);

        let distinct = collect_distinct(&rows, &r);
        assert!(distinct.contains(&None));
        assert!(distinct.contains(&Some(FieldValue::Text(String::new()))));
    }

    #[test]
    fn test_boolean_column_has_no_select_all() {
        let rows = vec![json!({ "b": true }), json!({ "b": false }), json!({})];
        let items = build_candidates(
            &rows,
            &reader("b", FieldType::Boolean),
            None,
            false,
            &DisplayOptions::default(),
        );
        assert!(items.iter().all(|i| i.kind != ItemKind::SelectAll));
        assert_eq!(items.last().map(|i| i.label.as_str()), Some("Indeterminate"));
    }

    #[test]
    fn test_blank_checked_state_follows_no_value_exclusion() {
        let r = reader("n", FieldType::Integer);
        let mut prior = FilterCommon::new(r.column());
        prior.previously_filtered.insert(None);
        let items = build_candidates(&rows(), &r, Some(&prior), true, &DisplayOptions::default());
        let blank = items.iter().find(|i| i.kind == ItemKind::Blank).unwrap();
        assert!(!blank.is_checked());
    }
}
