// FilterGrid - core/popup.rs
//
// One filter popup session: the candidate items of a column, the optional
// date tree, the search box, and the translation of the user's check edits
// into a new exclusion set.

use crate::core::date_tree::{DateTree, NodeId};
use crate::core::locale::Language;
use crate::core::model::{Column, ExclusionSet, FieldType, FieldValue, FilterItem, ItemKind};

/// Search behaviour of the popup search box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Case-insensitive substring match.
    #[default]
    Contains,
    /// Case-insensitive prefix match.
    StartsWith,
}

/// State of an open filter popup. Created when the popup opens and dropped
/// when it closes.
#[derive(Debug, Clone)]
pub struct PopupSession {
    column: Column,
    items: Vec<FilterItem>,
    tree: Option<DateTree>,
    search: String,
    search_mode: SearchMode,
    language: Language,
}

impl PopupSession {
    pub fn new(
        column: Column,
        items: Vec<FilterItem>,
        language: Language,
        search_mode: SearchMode,
    ) -> Self {
        let mut session = Self {
            column,
            items,
            tree: None,
            search: String::new(),
            search_mode,
            language,
        };
        session.rebuild_tree();
        session
    }

    pub fn field_name(&self) -> &str {
        &self.column.field_name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.column.field_type
    }

    /// All items, select-all sentinel included.
    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    /// Date hierarchy for date columns.
    pub fn tree(&self) -> Option<&DateTree> {
        self.tree.as_ref()
    }

    pub fn search_text(&self) -> &str {
        &self.search
    }

    pub fn is_searching(&self) -> bool {
        !self.search.is_empty()
    }

    pub fn select_all_item(&self) -> Option<&FilterItem> {
        self.items.iter().find(|i| i.kind == ItemKind::SelectAll)
    }

    /// Index of the item holding `content` (`None` finds the blank).
    pub fn position(&self, content: Option<&FieldValue>) -> Option<usize> {
        self.items
            .iter()
            .position(|i| i.kind != ItemKind::SelectAll && i.content.as_ref() == content)
    }

    /// Whether a non-sentinel item passes the current search.
    fn passes_search(&self, item: &FilterItem) -> bool {
        if self.search.is_empty() || item.kind == ItemKind::SelectAll {
            return true;
        }
        if item.kind == ItemKind::Blank {
            return false;
        }
        let haystack = item.label.to_lowercase();
        let needle = self.search.to_lowercase();
        match self.search_mode {
            SearchMode::Contains => haystack.contains(&needle),
            SearchMode::StartsWith => haystack.starts_with(&needle),
        }
    }

    /// Indices of the non-sentinel items passing the current search.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.kind != ItemKind::SelectAll && self.passes_search(i))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn visible_items(&self) -> impl Iterator<Item = &FilterItem> + '_ {
        self.items
            .iter()
            .filter(|i| i.kind != ItemKind::SelectAll && self.passes_search(i))
    }

    /// Change the search text. Date columns rebuild their tree from the
    /// checked visible items, or show the root alone when nothing matches.
    pub fn set_search(&mut self, text: &str) {
        if self.search == text {
            return;
        }
        self.search = text.to_string();
        self.rebuild_tree();
        self.refresh_select_all();
    }

    fn rebuild_tree(&mut self) {
        if !self.column.field_type.is_date() {
            return;
        }
        let tree = if self.search.is_empty() {
            let subset: Vec<usize> = (0..self.items.len())
                .filter(|&i| self.items[i].kind != ItemKind::SelectAll)
                .collect();
            DateTree::build_subset(&self.items, Some(&subset), self.language)
        } else {
            let checked: Vec<usize> = self
                .visible_indices()
                .into_iter()
                .filter(|&i| self.items[i].is_checked())
                .collect();
            let subset = (!checked.is_empty()).then_some(checked.as_slice());
            DateTree::build_subset(&self.items, subset, self.language)
        };
        self.tree = Some(tree);
    }

    /// Check or uncheck every visible item (the select-all gesture).
    pub fn toggle_select_all(&mut self, checked: bool) {
        match self.tree.as_mut() {
            Some(tree) => tree.set_checked(DateTree::ROOT, checked, &mut self.items),
            None => {
                for idx in self.visible_indices() {
                    self.items[idx].set_checked(checked);
                }
            }
        }
        self.refresh_select_all();
    }

    /// Check or uncheck the item at `idx`. The select-all sentinel delegates
    /// to `toggle_select_all`.
    pub fn set_item_checked(&mut self, idx: usize, checked: bool) {
        let Some(item) = self.items.get(idx) else { return };
        if item.kind == ItemKind::SelectAll {
            self.toggle_select_all(checked);
            return;
        }
        let leaf = self.tree.as_ref().and_then(|tree| {
            (0..tree.len()).find(|&n| tree.node(n).and_then(|node| node.item) == Some(idx))
        });
        match (leaf, self.tree.as_mut()) {
            (Some(node), Some(tree)) => tree.set_checked(node, checked, &mut self.items),
            _ => self.items[idx].set_checked(checked),
        }
        self.refresh_select_all();
    }

    /// Check or uncheck a date tree node and everything below it.
    pub fn set_node_checked(&mut self, node: NodeId, checked: bool) {
        if let Some(tree) = self.tree.as_mut() {
            tree.set_checked(node, checked, &mut self.items);
            self.refresh_select_all();
        }
    }

    fn refresh_select_all(&mut self) {
        let all = self.visible_items().all(FilterItem::is_checked);
        if let Some(sentinel) = self.items.iter_mut().find(|i| i.kind == ItemKind::SelectAll) {
            sentinel.set_checked(all);
        }
    }

    /// Translate the session's edits into the field's new exclusion set,
    /// starting from the exclusions in force when the popup opened.
    pub fn apply(&self, prior: &ExclusionSet) -> ExclusionSet {
        let mut excluded = prior.clone();
        let empty_text = Some(FieldValue::Text(String::new()));

        let (blank_changed, blank_checked) = if self.is_searching() {
            for item in self.items.iter().filter(|i| i.kind != ItemKind::SelectAll) {
                if self.passes_search(item) && item.is_checked() {
                    excluded.remove(&item.content);
                } else {
                    excluded.insert(item.content.clone());
                }
            }
            // A search never shows the blank, so it counts as unchecked.
            (!prior.contains(&empty_text), false)
        } else {
            let mut blank = (false, false);
            for item in self.items.iter().filter(|i| i.kind != ItemKind::SelectAll && i.is_changed()) {
                if item.is_checked() {
                    excluded.remove(&item.content);
                } else {
                    excluded.insert(item.content.clone());
                }
                if item.kind == ItemKind::Blank {
                    blank = (true, item.is_checked());
                }
            }
            blank
        };

        if blank_changed && self.column.field_type.is_textual() {
            if blank_checked {
                excluded.remove(&empty_text);
            } else {
                excluded.insert(empty_text);
            }
        }
        excluded
    }
}
