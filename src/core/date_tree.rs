// FilterGrid - core/date_tree.rs
//
// Year → month → day grouping of a date column's popup items, with
// tri-state check propagation.
//
// The tree is an arena: nodes own their children by index and point back
// to their parent by index. Node 0 is the synthetic "select all" root; the
// blank sentinel (if any) is the root's last child.

use crate::core::locale::Language;
use crate::core::model::{FilterItem, ItemKind};
use chrono::Datelike;
use std::collections::BTreeMap;

/// Index of a node inside its `DateTree`.
pub type NodeId = usize;

/// Tri-state check value of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckState {
    Checked,
    Unchecked,
    Indeterminate,
}

impl CheckState {
    pub fn from_checked(checked: bool) -> Self {
        if checked {
            Self::Checked
        } else {
            Self::Unchecked
        }
    }

    /// Parent state derived from its children: checked iff all are checked,
    /// unchecked iff all are unchecked, otherwise indeterminate. A node with
    /// no children keeps `fallback`.
    fn combine(children: impl IntoIterator<Item = CheckState>, fallback: CheckState) -> Self {
        let mut any_checked = false;
        let mut any_unchecked = false;
        let mut any = false;
        for state in children {
            any = true;
            match state {
                Self::Checked => any_checked = true,
                Self::Unchecked => any_unchecked = true,
                Self::Indeterminate => return Self::Indeterminate,
            }
        }
        match (any, any_checked, any_unchecked) {
            (false, _, _) => fallback,
            (true, true, false) => Self::Checked,
            (true, false, true) => Self::Unchecked,
            _ => Self::Indeterminate,
        }
    }
}

/// Level of a node in the date hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateLevel {
    Root,
    Year,
    Month,
    Day,
    Blank,
}

impl DateLevel {
    /// 0 root, 1 year, 2 month, 3 day, -1 blank.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Root => 0,
            Self::Year => 1,
            Self::Month => 2,
            Self::Day => 3,
            Self::Blank => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateNode {
    pub level: DateLevel,
    /// Year, month number, or day of month; `None` for root and blank.
    pub content: Option<i32>,
    pub label: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Index of the originating popup item (day and blank leaves).
    pub item: Option<usize>,
    state: CheckState,
    initial: CheckState,
}

impl DateNode {
    fn new(level: DateLevel, content: Option<i32>, label: String, parent: Option<NodeId>) -> Self {
        Self {
            level,
            content,
            label,
            parent,
            children: Vec::new(),
            item: None,
            state: CheckState::Checked,
            initial: CheckState::Checked,
        }
    }

    pub fn state(&self) -> CheckState {
        self.state
    }

    pub fn is_changed(&self) -> bool {
        self.state != self.initial
    }
}

/// Date hierarchy of one popup session.
#[derive(Debug, Clone, PartialEq)]
pub struct DateTree {
    nodes: Vec<DateNode>,
}

impl DateTree {
    pub const ROOT: NodeId = 0;

    /// Build the tree over every item of `items`.
    pub fn build(items: &[FilterItem], language: Language) -> Self {
        let all: Vec<usize> = (0..items.len()).collect();
        Self::build_subset(items, Some(&all), language)
    }

    /// Build the tree over the items at `subset` (indices into `items`).
    ///
    /// `None` stands for a search with no matches and yields the root alone.
    pub fn build_subset(items: &[FilterItem], subset: Option<&[usize]>, language: Language) -> Self {
        let mut tree = Self {
            nodes: vec![DateNode::new(
                DateLevel::Root,
                None,
                language.all_label().to_string(),
                None,
            )],
        };
        let Some(subset) = subset else {
            return tree;
        };

        let mut grouped: BTreeMap<i32, BTreeMap<u32, Vec<(u32, usize)>>> = BTreeMap::new();
        let mut blank: Option<usize> = None;

        for &idx in subset {
            let Some(item) = items.get(idx) else { continue };
            match item.kind {
                ItemKind::Value => {
                    let Some(date) = item.content.as_ref().and_then(|c| c.as_date()) else {
                        continue;
                    };
                    grouped
                        .entry(date.year())
                        .or_default()
                        .entry(date.month())
                        .or_default()
                        .push((date.day(), idx));
                }
                ItemKind::Blank => blank = blank.or(Some(idx)),
                ItemKind::SelectAll => {}
            }
        }

        for (year, months) in grouped {
            let year_id = tree.push(DateNode::new(
                DateLevel::Year,
                Some(year),
                year.to_string(),
                Some(Self::ROOT),
            ));
            for (month, days) in months {
                let month_id = tree.push(DateNode::new(
                    DateLevel::Month,
                    Some(month as i32),
                    language.month_name(year, month),
                    Some(year_id),
                ));
                for (day, idx) in days {
                    let mut leaf = DateNode::new(
                        DateLevel::Day,
                        Some(day as i32),
                        format!("{day:02}"),
                        Some(month_id),
                    );
                    leaf.item = Some(idx);
                    leaf.state = CheckState::from_checked(items[idx].is_checked());
                    tree.push(leaf);
                }
            }
        }

        if let Some(idx) = blank {
            let mut node = DateNode::new(
                DateLevel::Blank,
                None,
                language.empty_label().to_string(),
                Some(Self::ROOT),
            );
            node.item = Some(idx);
            node.state = CheckState::from_checked(items[idx].is_checked());
            tree.push(node);
        }

        tree.recompute_all();
        for node in &mut tree.nodes {
            node.initial = node.state;
        }
        tree
    }

    fn push(&mut self, node: DateNode) -> NodeId {
        let id = self.nodes.len();
        if let Some(parent) = node.parent {
            self.nodes[parent].children.push(id);
        }
        self.nodes.push(node);
        id
    }

    /// Derive every inner node bottom-up. Children always have larger ids
    /// than their parent, so a reverse sweep visits children first.
    fn recompute_all(&mut self) {
        for id in (0..self.nodes.len()).rev() {
            if !self.nodes[id].children.is_empty() {
                self.nodes[id].state = self.derived_state(id);
            }
        }
    }

    fn derived_state(&self, id: NodeId) -> CheckState {
        let node = &self.nodes[id];
        CheckState::combine(node.children.iter().map(|&c| self.nodes[c].state), node.state)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn root(&self) -> &DateNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&DateNode> {
        self.nodes.get(id)
    }

    pub fn state(&self, id: NodeId) -> Option<CheckState> {
        self.nodes.get(id).map(DateNode::state)
    }

    /// Child nodes of `id`, in display order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &DateNode)> + '_ {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&c| (c, &self.nodes[c]))
    }

    pub fn find_year(&self, year: i32) -> Option<NodeId> {
        self.find_child(Self::ROOT, DateLevel::Year, year)
    }

    pub fn find_month(&self, year: i32, month: u32) -> Option<NodeId> {
        self.find_child(self.find_year(year)?, DateLevel::Month, month as i32)
    }

    pub fn find_day(&self, year: i32, month: u32, day: u32) -> Option<NodeId> {
        self.find_child(self.find_month(year, month)?, DateLevel::Day, day as i32)
    }

    pub fn blank(&self) -> Option<NodeId> {
        self.children(Self::ROOT)
            .find(|(_, n)| n.level == DateLevel::Blank)
            .map(|(id, _)| id)
    }

    fn find_child(&self, parent: NodeId, level: DateLevel, content: i32) -> Option<NodeId> {
        self.children(parent)
            .find(|(_, n)| n.level == level && n.content == Some(content))
            .map(|(id, _)| id)
    }

    /// Check or uncheck `id` and its whole subtree, mirror the new state onto
    /// the wrapped popup items, then re-derive every ancestor.
    pub fn set_checked(&mut self, id: NodeId, checked: bool, items: &mut [FilterItem]) {
        if id >= self.nodes.len() {
            return;
        }
        let state = CheckState::from_checked(checked);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current];
            node.state = state;
            if let Some(item) = node.item.and_then(|idx| items.get_mut(idx)) {
                item.set_checked(checked);
            }
            stack.extend(node.children.iter().copied());
        }

        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            self.nodes[p].state = self.derived_state(p);
            parent = self.nodes[p].parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{FieldType, FieldValue};

    fn day_item(y: i32, m: u32, d: u32, checked: bool) -> FilterItem {
        let value = FieldValue::date(y, m, d).unwrap();
        FilterItem::new(ItemKind::Value, Some(value), "", FieldType::DateTime, checked)
    }

    fn sample() -> Vec<FilterItem> {
        vec![
            FilterItem::new(ItemKind::SelectAll, None, "", FieldType::DateTime, true),
            day_item(2023, 12, 31, true),
            day_item(2024, 1, 5, true),
            day_item(2024, 1, 6, true),
        ]
    }

    #[test]
    fn test_groups_by_year_month_day() {
        let items = sample();
        let tree = DateTree::build(&items, Language::English);

        let years: Vec<_> = tree.children(DateTree::ROOT).map(|(_, n)| n.label.clone()).collect();
        assert_eq!(years, vec!["2023", "2024"]);

        let y2024 = tree.find_year(2024).unwrap();
        let months: Vec<_> = tree.children(y2024).map(|(_, n)| n.label.clone()).collect();
        assert_eq!(months, vec!["January"]);

        let jan = tree.find_month(2024, 1).unwrap();
        let days: Vec<_> = tree.children(jan).map(|(_, n)| n.label.clone()).collect();
        assert_eq!(days, vec!["05", "06"]);
        assert_eq!(tree.root().state(), CheckState::Checked);
    }

    #[test]
    fn test_unchecking_a_day_makes_ancestors_indeterminate() {
        let mut items = sample();
        let mut tree = DateTree::build(&items, Language::English);
        let day = tree.find_day(2024, 1, 5).unwrap();

        tree.set_checked(day, false, &mut items);

        assert!(!items[2].is_checked(), "leaf writes through to its item");
        assert_eq!(tree.state(tree.find_month(2024, 1).unwrap()), Some(CheckState::Indeterminate));
        assert_eq!(tree.state(tree.find_year(2024).unwrap()), Some(CheckState::Indeterminate));
        assert_eq!(tree.state(DateTree::ROOT), Some(CheckState::Indeterminate));
        assert_eq!(tree.state(tree.find_year(2023).unwrap()), Some(CheckState::Checked));
    }

    #[test]
    fn test_unchecking_a_year_clears_its_leaves() {
        let mut items = sample();
        let mut tree = DateTree::build(&items, Language::English);
        let year = tree.find_year(2024).unwrap();

        tree.set_checked(year, false, &mut items);

        assert!(!items[2].is_checked() && !items[3].is_checked());
        assert!(items[1].is_checked());
        assert!(tree.node(year).unwrap().is_changed());
    }

    #[test]
    fn test_initial_state_derived_from_items() {
        let mut items = sample();
        items[3].set_checked(false);
        let tree = DateTree::build(&items, Language::English);
        let jan = tree.find_month(2024, 1).unwrap();
        assert_eq!(tree.state(jan), Some(CheckState::Indeterminate));
        assert!(!tree.node(jan).unwrap().is_changed());
    }

    #[test]
    fn test_blank_is_last_sibling_of_years() {
        let mut items = sample();
        items.push(FilterItem::new(ItemKind::Blank, None, "", FieldType::DateTime, false));
        let tree = DateTree::build(&items, Language::English);
        let last = tree.children(DateTree::ROOT).last().unwrap();
        assert_eq!(last.1.level, DateLevel::Blank);
        assert_eq!(last.1.level.as_i32(), -1);
        assert_eq!(tree.blank(), Some(last.0));
        assert_eq!(tree.root().state(), CheckState::Indeterminate);
    }

    #[test]
    fn test_empty_and_missing_input_yield_root_only() {
        let empty = DateTree::build(&[], Language::English);
        assert!(empty.is_empty());
        assert_eq!(empty.root().level, DateLevel::Root);

        let items = sample();
        let none = DateTree::build_subset(&items, None, Language::English);
        assert_eq!(none.len(), 1);
        assert_eq!(none.children(DateTree::ROOT).count(), 0);
    }
}
