// FilterGrid - core/mod.rs
//
// Core logic layer: data model, candidate extraction, date hierarchy,
// criteria evaluation, natural sort, popup sessions.
// Dependencies: standard library, chrono, regex, rayon, serde_json.
// Must NOT depend on: app, platform, or perform any I/O.

pub mod accessor;
pub mod criteria;
pub mod date_tree;
pub mod distinct;
pub mod locale;
pub mod model;
pub mod natural_sort;
pub mod popup;
