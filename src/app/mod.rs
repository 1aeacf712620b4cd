// FilterGrid - app/mod.rs
//
// Application layer: grid state ownership, preset persistence, selection.
// Dependencies: core layer.
// Must NOT depend on: platform specifics.

pub mod persistence;
pub mod select_all;
pub mod selection;
pub mod state;
