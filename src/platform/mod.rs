// FilterGrid - platform/mod.rs
//
// Platform abstraction layer.
// Dependencies: standard library, directories, toml, chrono.
// Must NOT depend on: core, app.

pub mod config;
