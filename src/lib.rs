// FilterGrid - lib.rs
//
// Library entry point, exposing every layer for the CLI, integration tests
// and embedding hosts.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
