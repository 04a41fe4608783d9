// LitmusLog - platform/mod.rs
//
// Platform abstraction layer: config file location and loading, and
// filesystem helpers.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
