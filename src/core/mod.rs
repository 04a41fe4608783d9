// LitmusLog - core/mod.rs
//
// Core layer: data model, discovery, stage cache, and the in-process text
// stages (rewrite, gather).
// Must NOT depend on: app, platform. Never spawns processes.

pub mod discovery;
pub mod gather;
pub mod model;
pub mod rewrite;
pub mod stage;
