// LitmusLog - app/mod.rs
//
// Application layer: pipeline drivers, tool dispatch, cleanup.
// Dependencies: core, platform, util.

pub mod clean;
pub mod dispatch;
pub mod pipeline;
