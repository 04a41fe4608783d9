// LitmusLog - lib.rs
//
// Library entry point, exposing every module for integration testing and
// for driving the pipelines from other programs. The CLI lives in
// `main.rs`.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
