//! Integration tests - full translations against YAML-loaded entity models
//!
//! These tests drive the public API the way a query pipeline does: load a
//! model, build a translator, translate fragments and render them.

#[path = "../common/mod.rs"]
mod common;

mod identity_store_tests;
mod model_loading_tests;
mod sqlite_dialect_tests;
