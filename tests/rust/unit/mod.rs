//! Unit tests - public translator behaviour without external dependencies

#[path = "../common/mod.rs"]
mod common;

mod null_semantics_tests;
mod translator_chain_tests;
mod type_mapping_tests;
