pub mod catalog;
pub mod config;
pub mod context;
pub mod data_types;
pub mod expression;
pub mod logging;
pub mod object_store;
pub mod repository;
pub mod wasm_udf;

#[cfg(test)]
pub(crate) mod testutils;
