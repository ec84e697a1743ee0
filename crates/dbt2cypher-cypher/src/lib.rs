//! Cypher script generation
//!
//! Serializes a graph export into a deterministic, idempotent Cypher script.
//! Consumes only the graph's exported representation; knows nothing about
//! dbt artifacts.

pub mod generator;

pub use generator::{CypherError, CypherGenerator};
