//! Pipeline orchestration
//!
//! The single synchronous pipeline: load artifacts, extract dependencies,
//! build the graph, generate the Cypher script. A fresh graph is built per
//! invocation; nothing is retained between calls.

pub mod pipeline;

pub use pipeline::{build_graph, run, run_with_options, write_script, PipelineError, PipelineOptions, PipelineOutcome};
