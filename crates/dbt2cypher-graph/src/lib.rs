//! In-memory dependency graph
//!
//! A purpose-built directed multigraph holding unit and column nodes with
//! typed edges. One instance is built per pipeline invocation and discarded
//! after serialization; there is no persistence layer.

pub mod graph;

pub use graph::{
    DependencyGraph, ExportEdge, ExportNode, GraphError, GraphExport, NodeKind, Relationship,
};
