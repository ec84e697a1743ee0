//! load -> extract -> graph -> generate
//!
//! Edge wiring fixes the dependency direction once: edges always point
//! from upstream to downstream, so `add_dependency` is called with the
//! upstream key first and the consuming key second.

use std::collections::BTreeMap;
use std::path::Path;

use dbt2cypher_core::{ColumnRef, Diagnostic};
use dbt2cypher_cypher::{CypherError, CypherGenerator};
use dbt2cypher_dbt::{ArtifactError, ArtifactLoader, DependencyExtractor, ExtractError, Extraction};
use dbt2cypher_graph::{DependencyGraph, GraphError, Relationship};

/// Pipeline behavior toggles
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Emit column-level nodes and lineage
    pub include_columns: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            include_columns: true,
        }
    }
}

/// The successful result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The generated Cypher script
    pub script: String,

    /// Non-fatal data-quality warnings collected during extraction
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the full pipeline for a dbt project root.
pub fn run(project_root: &Path) -> Result<PipelineOutcome, PipelineError> {
    run_with_options(project_root, &PipelineOptions::default())
}

/// Run the full pipeline with explicit options.
pub fn run_with_options(
    project_root: &Path,
    options: &PipelineOptions,
) -> Result<PipelineOutcome, PipelineError> {
    tracing::debug!(project = %project_root.display(), "starting pipeline");

    let loader = ArtifactLoader::load(project_root)?;
    let extractor = DependencyExtractor::new(&loader);
    let extraction = extractor.extract_all()?;

    let graph = build_graph(&extraction, options)?;
    let script = CypherGenerator::new(&graph.export()).generate()?;

    Ok(PipelineOutcome {
        script,
        diagnostics: extraction.diagnostics,
    })
}

/// Build a fresh dependency graph from an extraction result.
///
/// Also usable on its own by callers that want the graph object rather
/// than the serialized script.
pub fn build_graph(
    extraction: &Extraction,
    options: &PipelineOptions,
) -> Result<DependencyGraph, PipelineError> {
    let mut graph = DependencyGraph::new();

    for record in extraction.units.values() {
        graph.add_unit(&record.fully_qualified_name, unit_properties(record));
    }

    // Upstream ids that were never declared as nodes have no resolved
    // fully-qualified name; their raw id becomes the bare node key.
    let key_of = |unique_id: &str| -> String {
        extraction
            .units
            .get(unique_id)
            .map(|r| r.fully_qualified_name.clone())
            .unwrap_or_else(|| unique_id.to_string())
    };

    for (unique_id, upstreams) in &extraction.model_dependencies {
        let downstream = key_of(unique_id);
        for upstream_id in upstreams {
            graph.add_dependency(&key_of(upstream_id), &downstream, Relationship::DependsOn);
        }
    }

    if options.include_columns {
        for (column_key, record) in &extraction.columns {
            graph.add_column(column_key, column_properties(record))?;
            graph.add_dependency(&record.unit, column_key, Relationship::HasColumn);
        }

        for (column_key, upstreams) in &extraction.column_dependencies {
            for upstream_key in upstreams {
                // Referenced-but-undeclared columns materialize as bare
                // column nodes, together with their owning unit so every
                // column key decomposes into an existing unit key.
                // Malformed tokens were filtered during extraction.
                if !graph.contains(upstream_key) {
                    if let Ok(column) = ColumnRef::parse(upstream_key) {
                        graph.add_dependency(&column.unit, upstream_key, Relationship::HasColumn);
                    }
                }
                graph.add_dependency(upstream_key, column_key, Relationship::DependsOn);
            }
        }
    }

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built dependency graph"
    );

    Ok(graph)
}

/// Write a generated script to a file.
pub fn write_script(script: &str, path: &Path) -> Result<(), PipelineError> {
    std::fs::write(path, script).map_err(|e| PipelineError::Output {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

fn unit_properties(record: &dbt2cypher_dbt::NodeRecord) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    properties.insert("unique_id".to_string(), record.unique_id.clone());
    properties.insert("name".to_string(), record.name.clone());
    properties.insert(
        "resource_type".to_string(),
        record.resource_kind.as_str().to_string(),
    );
    if let Some(database) = &record.database {
        properties.insert("database".to_string(), database.clone());
    }
    if let Some(schema) = &record.schema {
        properties.insert("schema".to_string(), schema.clone());
    }
    if !record.description.is_empty() {
        properties.insert("description".to_string(), record.description.clone());
    }
    properties
}

fn column_properties(record: &dbt2cypher_dbt::ColumnRecord) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    properties.insert("name".to_string(), record.name.clone());
    if let Some(data_type) = &record.meta.data_type {
        properties.insert("data_type".to_string(), data_type.clone());
    }
    if let Some(description) = &record.meta.description {
        properties.insert("description".to_string(), description.clone());
    }
    properties
}

/// Pipeline errors: every fatal kind from the stages below, unmodified.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Generation(#[from] CypherError),

    #[error("failed to write output to {path}: {detail}")]
    Output { path: String, detail: String },
}
