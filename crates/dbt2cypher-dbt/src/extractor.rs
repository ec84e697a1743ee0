//! Dependency extraction
//!
//! Walks the loaded manifest and catalog to produce the flat node registry
//! and the model-level and column-level dependency mappings the graph layer
//! is built from. Operates only after the loader has validated both
//! documents; never returns partial results.

use std::collections::{BTreeMap, HashSet};

use dbt2cypher_core::{ColumnRef, Diagnostic, DiagnosticCode, Severity};

use crate::loader::ArtifactLoader;
use crate::manifest::{is_test_entry, ColumnDefinition, ResourceKind};

/// Extracts dependency mappings from loaded dbt artifacts.
pub struct DependencyExtractor<'a> {
    loader: &'a ArtifactLoader,
}

/// A buildable node combined with its catalog column metadata
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    /// Manifest unique_id
    pub unique_id: String,

    /// Node name
    pub name: String,

    /// Resource kind
    pub resource_kind: ResourceKind,

    /// Derived `database.schema.name` graph key
    pub fully_qualified_name: String,

    /// Database name
    pub database: Option<String>,

    /// Schema name
    pub schema: Option<String>,

    /// Description from the manifest
    pub description: String,

    /// Declared upstream unique_ids, first-occurrence de-duplicated
    pub upstream_ids: Vec<String>,

    /// Column metadata by column name (empty when absent from the catalog)
    pub columns: BTreeMap<String, ColumnMeta>,
}

/// Column metadata joined from manifest and catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMeta {
    /// Warehouse data type, catalog first, manifest contract as fallback
    pub data_type: Option<String>,

    /// Description from the manifest or catalog comment
    pub description: Option<String>,
}

/// A flat column entry keyed by its composite `unit.column` token
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRecord {
    /// Graph key of the owning unit
    pub unit: String,

    /// Column name
    pub name: String,

    /// Column metadata
    pub meta: ColumnMeta,
}

/// The combined result of a full extraction pass
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// unique_id -> node record
    pub units: BTreeMap<String, NodeRecord>,

    /// unique_id -> ordered upstream unique_ids
    pub model_dependencies: BTreeMap<String, Vec<String>>,

    /// `unit.column` -> flat column entry
    pub columns: BTreeMap<String, ColumnRecord>,

    /// `unit.column` -> ordered upstream `unit.column` tokens
    pub column_dependencies: BTreeMap<String, Vec<String>>,

    /// Non-fatal data-quality warnings collected along the way
    pub diagnostics: Vec<Diagnostic>,
}

/// Column-level extraction result
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDependencies {
    /// `unit.column` -> ordered upstream `unit.column` tokens
    pub dependencies: BTreeMap<String, Vec<String>>,

    /// Warnings for skipped malformed references
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> DependencyExtractor<'a> {
    /// Create an extractor over loaded artifacts.
    pub fn new(loader: &'a ArtifactLoader) -> Self {
        Self { loader }
    }

    /// Produce one record per non-test manifest node and source, joining
    /// catalog columns by unique_id. An absent catalog entry yields an
    /// empty column map, not an error.
    pub fn extract_nodes(&self) -> Result<BTreeMap<String, NodeRecord>, ExtractError> {
        let manifest = self.loader.manifest();
        let catalog = self.loader.catalog();
        let mut units = BTreeMap::new();

        for (unique_id, node) in &manifest.nodes {
            let fully_qualified_name = node.fully_qualified_name();
            if fully_qualified_name.is_empty() {
                return Err(ExtractError::Failed(format!(
                    "manifest node '{}' has an empty fully-qualified name",
                    unique_id
                )));
            }

            let columns = join_columns(&node.columns, catalog, unique_id);

            units.insert(
                unique_id.clone(),
                NodeRecord {
                    unique_id: unique_id.clone(),
                    name: node.name.clone(),
                    resource_kind: node.resource_type,
                    fully_qualified_name,
                    database: node.database.clone(),
                    schema: node.schema.clone(),
                    description: node.description.clone(),
                    upstream_ids: dedup_preserving(&node.depends_on.nodes)
                        .into_iter()
                        .filter(|id| !is_test_entry(id))
                        .collect(),
                    columns,
                },
            );
        }

        for (unique_id, source) in &manifest.sources {
            let fully_qualified_name = source.fully_qualified_name();
            if fully_qualified_name.is_empty() {
                return Err(ExtractError::Failed(format!(
                    "manifest source '{}' has an empty fully-qualified name",
                    unique_id
                )));
            }

            let columns = join_columns(&source.columns, catalog, unique_id);

            units.insert(
                unique_id.clone(),
                NodeRecord {
                    unique_id: unique_id.clone(),
                    name: source.name.clone(),
                    resource_kind: ResourceKind::Source,
                    fully_qualified_name,
                    database: source.database.clone(),
                    schema: source.schema.clone(),
                    description: source.description.clone(),
                    upstream_ids: Vec::new(),
                    columns,
                },
            );
        }

        tracing::debug!(units = units.len(), "extracted node registry");
        Ok(units)
    }

    /// Model-level dependency mapping: unit_id -> ordered upstream unit_ids.
    ///
    /// Declaration order is preserved and duplicates keep their first
    /// occurrence, for deterministic downstream serialization. References
    /// to test-kind entries are dropped.
    pub fn extract_model_dependencies(
        &self,
    ) -> Result<BTreeMap<String, Vec<String>>, ExtractError> {
        let manifest = self.loader.manifest();
        let mut dependencies = BTreeMap::new();

        for (unique_id, node) in &manifest.nodes {
            let upstreams: Vec<String> = dedup_preserving(&node.depends_on.nodes)
                .into_iter()
                .filter(|id| !is_test_entry(id))
                .collect();
            dependencies.insert(unique_id.clone(), upstreams);
        }

        // Sources never declare upstreams but still appear in the mapping.
        for unique_id in manifest.sources.keys() {
            dependencies.insert(unique_id.clone(), Vec::new());
        }

        Ok(dependencies)
    }

    /// Column-level dependency mapping from explicit lineage metadata.
    ///
    /// A reference without a `.` separator is a data-quality issue in the
    /// source artifacts: it is skipped with a warning, never a failure.
    pub fn extract_column_dependencies(&self) -> Result<ColumnDependencies, ExtractError> {
        let manifest = self.loader.manifest();
        let mut dependencies = BTreeMap::new();
        let mut diagnostics = Vec::new();

        let nodes = manifest
            .nodes
            .iter()
            .map(|(id, n)| (id, n.fully_qualified_name(), &n.columns));
        let sources = manifest
            .sources
            .iter()
            .map(|(id, s)| (id, s.fully_qualified_name(), &s.columns));

        for (unique_id, unit_key, columns) in nodes.chain(sources) {
            for (column_name, definition) in columns {
                if definition.depends_on.is_empty() {
                    continue;
                }

                let column_key = ColumnRef::key(&unit_key, column_name);
                let mut upstreams = Vec::new();

                for token in dedup_preserving(&definition.depends_on) {
                    match ColumnRef::parse(&token) {
                        Ok(_) => upstreams.push(token),
                        Err(e) => {
                            tracing::warn!(
                                unit = %unique_id,
                                column = %column_name,
                                reference = %token,
                                "skipping malformed column reference"
                            );
                            diagnostics.push(
                                Diagnostic::new(
                                    DiagnosticCode::MalformedColumnRef,
                                    Severity::Warn,
                                    format!("column '{}': {}", column_key, e),
                                )
                                .with_identifier(token),
                            );
                        }
                    }
                }

                if !upstreams.is_empty() {
                    dependencies.insert(column_key, upstreams);
                }
            }
        }

        Ok(ColumnDependencies {
            dependencies,
            diagnostics,
        })
    }

    /// Run all extraction passes and combine the results.
    ///
    /// Any internal failure aborts the whole call; partial results are
    /// never returned.
    pub fn extract_all(&self) -> Result<Extraction, ExtractError> {
        let units = self.extract_nodes()?;
        let model_dependencies = self.extract_model_dependencies()?;
        let column_deps = self.extract_column_dependencies()?;

        let mut diagnostics = column_deps.diagnostics;
        for (unique_id, upstreams) in &model_dependencies {
            for upstream in upstreams {
                if !units.contains_key(upstream) {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::UndeclaredUpstream,
                            Severity::Info,
                            format!(
                                "'{}' depends on '{}', which is never declared in the manifest",
                                unique_id, upstream
                            ),
                        )
                        .with_identifier(upstream.clone()),
                    );
                }
            }
        }

        let mut columns = BTreeMap::new();
        for record in units.values() {
            for (name, meta) in &record.columns {
                columns.insert(
                    ColumnRef::key(&record.fully_qualified_name, name),
                    ColumnRecord {
                        unit: record.fully_qualified_name.clone(),
                        name: name.clone(),
                        meta: meta.clone(),
                    },
                );
            }
        }

        Ok(Extraction {
            units,
            model_dependencies,
            columns,
            column_dependencies: column_deps.dependencies,
            diagnostics,
        })
    }
}

/// Join manifest column definitions with catalog columns for one unit.
///
/// The catalog is authoritative for data types; the manifest contributes
/// descriptions and contract types for columns the catalog does not know.
fn join_columns(
    declared: &std::collections::HashMap<String, ColumnDefinition>,
    catalog: &crate::catalog::Catalog,
    unique_id: &str,
) -> BTreeMap<String, ColumnMeta> {
    let mut columns: BTreeMap<String, ColumnMeta> = BTreeMap::new();

    for (name, definition) in declared {
        columns.insert(
            name.clone(),
            ColumnMeta {
                data_type: definition.data_type.clone(),
                description: if definition.description.is_empty() {
                    None
                } else {
                    Some(definition.description.clone())
                },
            },
        );
    }

    if let Some(entry) = catalog.entry(unique_id) {
        for (name, column) in &entry.columns {
            let meta = columns.entry(name.clone()).or_default();
            meta.data_type = Some(column.data_type.clone());
            if meta.description.is_none() {
                meta.description = column.comment.clone();
            }
        }
    }

    columns
}

/// De-duplicate while preserving first occurrence order.
fn dedup_preserving(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

/// Extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("dependency extraction failed: {0}")]
    Failed(String),
}
