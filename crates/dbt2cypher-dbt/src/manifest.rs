//! dbt manifest.json parsing
//!
//! Parses dbt-generated manifest.json to extract models, sources, and
//! dependency declarations. Test-kind nodes are dropped before strict
//! deserialization: they do not represent buildable lineage and commonly
//! fail strict schema checks across dbt versions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// unique_id prefixes that mark test-kind entries
const TEST_PREFIXES: &[&str] = &["test.", "unit_test."];

/// Check whether a unique_id names a test-kind entry
pub fn is_test_entry(unique_id: &str) -> bool {
    TEST_PREFIXES.iter().any(|p| unique_id.starts_with(p))
}

/// dbt manifest.json structure (subset of fields we care about)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Metadata about the manifest
    #[serde(default)]
    pub metadata: ManifestMetadata,

    /// Model, seed, and snapshot nodes (tests removed by sanitization)
    pub nodes: HashMap<String, ManifestNode>,

    /// Source definitions
    #[serde(default)]
    pub sources: HashMap<String, ManifestSource>,
}

impl Manifest {
    /// Parse a manifest from a JSON document, sanitizing first.
    pub fn from_value(mut value: serde_json::Value) -> Result<Self, serde_json::Error> {
        sanitize(&mut value);
        serde_json::from_value(value)
    }

    /// Get a specific node by unique_id
    pub fn get_node(&self, unique_id: &str) -> Option<&ManifestNode> {
        self.nodes.get(unique_id)
    }

    /// Get a specific source by unique_id
    pub fn get_source(&self, unique_id: &str) -> Option<&ManifestSource> {
        self.sources.get(unique_id)
    }
}

/// Drop test-kind entries from the raw manifest document.
fn sanitize(value: &mut serde_json::Value) {
    if let Some(nodes) = value.get_mut("nodes").and_then(|n| n.as_object_mut()) {
        nodes.retain(|unique_id, _| !is_test_entry(unique_id));
    }
}

/// Manifest metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub dbt_schema_version: Option<String>,

    #[serde(default)]
    pub dbt_version: Option<String>,

    #[serde(default)]
    pub project_name: Option<String>,

    #[serde(default)]
    pub invocation_id: Option<String>,
}

/// Resource kind of a manifest node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Model,
    Seed,
    Snapshot,
    Source,
    Analysis,
    Operation,
    #[serde(other)]
    Other,
}

impl ResourceKind {
    /// Stable lowercase name, matching the manifest's resource_type values
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Seed => "seed",
            Self::Snapshot => "snapshot",
            Self::Source => "source",
            Self::Analysis => "analysis",
            Self::Operation => "operation",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A buildable node in the manifest (model, seed, snapshot)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    /// Unique identifier (e.g., "model.my_project.users")
    pub unique_id: String,

    /// Node name (e.g., "users")
    pub name: String,

    /// Resource type
    pub resource_type: ResourceKind,

    /// Database name
    #[serde(default)]
    pub database: Option<String>,

    /// Schema name
    #[serde(default)]
    pub schema: Option<String>,

    /// Alias (output table name, overrides name when set)
    #[serde(default)]
    pub alias: Option<String>,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Column definitions
    #[serde(default)]
    pub columns: HashMap<String, ColumnDefinition>,

    /// Dependencies
    #[serde(default)]
    pub depends_on: DependsOn,
}

impl ManifestNode {
    /// Derived `database.schema.name` key, skipping absent segments.
    /// The alias wins over the model name when present.
    pub fn fully_qualified_name(&self) -> String {
        let relation = self.alias.as_deref().unwrap_or(&self.name);

        [self.database.as_deref(), self.schema.as_deref(), Some(relation)]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Column definition from the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Data type (if specified in contract)
    #[serde(default)]
    pub data_type: Option<String>,

    /// Explicit column-level lineage, as `unit.column` tokens.
    /// Empty unless the project records column lineage metadata.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Dependencies structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependsOn {
    /// List of node unique_ids this node depends on
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// A source in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSource {
    /// Unique identifier (e.g., "source.my_project.raw.users")
    pub unique_id: String,

    /// Source name (e.g., "raw")
    pub source_name: String,

    /// Table name (e.g., "users")
    pub name: String,

    /// Database name
    #[serde(default)]
    pub database: Option<String>,

    /// Schema name
    #[serde(default)]
    pub schema: Option<String>,

    /// Identifier (actual table name)
    #[serde(default)]
    pub identifier: Option<String>,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Column definitions
    #[serde(default)]
    pub columns: HashMap<String, ColumnDefinition>,
}

impl ManifestSource {
    /// Derived `database.schema.name` key, skipping absent segments.
    pub fn fully_qualified_name(&self) -> String {
        let relation = self.identifier.as_deref().unwrap_or(&self.name);

        [self.database.as_deref(), self.schema.as_deref(), Some(relation)]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest() -> serde_json::Value {
        serde_json::json!({
            "metadata": {
                "dbt_version": "1.7.0",
                "project_name": "jaffle_shop"
            },
            "nodes": {
                "model.jaffle_shop.orders": {
                    "unique_id": "model.jaffle_shop.orders",
                    "name": "orders",
                    "resource_type": "model",
                    "database": "analytics",
                    "schema": "main",
                    "depends_on": {"nodes": ["model.jaffle_shop.stg_orders"]}
                },
                "test.jaffle_shop.not_null_orders_id": {
                    "unique_id": "test.jaffle_shop.not_null_orders_id",
                    "resource_type": "test",
                    "bogus_shape": true
                }
            },
            "sources": {
                "source.jaffle_shop.raw.orders": {
                    "unique_id": "source.jaffle_shop.raw.orders",
                    "source_name": "raw",
                    "name": "orders",
                    "database": "raw_db",
                    "schema": "raw"
                }
            }
        })
    }

    #[test]
    fn test_entries_are_dropped_before_validation() {
        // The test node above is structurally invalid; sanitization must
        // remove it before typed deserialization.
        let manifest = Manifest::from_value(sample_manifest()).unwrap();

        assert_eq!(manifest.nodes.len(), 1);
        assert!(manifest.get_node("model.jaffle_shop.orders").is_some());
        assert!(manifest.get_node("test.jaffle_shop.not_null_orders_id").is_none());
    }

    #[test]
    fn fully_qualified_name_joins_segments() {
        let manifest = Manifest::from_value(sample_manifest()).unwrap();
        let orders = manifest.get_node("model.jaffle_shop.orders").unwrap();

        assert_eq!(orders.fully_qualified_name(), "analytics.main.orders");
        assert_eq!(orders.resource_type, ResourceKind::Model);
    }

    #[test]
    fn missing_database_is_skipped_in_fqn() {
        let mut value = sample_manifest();
        value["nodes"]["model.jaffle_shop.orders"]
            .as_object_mut()
            .unwrap()
            .remove("database");

        let manifest = Manifest::from_value(value).unwrap();
        let orders = manifest.get_node("model.jaffle_shop.orders").unwrap();
        assert_eq!(orders.fully_qualified_name(), "main.orders");
    }

    #[test]
    fn alias_overrides_name_in_fqn() {
        let mut value = sample_manifest();
        value["nodes"]["model.jaffle_shop.orders"]["alias"] =
            serde_json::json!("orders_final");

        let manifest = Manifest::from_value(value).unwrap();
        let orders = manifest.get_node("model.jaffle_shop.orders").unwrap();
        assert_eq!(orders.fully_qualified_name(), "analytics.main.orders_final");
    }

    #[test]
    fn unknown_resource_type_parses_as_other() {
        let value = serde_json::json!({
            "nodes": {
                "exposure.jaffle_shop.weekly": {
                    "unique_id": "exposure.jaffle_shop.weekly",
                    "name": "weekly",
                    "resource_type": "exposure"
                }
            }
        });

        let manifest = Manifest::from_value(value).unwrap();
        let node = manifest.get_node("exposure.jaffle_shop.weekly").unwrap();
        assert_eq!(node.resource_type, ResourceKind::Other);
    }
}
