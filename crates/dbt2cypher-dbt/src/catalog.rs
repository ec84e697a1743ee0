//! dbt catalog.json parsing
//!
//! The catalog carries the physical columns produced by each relation.
//! Its top-level `metadata.generated_at` field changes format across dbt
//! versions, so it is stripped before strict deserialization.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// dbt catalog.json structure (subset of fields we care about)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Metadata about the catalog (volatile fields removed by sanitization)
    #[serde(default)]
    pub metadata: CatalogMetadata,

    /// Catalog entries for model-like nodes, keyed by unique_id
    pub nodes: HashMap<String, CatalogEntry>,

    /// Catalog entries for sources, keyed by unique_id
    #[serde(default)]
    pub sources: HashMap<String, CatalogEntry>,
}

impl Catalog {
    /// Parse a catalog from a JSON document, sanitizing first.
    pub fn from_value(mut value: serde_json::Value) -> Result<Self, serde_json::Error> {
        sanitize(&mut value);
        serde_json::from_value(value)
    }

    /// Look up an entry by unique_id, across nodes and sources.
    pub fn entry(&self, unique_id: &str) -> Option<&CatalogEntry> {
        self.nodes
            .get(unique_id)
            .or_else(|| self.sources.get(unique_id))
    }
}

/// Strip volatile metadata fields that break strict validation.
fn sanitize(value: &mut serde_json::Value) {
    if let Some(metadata) = value.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        metadata.remove("generated_at");
    }
}

/// Catalog metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    #[serde(default)]
    pub dbt_schema_version: Option<String>,

    #[serde(default)]
    pub dbt_version: Option<String>,

    #[serde(default)]
    pub invocation_id: Option<String>,
}

/// One relation's catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Relation metadata
    #[serde(default)]
    pub metadata: RelationMetadata,

    /// Physical columns, keyed by column name
    #[serde(default)]
    pub columns: HashMap<String, CatalogColumn>,
}

/// Relation-level metadata within a catalog entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationMetadata {
    /// Relation type (table, view, ...)
    #[serde(rename = "type", default)]
    pub relation_type: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub comment: Option<String>,
}

/// A physical column from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogColumn {
    /// Column name
    pub name: String,

    /// Column data type as reported by the warehouse
    #[serde(rename = "type")]
    pub data_type: String,

    /// Ordinal position
    #[serde(default)]
    pub index: Option<u32>,

    /// Column comment
    #[serde(default)]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> serde_json::Value {
        serde_json::json!({
            "metadata": {
                "dbt_version": "1.7.0",
                // Numeric timestamps from older dbt versions fail strict
                // string-typed validation; sanitization must remove them.
                "generated_at": 1718031600
            },
            "nodes": {
                "model.jaffle_shop.orders": {
                    "metadata": {"type": "table", "schema": "main", "name": "orders"},
                    "columns": {
                        "amount": {"name": "amount", "type": "NUMERIC", "index": 1}
                    }
                }
            },
            "sources": {
                "source.jaffle_shop.raw.orders": {
                    "metadata": {"type": "table"},
                    "columns": {}
                }
            }
        })
    }

    #[test]
    fn volatile_metadata_is_stripped() {
        let catalog = Catalog::from_value(sample_catalog()).unwrap();
        assert_eq!(catalog.metadata.dbt_version.as_deref(), Some("1.7.0"));
    }

    #[test]
    fn entry_lookup_spans_nodes_and_sources() {
        let catalog = Catalog::from_value(sample_catalog()).unwrap();

        assert!(catalog.entry("model.jaffle_shop.orders").is_some());
        assert!(catalog.entry("source.jaffle_shop.raw.orders").is_some());
        assert!(catalog.entry("model.jaffle_shop.missing").is_none());
    }

    #[test]
    fn columns_parse_with_types() {
        let catalog = Catalog::from_value(sample_catalog()).unwrap();
        let orders = catalog.entry("model.jaffle_shop.orders").unwrap();

        let amount = orders.columns.get("amount").unwrap();
        assert_eq!(amount.data_type, "NUMERIC");
        assert_eq!(amount.index, Some(1));
    }
}
