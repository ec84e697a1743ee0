//! dbt artifact parsing and dependency extraction
//!
//! This crate handles:
//! - Parsing manifest.json and catalog.json (dbt-generated artifacts)
//! - Sanitizing known schema quirks before strict validation
//! - Extracting model-level and column-level dependency mappings

pub mod catalog;
pub mod extractor;
pub mod loader;
pub mod manifest;

pub use catalog::{Catalog, CatalogColumn, CatalogEntry, CatalogMetadata, RelationMetadata};
pub use extractor::{
    ColumnDependencies, ColumnMeta, ColumnRecord, DependencyExtractor, ExtractError, Extraction,
    NodeRecord,
};
pub use loader::{ArtifactError, ArtifactLoader};
pub use manifest::{
    is_test_entry, ColumnDefinition, DependsOn, Manifest, ManifestMetadata, ManifestNode,
    ManifestSource, ResourceKind,
};
