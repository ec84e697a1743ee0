//! Artifact loading
//!
//! Locates and parses the two dbt build artifacts under a project's
//! `target/` directory. Both files are required; absence of either aborts
//! the pipeline before any extraction happens.

use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::manifest::Manifest;

/// Loads and holds the two validated artifact documents.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    project_path: PathBuf,
    manifest: Manifest,
    catalog: Catalog,
}

impl ArtifactLoader {
    /// Load `target/manifest.json` and `target/catalog.json` from a dbt
    /// project root.
    pub fn load(project_root: &Path) -> Result<Self, ArtifactError> {
        let manifest_path = project_root.join("target").join("manifest.json");
        let catalog_path = project_root.join("target").join("catalog.json");

        let manifest_value = read_json("manifest", &manifest_path)?;
        let catalog_value = read_json("catalog", &catalog_path)?;

        let manifest = Manifest::from_value(manifest_value).map_err(|e| {
            ArtifactError::Malformed {
                artifact: "manifest",
                detail: e.to_string(),
            }
        })?;

        let catalog = Catalog::from_value(catalog_value).map_err(|e| {
            ArtifactError::Malformed {
                artifact: "catalog",
                detail: e.to_string(),
            }
        })?;

        tracing::debug!(
            nodes = manifest.nodes.len(),
            sources = manifest.sources.len(),
            catalog_entries = catalog.nodes.len() + catalog.sources.len(),
            "loaded dbt artifacts"
        );

        Ok(Self {
            project_path: project_root.to_path_buf(),
            manifest,
            catalog,
        })
    }

    /// The dbt project root this loader was built from
    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// The parsed manifest document
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The parsed catalog document
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

/// Read one artifact file into a raw JSON document.
fn read_json(artifact: &'static str, path: &Path) -> Result<serde_json::Value, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound {
            artifact,
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ArtifactError::Io {
        artifact,
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    serde_json::from_str(&contents).map_err(|e| ArtifactError::Malformed {
        artifact,
        detail: format!("{}: {}", path.display(), e),
    })
}

/// Artifact loading errors
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{artifact}.json not found at {path}: run 'dbt docs generate' first")]
    NotFound {
        artifact: &'static str,
        path: PathBuf,
    },

    #[error("failed to read {artifact}.json at {path}: {detail}")]
    Io {
        artifact: &'static str,
        path: PathBuf,
        detail: String,
    },

    #[error("malformed {artifact}.json: {detail}")]
    Malformed {
        artifact: &'static str,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_artifacts(dir: &Path, manifest: &str, catalog: &str) {
        let target = dir.join("target");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("manifest.json"), manifest).unwrap();
        fs::write(target.join("catalog.json"), catalog).unwrap();
    }

    const MINIMAL_MANIFEST: &str = r#"{"nodes": {}, "sources": {}}"#;
    const MINIMAL_CATALOG: &str = r#"{"nodes": {}, "sources": {}}"#;

    #[test]
    fn load_minimal_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), MINIMAL_MANIFEST, MINIMAL_CATALOG);

        let loader = ArtifactLoader::load(dir.path()).unwrap();
        assert!(loader.manifest().nodes.is_empty());
        assert!(loader.catalog().nodes.is_empty());
        assert_eq!(loader.project_path(), dir.path());
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target").join("catalog.json"), MINIMAL_CATALOG).unwrap();

        let err = ArtifactLoader::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::NotFound { artifact: "manifest", .. }
        ));
    }

    #[test]
    fn missing_catalog_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target").join("manifest.json"), MINIMAL_MANIFEST).unwrap();

        let err = ArtifactLoader::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::NotFound { artifact: "catalog", .. }
        ));
    }

    #[test]
    fn syntax_error_reports_document() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), "{not json", MINIMAL_CATALOG);

        let err = ArtifactLoader::load(dir.path()).unwrap_err();
        match err {
            ArtifactError::Malformed { artifact, .. } => assert_eq!(artifact, "manifest"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn schema_mismatch_reports_document() {
        // nodes must be an object, not an array
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), r#"{"nodes": []}"#, MINIMAL_CATALOG);

        let err = ArtifactLoader::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Malformed { artifact: "manifest", .. }
        ));
    }
}
