//! Bundle file importer.
//!
//! Loads ingestion bundles from JSON files in a data directory. The
//! compendium core owns no file boundary; this adapter sits in front of it
//! so hosts can ship game data as files (one bundle per file, the way
//! spell and monster source books are distributed).

use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;

use grimoire_shared::{BundleParseError, IngestionBundle};

/// Errors that can occur during import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Bundle file not found: {0}")]
    DataFileNotFound(PathBuf),
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),
    #[error("Malformed bundle in {path}: {source}")]
    MalformedBundle {
        path: PathBuf,
        source: BundleParseError,
    },
}

/// Importer for bundle data files.
pub struct BundleImporter {
    data_path: PathBuf,
}

impl BundleImporter {
    /// Creates an importer rooted at the given data directory.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    /// Checks that the configured data directory exists.
    pub async fn validate_path(&self) -> bool {
        fs::metadata(&self.data_path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    /// Loads one bundle file from the data directory.
    ///
    /// The filename must not contain path separators or traversal
    /// sequences. A bundle without a `name` is given the file stem as its
    /// entity-group name, so file-shipped bundles are dependency-trackable
    /// out of the box.
    pub async fn load_bundle(&self, filename: &str) -> Result<IngestionBundle, ImportError> {
        // Prevent path traversal attacks
        if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
            return Err(ImportError::InvalidFilename(filename.to_owned()));
        }

        let file_path = self.data_path.join(filename);
        if fs::metadata(&file_path).await.is_err() {
            return Err(ImportError::DataFileNotFound(file_path));
        }

        let content = fs::read_to_string(&file_path).await?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let mut bundle =
            IngestionBundle::from_value(value).map_err(|source| ImportError::MalformedBundle {
                path: file_path.clone(),
                source,
            })?;

        if bundle.name.is_none() {
            bundle.name = file_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
        }

        tracing::info!(
            file = %file_path.display(),
            group = ?bundle.name,
            collections = bundle.collections.len(),
            "loaded bundle file"
        );
        Ok(bundle)
    }

    /// Loads every `*.json` file in the data directory, sorted by file
    /// name for deterministic ingestion order.
    pub async fn load_dir(&self) -> Result<Vec<IngestionBundle>, ImportError> {
        let mut filenames = Vec::new();
        let mut entries = fs::read_dir(&self.data_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(filename) = path.file_name() {
                    filenames.push(filename.to_string_lossy().into_owned());
                }
            }
        }
        filenames.sort();

        let mut bundles = Vec::with_capacity(filenames.len());
        for filename in &filenames {
            bundles.push(self.load_bundle(filename).await?);
        }
        Ok(bundles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    async fn write_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).await.unwrap();
    }

    #[tokio::test]
    async fn load_bundle_reads_and_names_the_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "srd-spells.json",
            &json!({ "version": "0.2", "spells": [{ "name": "spell1" }] }).to_string(),
        )
        .await;

        let importer = BundleImporter::new(dir.path());
        assert!(importer.validate_path().await);

        let bundle = importer.load_bundle("srd-spells.json").await.unwrap();
        // Name defaults to the file stem
        assert_eq!(bundle.name.as_deref(), Some("srd-spells"));
        assert_eq!(bundle.version.as_deref(), Some("0.2"));
        assert_eq!(bundle.collections.len(), 1);
    }

    #[tokio::test]
    async fn load_bundle_keeps_an_explicit_name() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "file.json",
            &json!({ "name": "base", "spells": [] }).to_string(),
        )
        .await;

        let bundle = BundleImporter::new(dir.path())
            .load_bundle("file.json")
            .await
            .unwrap();
        assert_eq!(bundle.name.as_deref(), Some("base"));
    }

    #[tokio::test]
    async fn load_bundle_rejects_path_traversal() {
        let importer = BundleImporter::new("/tmp/data");
        let err = importer.load_bundle("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, ImportError::InvalidFilename(_)));
    }

    #[tokio::test]
    async fn load_bundle_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = BundleImporter::new(dir.path())
            .load_bundle("absent.json")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::DataFileNotFound(_)));
    }

    #[tokio::test]
    async fn load_bundle_reports_malformed_bundles() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "bad.json", "[1, 2, 3]").await;
        let err = BundleImporter::new(dir.path())
            .load_bundle("bad.json")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::MalformedBundle { .. }));
    }

    #[tokio::test]
    async fn load_dir_sorts_by_filename_and_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b-monsters.json", &json!({ "monsters": [] }).to_string()).await;
        write_file(dir.path(), "a-spells.json", &json!({ "spells": [] }).to_string()).await;
        write_file(dir.path(), "notes.txt", "not a bundle").await;

        let bundles = BundleImporter::new(dir.path()).load_dir().await.unwrap();
        let names: Vec<_> = bundles.iter().map(|b| b.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["a-spells", "b-monsters"]);
    }
}
