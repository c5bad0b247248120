//! Document sources: turn files on disk into [`Document`]s.
//!
//! A file that cannot be read or extracted is logged and skipped; the rest
//! of the batch still loads.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use rag_assistant_core::models::Document;

use crate::extract::{extract_file, FileKind};

/// Recursively load every `.txt` and `.pdf` file under `dir`, in path order.
pub fn load_directory(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        bail!("Document directory does not exist: {}", dir.display());
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if entry.file_type().is_file() && FileKind::from_path(entry.path()).is_some() {
            paths.push(entry.into_path());
        }
    }

    // Sort for deterministic ordering
    paths.sort();

    let docs = load_paths(&paths);
    info!(
        dir = %dir.display(),
        found = paths.len(),
        loaded = docs.len(),
        "Loaded documents"
    );
    Ok(docs)
}

/// Load an explicit list of files. Unsupported extensions are skipped.
pub fn load_files(paths: &[PathBuf]) -> Vec<Document> {
    let supported: Vec<PathBuf> = paths
        .iter()
        .filter(|p| {
            let ok = FileKind::from_path(p).is_some();
            if !ok {
                warn!(path = %p.display(), "Skipping unsupported file type");
            }
            ok
        })
        .cloned()
        .collect();
    load_paths(&supported)
}

fn load_paths(paths: &[PathBuf]) -> Vec<Document> {
    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        match extract_file(path) {
            Ok(doc) => {
                info!(path = %path.display(), chars = doc.content.chars().count(), "Processed");
                docs.push(doc);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping file"),
        }
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_directory_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.txt"), "Second file.").unwrap();
        fs::write(root.join("a.TXT"), "First file.").unwrap();
        fs::write(root.join("nested/c.txt"), "Nested file.").unwrap();
        fs::write(root.join("notes.md"), "ignored").unwrap();
        fs::write(root.join("broken.pdf"), b"not a pdf").unwrap();

        let docs = load_directory(root).unwrap();
        let sources: Vec<&str> = docs.iter().filter_map(|d| d.source()).collect();
        assert_eq!(sources, vec!["a.TXT", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_load_directory_missing() {
        let err = load_directory(Path::new("/nonexistent/rag-data")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_load_files_skips_unsupported_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.txt");
        fs::write(&good, "Good.").unwrap();
        let paths = vec![
            good,
            tmp.path().join("image.png"),
            tmp.path().join("missing.txt"),
        ];
        let docs = load_files(&paths);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "Good.");
    }
}
