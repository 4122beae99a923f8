//! Filesystem connector for reference documents.
//!
//! Walks a directory (or takes a single file) and turns every matching
//! plain-text or Markdown file into a [`ReferenceDocument`]. The source ID
//! is the path relative to the scan root; the file's modification time
//! becomes `updated_at`, which retrieval uses as its recency tie-breaker.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::models::{DocumentType, ReferenceDocument};

pub fn scan_directory(
    root: &Path,
    config: &IngestConfig,
    document_type: DocumentType,
) -> Result<Vec<ReferenceDocument>> {
    if !root.exists() {
        bail!("Ingest path does not exist: {}", root.display());
    }
    if root.is_file() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());
        return Ok(file_to_document(root, &name, document_type)?.into_iter().collect());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut documents = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        if let Some(doc) = file_to_document(path, &rel_str, document_type)? {
            documents.push(doc);
        }
    }

    // Sort for deterministic ordering
    documents.sort_by(|a, b| a.source_id.cmp(&b.source_id));

    Ok(documents)
}

/// `None` for files that are not valid UTF-8.
fn file_to_document(path: &Path, relative_path: &str, document_type: DocumentType) -> Result<Option<ReferenceDocument>> {
    let metadata = std::fs::metadata(path)?;
    let modified_secs = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
            return Ok(None);
        }
    };

    let title = path.file_stem().map(|n| n.to_string_lossy().to_string());

    Ok(Some(ReferenceDocument {
        source_id: relative_path.to_string(),
        title,
        body,
        document_type,
        tags: Vec::new(),
        updated_at: modified_secs,
    }))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("guides")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("guides/voice.md"), "# Voice\n\nPrefer active voice.").unwrap();
        fs::write(dir.path().join("a.txt"), "Keep sentences short.").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(dir.path().join(".git/notes.md"), "ignored").unwrap();

        let docs = scan_directory(dir.path(), &IngestConfig::default(), DocumentType::Technical).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "guides/voice.md"]);
        assert_eq!(docs[1].title.as_deref(), Some("voice"));
        assert_eq!(docs[1].document_type, DocumentType::Technical);
    }

    #[test]
    fn test_single_file_and_missing_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("style.md");
        fs::write(&file, "Avoid jargon.").unwrap();

        let docs = scan_directory(&file, &IngestConfig::default(), DocumentType::General).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "style.md");

        assert!(scan_directory(&dir.path().join("nope"), &IngestConfig::default(), DocumentType::General).is_err());
    }
}
