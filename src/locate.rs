//! Resolution of dataset rows to source files.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finds the source file a row refers to.
#[derive(Debug, Clone)]
pub enum SourceLocator {
    /// Row value is a path, optionally relative to a base directory
    Path { base_dir: Option<PathBuf> },
    /// Row value is a hash contained in an indexed file name
    Hash { index: Vec<PathBuf> },
}

impl SourceLocator {
    /// Locator for rows that carry a file path.
    pub fn by_path(base_dir: Option<PathBuf>) -> Self {
        SourceLocator::Path { base_dir }
    }

    /// Locator for rows that carry a hash, indexing `root` up front.
    pub fn by_hash(root: &Path, extension: &str, exclude: &[String]) -> anyhow::Result<Self> {
        let index = index_sources(root, extension, exclude)?;
        tracing::info!(
            "indexed {} .{} files under {}",
            index.len(),
            extension,
            root.display()
        );
        Ok(SourceLocator::Hash { index })
    }

    /// Resolve a row value to a candidate path.
    ///
    /// Path mode always yields a path (existence is checked by the caller);
    /// hash mode yields `None` when no indexed file name contains the hash.
    pub fn resolve(&self, value: &str) -> Option<PathBuf> {
        match self {
            SourceLocator::Path { base_dir } => {
                let path = PathBuf::from(value);
                match base_dir {
                    Some(base) if path.is_relative() => Some(base.join(path)),
                    _ => Some(path),
                }
            }
            SourceLocator::Hash { index } => {
                let needle = value.to_lowercase();
                index
                    .iter()
                    .find(|path| {
                        path.file_name()
                            .map(|n| n.to_string_lossy().to_lowercase().contains(&needle))
                            .unwrap_or(false)
                    })
                    .cloned()
            }
        }
    }
}

fn build_excludes(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid exclude pattern {:?}: {}", pattern, e))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect files with `extension` (case-insensitive) under `root`, sorted.
pub fn index_sources(
    root: &Path,
    extension: &str,
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let excludes = build_excludes(exclude)?;
    let wanted = extension.trim_start_matches('.').to_lowercase();
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| anyhow::anyhow!("walking {}: {}", root.display(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase() == wanted)
            .unwrap_or(false);
        if !matches_ext {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if excludes.is_match(relative) || excludes.is_match(path) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}
