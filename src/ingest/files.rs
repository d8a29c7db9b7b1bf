/// Source file discovery for a repository checkout.
///
/// Walks the tree (gitignore-aware), keeps files matching the extension
/// allowlist, and reads their content. Traversal order is not guaranteed;
/// nothing downstream may depend on it.
use std::path::Path;

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use tracing::{debug, warn};

/// Directories never descended into, regardless of gitignore state.
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    ".next",
    ".venv",
    "__pycache__",
];

/// A candidate source file with its content already read.
#[derive(Debug)]
pub struct SourceFile {
    /// Path relative to the repository root, `/`-separated.
    pub rel_path: String,
    pub content: String,
}

/// Whether a file extension is on the allowlist.
fn is_supported_extension(ext: &str) -> bool {
    matches!(ext, "js" | "ts" | "tsx" | "jsx" | "py" | "mjs")
}

/// Collect all candidate source files under `root`.
///
/// Files whose trimmed content is empty are skipped, as are minified
/// bundles (`*.min.js`). Unreadable files are logged and skipped.
pub fn collect_source_files(root: &Path) -> Result<Vec<SourceFile>> {
    anyhow::ensure!(root.is_dir(), "not a directory: {}", root.display());

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.path().is_dir() && EXCLUDED_DIRS.contains(&name.as_ref()))
        })
        .build();

    let mut files = Vec::new();

    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if !is_supported_extension(ext) {
            continue;
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if file_name.ends_with(".min.js") {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Skipping unreadable file {}: {e}", path.display());
                continue;
            }
        };
        if content.trim().is_empty() {
            debug!("Skipping empty file {}", path.display());
            continue;
        }

        let rel_path = path
            .strip_prefix(root)
            .with_context(|| format!("path escaped root: {}", path.display()))?
            .to_string_lossy()
            .replace('\\', "/");

        files.push(SourceFile { rel_path, content });
    }

    Ok(files)
}
