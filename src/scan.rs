//! Page discovery.
//!
//! Walks the pages root and turns every file with a recognized extension into
//! a [`PageEntry`]. Names are the root-relative path without the extension:
//!
//! ```text
//! src/pages/index.tsx        ──► "index"
//! src/pages/blog/post.jsx    ──► "blog/post"
//! src/pages/_error.tsx       ──► "_error"
//! ```

use crate::error::Error;
use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Extensions recognized as page sources by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx"];

/// A discovered page source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// Root-relative path, extension stripped, `/`-separated
    pub name: String,
    /// Absolute source path
    pub source: PathBuf,
}

/// Page name -> entry request, in discovery order.
pub type PageEntries = Vec<(String, PathBuf)>;

/// Recursively collect page sources under `root`, sorted by path.
///
/// Symlinks are followed and classified by their target. A missing or
/// unreadable root, a symlink loop, or a page under a non-UTF-8 directory is
/// an error: no pages are silently skipped.
pub fn scan<S: AsRef<str>>(root: &Path, extensions: &[S]) -> Result<Vec<PageEntry>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to scan `{}`", root.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        files.push(entry.into_path());
    }
    files.sort();

    let mut pages = Vec::new();
    for path in files {
        if let Some(name) = page_name(root, &path, extensions)? {
            pages.push(PageEntry { name, source: path });
        }
    }

    Ok(pages)
}

/// Build the name -> source map handed to the child compiler.
///
/// Two files mapping to the same name (`about.js` and `about.tsx`) would
/// overwrite each other's output, so that is rejected.
pub fn entries(pages: &[PageEntry]) -> Result<PageEntries> {
    let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();
    for page in pages {
        if let Some(first) = seen.insert(&page.name, &page.source) {
            bail!(Error::DuplicatePage {
                name: page.name.clone(),
                first: first.to_path_buf(),
                second: page.source.clone(),
            });
        }
    }

    Ok(pages
        .iter()
        .map(|p| (p.name.clone(), p.source.clone()))
        .collect())
}

/// Derive a page name, or `None` if the extension is not recognized.
fn page_name<S: AsRef<str>>(
    root: &Path,
    path: &Path,
    extensions: &[S],
) -> Result<Option<String>> {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(None);
    };
    let Some(ext) = extensions.iter().map(AsRef::as_ref).find(|ext| {
        file_name
            .strip_suffix(ext)
            .and_then(|stem| stem.strip_suffix('.'))
            .is_some_and(|stem| !stem.is_empty())
    }) else {
        return Ok(None);
    };

    let Ok(relative) = path.strip_prefix(root) else {
        return Ok(None);
    };
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let Some(part) = part.to_str() else {
                bail!("Page path `{}` is not valid UTF-8", path.display());
            };
            parts.push(part);
        }
    }

    let joined = parts.join("/");
    let name = &joined[..joined.len() - ext.len() - 1];
    Ok(Some(name.to_owned()))
}

// ============================================================================
// Tests
// ============================================================================
