//! Gathering uploads from the filesystem.
//!
//! Two ways in: an input directory whose subdirectories are named by
//! category slug (`contract/`, `official/`, `meeting/`, `email/`, `daily/`,
//! `etc/`), and explicit `CATEGORY=PATH` arguments.

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::InputConfig;
use crate::models::{Category, Upload};

/// Collect uploads from category subdirectories of `root`.
///
/// Missing category directories are skipped. Files are matched against the
/// include/exclude globs relative to their category directory and returned
/// in category order, then path order.
pub fn scan_category_dirs(root: &Path, input: &InputConfig) -> Result<Vec<Upload>> {
    if !root.is_dir() {
        bail!("Input directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&input.include_globs)?;
    let exclude_set = build_globset(&input.exclude_globs)?;

    let mut uploads = Vec::new();
    for category in Category::ALL {
        let dir = root.join(category.slug());
        if !dir.is_dir() {
            continue;
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(input.follow_symlinks) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(&dir).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }
            paths.push(path.to_path_buf());
        }

        // Sort for deterministic ordering
        paths.sort();
        for path in paths {
            uploads.push(load_upload(category, &path)?);
        }
    }

    tracing::debug!(root = %root.display(), files = uploads.len(), "input directory scanned");
    Ok(uploads)
}

/// Parse a `CATEGORY=PATH` argument.
pub fn parse_file_arg(arg: &str) -> Result<(Category, PathBuf)> {
    let (category, path) = arg
        .split_once('=')
        .with_context(|| format!("Expected CATEGORY=PATH, got '{}'", arg))?;
    if path.trim().is_empty() {
        bail!("Missing path in '{}'", arg);
    }
    Ok((category.parse()?, PathBuf::from(path.trim())))
}

/// Read a file into an [`Upload`] named by its file name.
pub fn load_upload(category: Category, path: &Path) -> Result<Upload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Upload {
        category,
        filename,
        bytes,
    })
}

/// Uploads from an optional input directory plus explicit file arguments.
pub fn collect_uploads(
    input_dir: Option<&Path>,
    files: &[String],
    input: &InputConfig,
) -> Result<Vec<Upload>> {
    let mut uploads = match input_dir {
        Some(dir) => scan_category_dirs(dir, input)?,
        None => Vec::new(),
    };
    for arg in files {
        let (category, path) = parse_file_arg(arg)?;
        uploads.push(load_upload(category, &path)?);
    }
    Ok(uploads)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    Ok(builder.build()?)
}
