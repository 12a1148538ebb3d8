//! File Copier Module
//!
//! Mirrors a source tree into a build tree so that nothing is lost:
//! - every directory is recreated at the same relative path
//! - pass-through files are copied verbatim (modification time preserved)
//! - files routed for conversion are staged and handed back to the caller
//!
//! Mirrored paths come from `strip_prefix(source_root)` joined onto the
//! destination root, never from string replacement.

use anyhow::{bail, Context, Result};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What the mirror should do with one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRoute {
    /// Copy verbatim; the caller never sees it again
    PassThrough,
    /// Stage the file and report it back for further processing
    Defer,
}

/// A staged file awaiting processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredFile {
    /// Location in the source tree
    pub source: PathBuf,
    /// Location of the staged copy in the destination tree
    pub staged: PathBuf,
    /// Size of the source file when it was staged
    pub size: u64,
}

/// Mirror statistics
#[derive(Debug, Clone, Default)]
pub struct MirrorResult {
    pub directories: usize,
    pub copied: usize,
    pub deferred: Vec<DeferredFile>,
    pub failed: usize,
    pub errors: Vec<(PathBuf, String)>,
}

impl MirrorResult {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, path: PathBuf, error: String) {
        tracing::warn!(path = %path.display(), error = %error, "Mirror step failed");
        self.failed += 1;
        self.errors.push((path, error));
    }
}

/// Mirror `source_root` into `dest_root`.
///
/// `route` receives each file's path and the name of the directory that
/// contains it. Only setup problems are returned as `Err`: the source is not
/// a directory, the destination cannot be created, or the destination lies
/// inside the source. Everything below the roots is best effort: a directory
/// that cannot be created skips its subtree, a file that cannot be copied is
/// skipped, and both are recorded in [`MirrorResult::errors`].
pub fn mirror_tree<F>(source_root: &Path, dest_root: &Path, route: F) -> Result<MirrorResult>
where
    F: Fn(&Path, Option<&str>) -> FileRoute,
{
    if !source_root.is_dir() {
        bail!("Source is not a directory: {}", source_root.display());
    }

    let canonical_source = source_root
        .canonicalize()
        .with_context(|| format!("Failed to resolve source: {}", source_root.display()))?;
    if resolve_lexically(dest_root)?.starts_with(&canonical_source) {
        bail!(
            "Build directory {} must not be inside the source tree {}",
            dest_root.display(),
            source_root.display()
        );
    }

    fs::create_dir_all(dest_root)
        .with_context(|| format!("Failed to create build directory: {}", dest_root.display()))?;

    let mut result = MirrorResult::new();
    let mut walker = WalkDir::new(source_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source_root.to_path_buf());
                result.fail(path, e.to_string());
                continue;
            }
        };

        let path = entry.path();
        let rel_path = match path.strip_prefix(source_root) {
            Ok(rel) => rel,
            Err(_) => {
                result.fail(path.to_path_buf(), "Entry escaped the source root".to_string());
                continue;
            }
        };
        let dest = dest_root.join(rel_path);

        if entry.file_type().is_dir() {
            match fs::create_dir_all(&dest) {
                Ok(()) => result.directories += 1,
                Err(e) => {
                    result.fail(dest, format!("Failed to create dir: {}", e));
                    walker.skip_current_dir();
                }
            }
            continue;
        }

        if !entry.file_type().is_file() {
            tracing::debug!(path = %path.display(), "Skipping special file");
            continue;
        }

        let dir_name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        let file_route = route(path, dir_name);

        let size = match fs::copy(path, &dest) {
            Ok(size) => size,
            Err(e) => {
                result.fail(path.to_path_buf(), format!("Failed to copy to {}: {}", dest.display(), e));
                continue;
            }
        };

        match file_route {
            FileRoute::PassThrough => {
                preserve_modified_time(path, &dest);
                result.copied += 1;
                tracing::debug!(from = %path.display(), to = %dest.display(), "Copied pass-through file");
            }
            FileRoute::Defer => {
                tracing::debug!(from = %path.display(), to = %dest.display(), "Staged file for conversion");
                result.deferred.push(DeferredFile {
                    source: path.to_path_buf(),
                    staged: dest,
                    size,
                });
            }
        }
    }

    Ok(result)
}

/// Canonical form of a path that may not exist yet: the deepest existing
/// ancestor is canonicalized and the remaining components are appended.
fn resolve_lexically(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read the working directory")?
            .join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", existing.display()))?;
    for name in missing.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

fn preserve_modified_time(source: &Path, dest: &Path) {
    let mtime = match fs::metadata(source) {
        Ok(meta) => FileTime::from_last_modification_time(&meta),
        Err(_) => return,
    };
    if let Err(e) = filetime::set_file_mtime(dest, mtime) {
        tracing::debug!(path = %dest.display(), error = %e, "Could not preserve modification time");
    }
}
