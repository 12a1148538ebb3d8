//! Candidate selection.
//!
//! A file is converted when its extension is the compressed-texture
//! extension and it does not live in a pass-through directory. Files in a
//! pass-through directory (UI assets, by default) are always copied as-is,
//! whatever their extension.

use shared_utils::FileRoute;
use std::path::Path;

/// Extension of files the tool converts.
pub const CANDIDATE_EXTENSION: &str = "ddx";

/// Extension the external converter reads and writes.
pub const INTERMEDIATE_EXTENSION: &str = "dds";

/// Directories whose files are never converted.
pub const DEFAULT_PASS_THROUGH_DIRS: &[&str] = &["ui"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Compared case-insensitively, without the dot
    pub candidate_extension: String,
    /// Compared case-insensitively against the containing directory name
    pub pass_through_dirs: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            candidate_extension: CANDIDATE_EXTENSION.to_string(),
            pass_through_dirs: DEFAULT_PASS_THROUGH_DIRS
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

impl GateConfig {
    /// Whether `file` should be converted rather than copied.
    ///
    /// The directory override is checked first: a file inside a pass-through
    /// directory is never a candidate.
    pub fn is_candidate(&self, file: &Path, containing_dir: Option<&str>) -> bool {
        if let Some(dir) = containing_dir {
            if self
                .pass_through_dirs
                .iter()
                .any(|d| d.eq_ignore_ascii_case(dir))
            {
                return false;
            }
        }

        file.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&self.candidate_extension))
            .unwrap_or(false)
    }

    pub fn route(&self, file: &Path, containing_dir: Option<&str>) -> FileRoute {
        if self.is_candidate(file, containing_dir) {
            FileRoute::Defer
        } else {
            FileRoute::PassThrough
        }
    }
}
