use crate::gate::INTERMEDIATE_EXTENSION;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One file queued for conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTask {
    /// The candidate file that gets renamed and fed to the converter
    pub path: PathBuf,
    /// Where the converted file must end up
    pub output_dir: PathBuf,
    /// Size captured when the task was discovered
    pub original_size: u64,
}

impl FileTask {
    pub fn new(path: PathBuf, output_dir: PathBuf, original_size: u64) -> Self {
        Self {
            path,
            output_dir,
            original_size,
        }
    }

    /// Task whose output replaces the candidate in its own directory.
    pub fn in_place(path: PathBuf, original_size: u64) -> Self {
        let output_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::new(path, output_dir, original_size)
    }

    /// The candidate renamed to the extension the converter accepts.
    pub fn intermediate_path(&self) -> PathBuf {
        self.path.with_extension(INTERMEDIATE_EXTENSION)
    }

    /// Where the converter writes its result.
    pub fn tool_output_path(&self) -> Option<PathBuf> {
        self.intermediate_path()
            .file_name()
            .map(|name| self.output_dir.join(name))
    }

    /// Where the converted file lives once the swap is complete.
    pub fn final_output_path(&self) -> Option<PathBuf> {
        self.path.file_name().map(|name| self.output_dir.join(name))
    }

    pub fn is_in_place(&self) -> bool {
        self.path.parent() == Some(self.output_dir.as_path())
    }
}

/// Terminal result of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Converted {
        path: PathBuf,
        output: PathBuf,
        original_size: u64,
        new_size: u64,
    },
    Failed {
        path: PathBuf,
        error: String,
    },
}

impl ConversionOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ConversionOutcome::Converted { path, .. } | ConversionOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Converted { .. })
    }

    /// `(original, new)` byte counts of a successful conversion.
    pub fn sizes(&self) -> Option<(u64, u64)> {
        match self {
            ConversionOutcome::Converted {
                original_size,
                new_size,
                ..
            } => Some((*original_size, *new_size)),
            ConversionOutcome::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_place_paths() {
        let task = FileTask::in_place(PathBuf::from("/build/tex/rock.ddx"), 10);

        assert!(task.is_in_place());
        assert_eq!(task.output_dir, PathBuf::from("/build/tex"));
        assert_eq!(task.intermediate_path(), PathBuf::from("/build/tex/rock.dds"));
        assert_eq!(task.tool_output_path(), Some(PathBuf::from("/build/tex/rock.dds")));
        assert_eq!(task.final_output_path(), Some(PathBuf::from("/build/tex/rock.ddx")));
    }

    #[test]
    fn test_separate_output_paths() {
        let task = FileTask::new(
            PathBuf::from("/mods/Rock.Large.DDX"),
            PathBuf::from("/work/DDXTC_BuildPath"),
            10,
        );

        assert!(!task.is_in_place());
        assert_eq!(task.intermediate_path(), PathBuf::from("/mods/Rock.Large.dds"));
        assert_eq!(
            task.tool_output_path(),
            Some(PathBuf::from("/work/DDXTC_BuildPath/Rock.Large.dds"))
        );
        assert_eq!(
            task.final_output_path(),
            Some(PathBuf::from("/work/DDXTC_BuildPath/Rock.Large.DDX"))
        );
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = ConversionOutcome::Failed {
            path: PathBuf::from("a.ddx"),
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert!(!outcome.is_success());
        assert_eq!(outcome.sizes(), None);
    }
}
