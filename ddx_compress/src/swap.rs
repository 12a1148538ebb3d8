//! Rename/swap protocol around the converter.
//!
//! texconv only reads `.dds`, so each candidate is renamed to the
//! intermediate extension, converted, and the result is renamed back to the
//! candidate name:
//!
//! 1. capture the original size
//! 2. `<stem>.ddx` → `<stem>.dds`, never replacing an existing `<stem>.dds`
//! 3. run the converter, which writes `<output_dir>/<stem>.dds`
//! 4. `<stem>.dds` → `<stem>.ddx`
//! 5. remove a stale `<output_dir>/<stem>.ddx`
//! 6. `<output_dir>/<stem>.dds` → `<output_dir>/<stem>.ddx`
//! 7. read the new size
//!
//! When the output directory is the candidate's own directory the converter
//! overwrites the intermediate, and steps 4-6 become a single rename.
//!
//! If step 3 fails the intermediate is renamed back to the candidate name.
//! A crash between steps 2 and 4 leaves a `.dds` behind; nothing journals it.

use crate::conversion_types::{ConversionOutcome, FileTask};
use crate::errors::{ConvertError, Result};
use crate::texconv::TextureConverter;
use shared_utils::logging::error_chain;
use shared_utils::types::file_size::{format_size_signed, size_delta, FileSize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, info_span, warn};

/// Run one task through the swap protocol. Never panics, never returns an
/// error: every failure becomes [`ConversionOutcome::Failed`].
pub fn convert_task<C>(task: &FileTask, converter: &C) -> ConversionOutcome
where
    C: TextureConverter + ?Sized,
{
    let span = info_span!("convert", path = %task.path.display());
    let _enter = span.enter();

    match swap(task, converter) {
        Ok((output, original_size, new_size)) => {
            info!(
                original = original_size,
                new = new_size,
                change = %format_size_signed(size_delta(original_size, new_size)),
                "File optimization status: {} {} > {}",
                task.path.display(),
                FileSize::new(original_size),
                FileSize::new(new_size)
            );
            ConversionOutcome::Converted {
                path: task.path.clone(),
                output,
                original_size,
                new_size,
            }
        }
        Err(e) => {
            let message = error_chain(&e);
            error!(
                component = "rename_swap",
                path = %task.path.display(),
                error = %message,
                "Conversion failed"
            );
            ConversionOutcome::Failed {
                path: task.path.clone(),
                error: message,
            }
        }
    }
}

/// Returns `(final_output, original_size, new_size)`.
fn swap<C>(task: &FileTask, converter: &C) -> Result<(PathBuf, u64, u64)>
where
    C: TextureConverter + ?Sized,
{
    let original_size = probe_size(&task.path)?;

    let intermediate = task.intermediate_path();
    let tool_output = task
        .tool_output_path()
        .ok_or_else(|| ConvertError::InvalidPath(task.path.clone()))?;
    let final_output = task
        .final_output_path()
        .ok_or_else(|| ConvertError::InvalidPath(task.path.clone()))?;

    rename_no_replace(&task.path, &intermediate)?;

    if tool_output != intermediate {
        if let Err(e) = remove_stale(&tool_output) {
            roll_back(&intermediate, &task.path);
            return Err(e);
        }
    }

    if let Err(e) = run_converter(converter, &intermediate, &task.output_dir, &tool_output) {
        roll_back(&intermediate, &task.path);
        return Err(e);
    }

    if tool_output == intermediate {
        rename(&intermediate, &final_output)?;
    } else {
        rename(&intermediate, &task.path)?;
        remove_stale(&final_output)?;
        rename(&tool_output, &final_output)?;
    }

    let new_size = probe_size(&final_output)?;
    Ok((final_output, original_size, new_size))
}

fn run_converter<C>(converter: &C, input: &Path, output_dir: &Path, expected: &Path) -> Result<()>
where
    C: TextureConverter + ?Sized,
{
    debug!(converter = %converter.name(), input = %input.display(), "Invoking converter");
    converter.convert(input, output_dir)?;

    if !expected.is_file() {
        return Err(ConvertError::ToolOutputMissing(expected.to_path_buf()));
    }
    Ok(())
}

fn roll_back(intermediate: &Path, candidate: &Path) {
    match fs::rename(intermediate, candidate) {
        Ok(()) => info!(
            path = %candidate.display(),
            "Restored candidate after failed conversion"
        ),
        Err(e) => warn!(
            intermediate = %intermediate.display(),
            path = %candidate.display(),
            error = %e,
            "Could not restore candidate, file left under intermediate name"
        ),
    }
}

fn probe_size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| ConvertError::SizeProbe {
            path: path.to_path_buf(),
            source,
        })
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|source| ConvertError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Rename that refuses to replace an existing `to`.
///
/// Hard-links first so that two candidates racing for the same intermediate
/// cannot overwrite each other. Filesystems without hard links fall back to
/// a checked rename.
fn rename_no_replace(from: &Path, to: &Path) -> Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(ConvertError::IntermediateCollision(to.to_path_buf()));
        }
        Err(e) => {
            debug!(from = %from.display(), error = %e, "Hard link unavailable, using rename");
            if fs::symlink_metadata(to).is_ok() {
                return Err(ConvertError::IntermediateCollision(to.to_path_buf()));
            }
            return rename(from, to);
        }
    }

    if let Err(source) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(ConvertError::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ConvertError::StaleOutput {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes `<output_dir>/<name>` with fixed bytes and remembers its input.
    struct FakeTexconv {
        output: &'static [u8],
        seen: Mutex<Vec<PathBuf>>,
    }

    impl FakeTexconv {
        fn new(output: &'static [u8]) -> Self {
            Self {
                output,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextureConverter for FakeTexconv {
        fn name(&self) -> String {
            "fake".to_string()
        }

        fn convert(&self, input: &Path, output_dir: &Path) -> Result<()> {
            self.seen.lock().unwrap().push(input.to_path_buf());
            let name = input.file_name().unwrap();
            fs::write(output_dir.join(name), self.output).unwrap();
            Ok(())
        }
    }

    struct FailingTexconv;

    impl TextureConverter for FailingTexconv {
        fn name(&self) -> String {
            "failing".to_string()
        }

        fn convert(&self, _input: &Path, _output_dir: &Path) -> Result<()> {
            Err(ConvertError::ToolFailed {
                command: "texconv x.dds".to_string(),
                exit_code: Some(1),
                stderr: "unsupported format".to_string(),
            })
        }
    }

    /// Reports success without writing anything.
    struct SilentTexconv;

    impl TextureConverter for SilentTexconv {
        fn name(&self) -> String {
            "silent".to_string()
        }

        fn convert(&self, _input: &Path, _output_dir: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn candidate(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_in_place_conversion() {
        let temp = TempDir::new().unwrap();
        let path = candidate(temp.path(), "rock.ddx", &[7u8; 2048]);
        let converter = FakeTexconv::new(b"compressed");

        let outcome = convert_task(&FileTask::in_place(path.clone(), 2048), &converter);

        assert_eq!(
            outcome,
            ConversionOutcome::Converted {
                path: path.clone(),
                output: path.clone(),
                original_size: 2048,
                new_size: 10,
            }
        );
        assert_eq!(fs::read(&path).unwrap(), b"compressed");
        assert!(!temp.path().join("rock.dds").exists());
        assert_eq!(*converter.seen.lock().unwrap(), vec![temp.path().join("rock.dds")]);
    }

    #[test]
    fn test_separate_output_directory() {
        let temp = TempDir::new().unwrap();
        let build = temp.path().join("build");
        fs::create_dir(&build).unwrap();
        let path = candidate(temp.path(), "Wall.DDX", b"original texture");
        fs::write(build.join("Wall.DDX"), b"stale").unwrap();

        let task = FileTask::new(path.clone(), build.clone(), 16);
        let outcome = convert_task(&task, &FakeTexconv::new(b"dxt1"));

        assert!(outcome.is_success(), "{:?}", outcome);
        assert_eq!(outcome.sizes(), Some((16, 4)));
        // user's file is back under its own name, untouched
        assert_eq!(fs::read(&path).unwrap(), b"original texture");
        assert!(!temp.path().join("Wall.dds").exists());
        assert_eq!(fs::read(build.join("Wall.DDX")).unwrap(), b"dxt1");
        assert!(!build.join("Wall.dds").exists());
    }

    #[test]
    fn test_tool_failure_restores_candidate() {
        let temp = TempDir::new().unwrap();
        let path = candidate(temp.path(), "bad.ddx", b"not a texture");

        let outcome = convert_task(&FileTask::in_place(path.clone(), 13), &FailingTexconv);

        match outcome {
            ConversionOutcome::Failed { ref error, .. } => {
                assert!(error.contains("unsupported format"), "{}", error)
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(fs::read(&path).unwrap(), b"not a texture");
        assert!(!temp.path().join("bad.dds").exists());
    }

    #[test]
    fn test_intermediate_collision_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let path = candidate(temp.path(), "tile.ddx", b"candidate");
        fs::write(temp.path().join("tile.dds"), b"someone else's file").unwrap();
        let converter = FakeTexconv::new(b"x");

        let outcome = convert_task(&FileTask::in_place(path.clone(), 9), &converter);

        match outcome {
            ConversionOutcome::Failed { ref error, .. } => {
                assert!(error.contains("already exists"), "{}", error)
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(converter.seen.lock().unwrap().is_empty());
        assert_eq!(fs::read(&path).unwrap(), b"candidate");
        assert_eq!(fs::read(temp.path().join("tile.dds")).unwrap(), b"someone else's file");
    }

    #[test]
    fn test_missing_output_is_failure() {
        let temp = TempDir::new().unwrap();
        let build = temp.path().join("build");
        fs::create_dir(&build).unwrap();
        let path = candidate(temp.path(), "ghost.ddx", b"data");

        let outcome = convert_task(&FileTask::new(path.clone(), build.clone(), 4), &SilentTexconv);

        match outcome {
            ConversionOutcome::Failed { ref error, .. } => {
                assert!(error.contains("no output"), "{}", error)
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(fs::read(&path).unwrap(), b"data");
        assert!(!temp.path().join("ghost.dds").exists());
    }

    #[test]
    fn test_stale_tool_output_does_not_count_as_success() {
        let temp = TempDir::new().unwrap();
        let build = temp.path().join("build");
        fs::create_dir(&build).unwrap();
        let path = candidate(temp.path(), "ghost.ddx", b"data");
        fs::write(build.join("ghost.dds"), b"left by a crashed run").unwrap();

        let outcome = convert_task(&FileTask::new(path.clone(), build.clone(), 4), &SilentTexconv);

        assert!(!outcome.is_success(), "{:?}", outcome);
        assert!(!build.join("ghost.dds").exists());
        assert!(!build.join("ghost.ddx").exists());
        assert_eq!(fs::read(&path).unwrap(), b"data");
    }

    #[test]
    fn test_no_replace_rename_keeps_existing_target() {
        let temp = TempDir::new().unwrap();
        let from = candidate(temp.path(), "a.DDX", b"upper");
        let to = candidate(temp.path(), "a.dds", b"lower in flight");

        let err = rename_no_replace(&from, &to).unwrap_err();

        assert!(matches!(err, ConvertError::IntermediateCollision(_)), "{:?}", err);
        assert_eq!(fs::read(&from).unwrap(), b"upper");
        assert_eq!(fs::read(&to).unwrap(), b"lower in flight");
    }

    #[test]
    fn test_no_replace_rename_moves_file() {
        let temp = TempDir::new().unwrap();
        let from = candidate(temp.path(), "tile.ddx", b"tile");
        let to = temp.path().join("tile.dds");

        rename_no_replace(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"tile");
    }

    #[test]
    fn test_missing_candidate_is_size_probe_failure() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.ddx");

        let outcome = convert_task(&FileTask::in_place(path, 0), &FakeTexconv::new(b"x"));

        match outcome {
            ConversionOutcome::Failed { ref error, .. } => {
                assert!(error.starts_with("Failed to read size"), "{}", error)
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
