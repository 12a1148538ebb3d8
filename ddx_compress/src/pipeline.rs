//! Run orchestration: mirror, discover, convert, summarize.
//!
//! Directory mode never touches the input tree. Everything happens in the
//! sibling `<input>_Build` tree, and candidates there are converted in place.
//! Single-file mode converts one file into `<cwd>/DDXTC_BuildPath`; the
//! user's file is renamed while the converter runs and renamed back after.

use crate::conversion_types::{ConversionOutcome, FileTask};
use crate::gate::{GateConfig, INTERMEDIATE_EXTENSION};
use crate::scheduler::convert_all;
use crate::texconv::TextureConverter;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Serialize, Serializer};
use shared_utils::{check_dangerous_directory, mirror_tree, BatchResult, DeferredFile, SizeTotals};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Appended to the input directory name to form the staging root.
pub const BUILD_SUFFIX: &str = "_Build";

/// Build folder for single-file runs, created in the working directory.
pub const SINGLE_FILE_BUILD_DIR: &str = "DDXTC_BuildPath";

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum number of concurrent conversions
    pub parallelism: usize,
    pub gate: GateConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallelism: shared_utils::default_parallelism(),
            gate: GateConfig::default(),
        }
    }
}

/// A path the mirror could not reproduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorError {
    pub path: PathBuf,
    pub error: String,
}

/// Everything a run did, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub build_root: PathBuf,
    /// Directories created or reused in the build tree
    pub directories: usize,
    /// Files copied through unchanged
    pub copied: usize,
    /// Leftover intermediates from an interrupted run that were deleted
    pub stale_removed: usize,
    pub mirror_errors: Vec<MirrorError>,
    pub outcomes: Vec<ConversionOutcome>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Conversions that failed; mirror errors are counted separately.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Per-file accounting, mirror errors included as failures.
    pub fn batch_result(&self) -> BatchResult {
        let mut result = BatchResult::new();
        for outcome in &self.outcomes {
            match outcome {
                ConversionOutcome::Converted { .. } => result.success(),
                ConversionOutcome::Failed { path, error } => result.fail(path.clone(), error.clone()),
            }
        }
        for e in &self.mirror_errors {
            result.fail(e.path.clone(), e.error.clone());
        }
        result
    }

    pub fn size_totals(&self) -> SizeTotals {
        let mut totals = SizeTotals::default();
        for (original, new) in self.outcomes.iter().filter_map(ConversionOutcome::sizes) {
            totals.add(original, new);
        }
        totals
    }

    /// `0` when everything succeeded, `2` when any file failed.
    pub fn exit_code(&self) -> i32 {
        if self.failed() == 0 && self.mirror_errors.is_empty() {
            0
        } else {
            2
        }
    }
}

/// `<parent>/<name>_Build` for an input directory `<parent>/<name>`.
pub fn staging_root_for(input: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .ok_or_else(|| anyhow!("Input has no directory name: {}", input.display()))?;

    let mut build_name = name.to_os_string();
    build_name.push(BUILD_SUFFIX);
    Ok(input.with_file_name(build_name))
}

/// `<cwd>/DDXTC_BuildPath`
pub fn single_file_build_dir() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    Ok(cwd.join(SINGLE_FILE_BUILD_DIR))
}

/// Delete a staged `<stem>.dds` left by an interrupted conversion of
/// `<stem>.ddx`. A `.dds` that also exists in the source is a real file and
/// is kept. Returns whether a file was removed.
pub fn sweep_stale_intermediate(deferred: &DeferredFile) -> bool {
    let leftover = deferred.staged.with_extension(INTERMEDIATE_EXTENSION);
    if deferred.source.with_extension(INTERMEDIATE_EXTENSION).exists() || !leftover.is_file() {
        return false;
    }

    match fs::remove_file(&leftover) {
        Ok(()) => {
            warn!(path = %leftover.display(), "Removed intermediate left by an interrupted run");
            true
        }
        Err(e) => {
            warn!(path = %leftover.display(), error = %e, "Failed to remove stale intermediate");
            false
        }
    }
}

/// Mirror `input` into `<input>_Build` and convert every staged candidate.
///
/// Only setup problems are `Err`; per-file problems land in the summary.
pub fn run_directory<C>(input: &Path, config: &RunConfig, converter: &C) -> Result<RunSummary>
where
    C: TextureConverter + ?Sized,
{
    let start = Instant::now();

    if !input.is_dir() {
        bail!("Input is not a directory: {}", input.display());
    }
    let source = input
        .canonicalize()
        .with_context(|| format!("Failed to resolve input: {}", input.display()))?;
    check_dangerous_directory(&source).map_err(|e| anyhow!(e))?;

    let build_root = staging_root_for(&source)?;
    info!(
        source = %source.display(),
        build_root = %build_root.display(),
        "Mirroring source tree"
    );

    let gate = &config.gate;
    let mirror = mirror_tree(&source, &build_root, |path, dir| gate.route(path, dir))?;

    let mut stale_removed = 0;
    let mut tasks = Vec::with_capacity(mirror.deferred.len());
    for deferred in &mirror.deferred {
        if sweep_stale_intermediate(deferred) {
            stale_removed += 1;
        }
        tasks.push(FileTask::in_place(deferred.staged.clone(), deferred.size));
    }

    info!(
        directories = mirror.directories,
        copied = mirror.copied,
        candidates = tasks.len(),
        mirror_errors = mirror.failed,
        "Build tree ready"
    );

    let outcomes = convert_all(&tasks, config.parallelism, converter)?;

    Ok(RunSummary {
        input: source,
        build_root,
        directories: mirror.directories,
        copied: mirror.copied,
        stale_removed,
        mirror_errors: mirror
            .errors
            .into_iter()
            .map(|(path, error)| MirrorError { path, error })
            .collect(),
        outcomes,
        elapsed: start.elapsed(),
    })
}

/// Convert one candidate file into `build_dir`, leaving the input as it was.
pub fn run_single_file<C>(input: &Path, build_dir: &Path, config: &RunConfig, converter: &C) -> Result<RunSummary>
where
    C: TextureConverter + ?Sized,
{
    let start = Instant::now();

    if !input.is_file() {
        bail!("Input is not a file: {}", input.display());
    }
    if !config.gate.is_candidate(input, None) {
        bail!(
            "Not a .{} file: {}",
            config.gate.candidate_extension,
            input.display()
        );
    }

    fs::create_dir_all(build_dir)
        .with_context(|| format!("Failed to create build directory: {}", build_dir.display()))?;

    // canonical forms so an input already inside build_dir is seen as in place
    let input = input
        .canonicalize()
        .with_context(|| format!("Failed to resolve input: {}", input.display()))?;
    let build_dir = build_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve build directory: {}", build_dir.display()))?;

    let size = fs::metadata(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?
        .len();
    let task = FileTask::new(input.clone(), build_dir.clone(), size);

    info!(
        input = %input.display(),
        build_dir = %build_dir.display(),
        "Converting single file"
    );
    let outcomes = convert_all(std::slice::from_ref(&task), 1, converter)?;

    Ok(RunSummary {
        input,
        build_root: build_dir,
        directories: 0,
        copied: 0,
        stale_removed: 0,
        mirror_errors: Vec::new(),
        outcomes,
        elapsed: start.elapsed(),
    })
}
