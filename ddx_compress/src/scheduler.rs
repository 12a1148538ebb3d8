//! Bounded-parallel execution of conversion tasks.
//!
//! Each task blocks its worker on an external process, so the bound is the
//! size of a dedicated rayon pool rather than rayon's global pool.
//!
//! Candidates whose names differ only in extension case (`a.ddx`, `a.DDX`)
//! share one intermediate `.dds`. They form a group that runs sequentially
//! on one worker, so the result does not depend on the pool size.

use crate::conversion_types::{ConversionOutcome, FileTask};
use crate::swap::convert_task;
use crate::texconv::TextureConverter;
use anyhow::{Context, Result};
use rayon::prelude::*;
use shared_utils::create_progress_bar;
use std::collections::HashMap;
use std::path::PathBuf;

/// Run `convert` on every task with at most `parallelism` running at once.
///
/// Returns after every task has an outcome, in task order. A `parallelism`
/// of zero is treated as one.
pub fn run_tasks<F>(tasks: &[FileTask], parallelism: usize, convert: F) -> Result<Vec<ConversionOutcome>>
where
    F: Fn(&FileTask) -> ConversionOutcome + Sync,
{
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let workers = parallelism.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("ddx-worker-{}", i))
        .build()
        .context("Failed to create conversion thread pool")?;

    tracing::info!(tasks = tasks.len(), workers, "Starting conversions");

    let pb = create_progress_bar(tasks.len() as u64, "Converting");

    let groups = intermediate_groups(tasks);
    if groups.len() < tasks.len() {
        tracing::warn!(
            tasks = tasks.len(),
            groups = groups.len(),
            "Some candidates share an intermediate name and will run one after another"
        );
    }

    let mut indexed: Vec<(usize, ConversionOutcome)> = pool.install(|| {
        groups
            .par_iter()
            .flat_map_iter(|group| {
                group
                    .iter()
                    .map(|&i| {
                        let task = &tasks[i];
                        let outcome = convert(task);
                        pb.inc(1);
                        pb.set_message(
                            task.path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .to_string(),
                        );
                        (i, outcome)
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    });
    indexed.sort_by_key(|(i, _)| *i);

    pb.finish_with_message("Complete!");

    Ok(indexed.into_iter().map(|(_, outcome)| outcome).collect())
}

/// Task indices grouped by intermediate path, groups in first-seen order.
fn intermediate_groups(tasks: &[FileTask]) -> Vec<Vec<usize>> {
    let mut slots: HashMap<PathBuf, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, task) in tasks.iter().enumerate() {
        let slot = *slots.entry(task.intermediate_path()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }
    groups
}

/// [`run_tasks`] with the rename/swap protocol around `converter`.
pub fn convert_all<C>(tasks: &[FileTask], parallelism: usize, converter: &C) -> Result<Vec<ConversionOutcome>>
where
    C: TextureConverter + ?Sized,
{
    run_tasks(tasks, parallelism, |task| convert_task(task, converter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn tasks(count: usize) -> Vec<FileTask> {
        (0..count)
            .map(|i| FileTask::in_place(PathBuf::from(format!("/build/t{:02}.ddx", i)), i as u64))
            .collect()
    }

    fn echo(task: &FileTask) -> ConversionOutcome {
        if task.original_size % 3 == 0 {
            ConversionOutcome::Failed {
                path: task.path.clone(),
                error: "every third fails".to_string(),
            }
        } else {
            ConversionOutcome::Converted {
                path: task.path.clone(),
                output: task.path.clone(),
                original_size: task.original_size,
                new_size: task.original_size / 2,
            }
        }
    }

    /// Highest number of conversions seen running at the same time.
    fn peak_concurrency(parallelism: usize, count: usize) -> usize {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let outcomes = run_tasks(&tasks(count), parallelism, |task| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(15));
            active.fetch_sub(1, Ordering::SeqCst);
            echo(task)
        })
        .unwrap();

        assert_eq!(outcomes.len(), count);
        peak.load(Ordering::SeqCst)
    }

    #[test]
    fn test_concurrency_bounded() {
        assert!(peak_concurrency(3, 12) <= 3);
    }

    #[test]
    fn test_single_worker_is_sequential() {
        assert_eq!(peak_concurrency(1, 6), 1);
    }

    #[test]
    fn test_zero_parallelism_runs_sequentially() {
        assert_eq!(peak_concurrency(0, 3), 1);
    }

    #[test]
    fn test_outcomes_keep_task_order() {
        let tasks = tasks(20);
        let outcomes = run_tasks(&tasks, 4, echo).unwrap();

        let paths: Vec<_> = outcomes.iter().map(|o| o.path().to_path_buf()).collect();
        let expected: Vec<_> = tasks.iter().map(|t| t.path.clone()).collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn test_parallelism_does_not_change_outcomes() {
        let tasks = tasks(15);
        let sequential = run_tasks(&tasks, 1, echo).unwrap();
        let parallel = run_tasks(&tasks, 8, echo).unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.iter().filter(|o| o.is_success()).count(), 10);
    }

    #[test]
    fn test_case_variants_never_overlap() {
        let tasks: Vec<FileTask> = ["a.ddx", "a.DDX", "b.ddx", "a.Ddx", "c.ddx"]
            .iter()
            .map(|name| FileTask::in_place(PathBuf::from("/build").join(name), 1))
            .collect();
        let active_a = AtomicUsize::new(0);
        let peak_a = AtomicUsize::new(0);

        let outcomes = run_tasks(&tasks, 4, |task| {
            let shares_a = task.intermediate_path() == PathBuf::from("/build/a.dds");
            if shares_a {
                let now = active_a.fetch_add(1, Ordering::SeqCst) + 1;
                peak_a.fetch_max(now, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(20));
            if shares_a {
                active_a.fetch_sub(1, Ordering::SeqCst);
            }
            echo(task)
        })
        .unwrap();

        assert_eq!(peak_a.load(Ordering::SeqCst), 1);
        let paths: Vec<_> = outcomes.iter().map(|o| o.path().to_path_buf()).collect();
        let expected: Vec<_> = tasks.iter().map(|t| t.path.clone()).collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn test_intermediate_groups() {
        let tasks: Vec<FileTask> = ["x.ddx", "y.ddx", "X.ddx", "x.DDX"]
            .iter()
            .map(|name| FileTask::in_place(PathBuf::from("/b").join(name), 0))
            .collect();
        assert_eq!(intermediate_groups(&tasks), vec![vec![0, 3], vec![1], vec![2]]);
    }

    #[test]
    fn test_no_tasks() {
        let outcomes = run_tasks(&[], 4, echo).unwrap();
        assert!(outcomes.is_empty());
    }
}
