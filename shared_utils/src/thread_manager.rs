//! Thread Manager
//!
//! Decides how many conversions may run at once. Each conversion is an
//! external process that keeps its own threads busy, so the default leaves
//! headroom for the OS instead of matching the core count.

use std::sync::OnceLock;

/// Environment override for the default parallelism.
pub const PARALLELISM_ENV: &str = "DDX_PARALLELISM";

/// Cached default for this system
static DEFAULT_PARALLELISM: OnceLock<usize> = OnceLock::new();

/// Configuration for the default worker count
#[derive(Debug, Clone)]
pub struct ThreadConfig {
    /// Percentage of cores to use (0-100)
    pub core_percentage: usize,
    pub min_threads: usize,
    pub max_threads: usize,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            core_percentage: 70,
            min_threads: 1,
            max_threads: 16,
        }
    }
}

/// Worker count for `cpu_count` cores under `config`.
pub fn calculate_optimal_threads(cpu_count: usize, config: &ThreadConfig) -> usize {
    let calculated = (cpu_count * config.core_percentage / 100).max(1);
    calculated.clamp(config.min_threads.max(1), config.max_threads.max(1))
}

/// Default parallelism bound (cached).
///
/// `DDX_PARALLELISM` wins when it holds a positive integer; otherwise 70% of
/// the logical cores, clamped to `1..=16`.
pub fn default_parallelism() -> usize {
    *DEFAULT_PARALLELISM.get_or_init(|| {
        if let Some(value) = std::env::var(PARALLELISM_ENV)
            .ok()
            .and_then(|v| parse_positive(&v))
        {
            return value;
        }
        calculate_optimal_threads(num_cpus::get(), &ThreadConfig::default())
    })
}

/// Resolve a user-supplied parallelism argument.
///
/// Absent, non-numeric, or zero values fall back to [`default_parallelism`].
pub fn resolve_parallelism(arg: Option<&str>) -> usize {
    match arg.and_then(parse_positive) {
        Some(value) => value,
        None => {
            if let Some(raw) = arg {
                tracing::warn!(
                    value = raw,
                    fallback = default_parallelism(),
                    "Ignoring unusable parallelism value"
                );
            }
            default_parallelism()
        }
    }
}

fn parse_positive(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|v| *v >= 1)
}
