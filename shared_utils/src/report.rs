//! Report Module
//!
//! End-of-run summary for batch operations.

use crate::batch::BatchResult;
use crate::progress::format_duration;
use crate::types::file_size::{format_size_signed, size_delta, FileSize};
use console::style;
use std::time::Duration;

/// Byte totals over the files that were actually converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeTotals {
    pub input_bytes: u64,
    pub output_bytes: u64,
}

impl SizeTotals {
    pub fn add(&mut self, input: u64, output: u64) {
        self.input_bytes += input;
        self.output_bytes += output;
    }

    /// `output - input`; negative when the run saved space.
    pub fn delta(&self) -> i64 {
        size_delta(self.input_bytes, self.output_bytes)
    }

    /// Percentage by which the output shrank, 0 when nothing was converted.
    pub fn reduction_percent(&self) -> f64 {
        if self.input_bytes == 0 {
            0.0
        } else {
            (1.0 - self.output_bytes as f64 / self.input_bytes as f64) * 100.0
        }
    }
}

/// Render the summary box as lines, without colour.
pub fn summary_lines(
    result: &BatchResult,
    duration: Duration,
    sizes: SizeTotals,
    operation_name: &str,
) -> Vec<String> {
    let rule = "═".repeat(60);
    let mut lines = vec![
        format!("╔{}╗", rule),
        format!("  📊 {} Summary", operation_name),
        format!("╠{}╣", rule),
        format!("  📁 Files Processed:  {:>12}", result.total),
        format!("  ✅ Succeeded:        {:>12}", result.succeeded),
        format!("  ❌ Failed:           {:>12}", result.failed),
        format!("  📈 Success Rate:     {:>11.1}%", result.success_rate()),
        format!("╠{}╣", rule),
        format!("  💾 Input Size:       {:>12}", FileSize::new(sizes.input_bytes)),
        format!("  💾 Output Size:      {:>12}", FileSize::new(sizes.output_bytes)),
        format!("  📉 Size Change:      {:>12}", format_size_signed(sizes.delta())),
        format!("  📉 Reduction:        {:>11.1}%", sizes.reduction_percent()),
        format!("╠{}╣", rule),
        format!("  ⏱️  Total Time:       {:>12}", format_duration(duration)),
        format!("╚{}╝", rule),
    ];

    if !result.errors.is_empty() {
        lines.push(String::new());
        lines.push("❌ Errors encountered:".to_string());
        for (path, error) in &result.errors {
            lines.push(format!("   {} → {}", path.display(), error));
        }
    }

    lines
}

pub fn print_summary_report(
    result: &BatchResult,
    duration: Duration,
    sizes: SizeTotals,
    operation_name: &str,
) {
    println!();
    for line in summary_lines(result, duration, sizes, operation_name) {
        if line.starts_with("  ❌ Failed") && result.failed > 0 {
            println!("{}", style(line).red().bold());
        } else if line.starts_with("   ") {
            println!("{}", style(line).red());
        } else {
            println!("{}", line);
        }
    }
}

pub fn print_simple_summary(result: &BatchResult) {
    let line = format!(
        "Finished: {} succeeded, {} failed (total: {})",
        result.succeeded, result.failed, result.total
    );
    if result.all_succeeded() {
        println!("\n{}", style(line).green().bold());
    } else {
        println!("\n{}", style(line).yellow().bold());
    }
}
