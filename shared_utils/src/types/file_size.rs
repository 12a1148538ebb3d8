//! FileSize Type-Safe Wrapper
//!
//! Byte counts for end-of-run accounting, and the human-scaled formatting
//! used by every size line the tools print.

use std::fmt;

/// Magnitude suffixes, 1024 apart.
pub const SIZE_SUFFIXES: &[&str] = &["bytes", "KB", "MB", "GB", "TB", "PB", "EB"];

const UNIT: f64 = 1024.0;

// ============================================================================
// Formatting
// ============================================================================

/// Format a signed byte count as `"<value> <suffix>"` with one decimal place.
///
/// The value is scaled down while `value / 1024` rounds (half to even) to at
/// least one, so anything that would print as `1024.0 bytes` is shown as
/// `1.0 KB` instead. Negative counts are the magnitude with a leading `-`.
///
/// # Examples
/// ```
/// use shared_utils::types::file_size::format_size_signed;
///
/// assert_eq!(format_size_signed(0), "0.0 bytes");
/// assert_eq!(format_size_signed(1536), "1.5 KB");
/// assert_eq!(format_size_signed(-2048), "-2.0 KB");
/// ```
pub fn format_size_signed(bytes: i64) -> String {
    if bytes < 0 {
        return format!("-{}", format_magnitude(bytes.unsigned_abs()));
    }
    format_magnitude(bytes as u64)
}

fn format_magnitude(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut index = 0;

    while index + 1 < SIZE_SUFFIXES.len() && (value / UNIT).round_ties_even() >= 1.0 {
        value /= UNIT;
        index += 1;
    }

    format!("{:.1} {}", value, SIZE_SUFFIXES[index])
}

/// Signed difference `new - original`, saturating at the i64 bounds.
pub fn size_delta(original: u64, new: u64) -> i64 {
    let delta = new as i128 - original as i128;
    delta.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

// ============================================================================
// FileSize Newtype
// ============================================================================

/// File size in bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FileSize(u64);

impl FileSize {
    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub fn display(&self) -> String {
        format_magnitude(self.0)
    }
}

impl fmt::Debug for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSize({} = {})", self.0, self.display())
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.display())
    }
}

// ============================================================================
// Tests
// ============================================================================
