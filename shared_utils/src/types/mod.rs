//! Type-Safe Wrappers Module
//!
//! - `file_size`: byte counts and their human-readable formatting

pub mod file_size;

pub use file_size::{format_size_signed, size_delta, FileSize, SIZE_SUFFIXES};

// ============================================================================
// Property-Based Tests
// ============================================================================
