//! Shared Utilities for the DDX texture compressor
//!
//! - Tree mirroring into a build directory (pass-through copy + staging)
//! - Batch result accounting and summary reporting
//! - Human-readable size formatting
//! - tracing-based logging and external tool execution
//! - Parallelism defaults and safety checks

pub mod batch;
pub mod file_copier;
pub mod logging;
pub mod progress;
pub mod report;
pub mod safety;
pub mod thread_manager;
pub mod types;

pub use batch::BatchResult;
pub use file_copier::{mirror_tree, DeferredFile, FileRoute, MirrorResult};
pub use logging::{execute_external_command, ExternalCommandResult, LogConfig};
pub use progress::{create_progress_bar, format_duration};
pub use report::{print_simple_summary, print_summary_report, SizeTotals};
pub use safety::check_dangerous_directory;
pub use thread_manager::{default_parallelism, resolve_parallelism};
pub use types::{format_size_signed, FileSize};
