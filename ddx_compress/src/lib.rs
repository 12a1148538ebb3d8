pub mod conversion_types;
pub mod errors;
pub mod gate;
pub mod pipeline;
pub mod scheduler;
pub mod swap;
pub mod texconv;

pub use conversion_types::{ConversionOutcome, FileTask};
pub use errors::{ConvertError, Result};
pub use gate::{GateConfig, CANDIDATE_EXTENSION, INTERMEDIATE_EXTENSION};
pub use pipeline::{
    run_directory, run_single_file, single_file_build_dir, staging_root_for, MirrorError,
    RunConfig, RunSummary,
};
pub use scheduler::{convert_all, run_tasks};
pub use swap::convert_task;
pub use texconv::{DdsHeader, TexconvOptions, TexconvTool, TextureConverter};
