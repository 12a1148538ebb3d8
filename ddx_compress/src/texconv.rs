//! texconv invocation.
//!
//! The converter is an opaque external program. It only understands `.dds`
//! files and writes `<output-dir>/<stem>.dds`; everything around that is the
//! job of [`crate::swap`].

use crate::errors::{ConvertError, Result};
use shared_utils::logging::{error_chain, execute_external_command, render_command_line};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[cfg(windows)]
pub const TEXCONV_PROGRAM: &str = "texconv.exe";
#[cfg(not(windows))]
pub const TEXCONV_PROGRAM: &str = "texconv";

/// Block-compression format passed to `-f` unless overridden.
pub const DEFAULT_FOURCC: &str = "DXT1";

/// Anything that can turn `<input>.dds` into `<output_dir>/<stem>.dds`.
pub trait TextureConverter: Sync {
    /// Human-readable name used in logs
    fn name(&self) -> String;

    /// Convert `input`, blocking until the conversion has finished.
    fn convert(&self, input: &Path, output_dir: &Path) -> Result<()>;
}

/// DDS header flavour forced with `-dx9` / `-dx10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DdsHeader {
    Dx9,
    Dx10,
}

impl DdsHeader {
    fn flag(self) -> &'static str {
        match self {
            DdsHeader::Dx9 => "-dx9",
            DdsHeader::Dx10 => "-dx10",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexconvOptions {
    /// Resize to the nearest power of two (`-pow2`)
    pub pow2: bool,
    /// Mip level count (`-m`), texconv's default when `None`
    pub mip_levels: Option<u32>,
    /// Output format (`-f`)
    pub fourcc: Option<String>,
    pub header: Option<DdsHeader>,
    /// Suppress the copyright banner (`-nologo`)
    pub nologo: bool,
}

impl Default for TexconvOptions {
    fn default() -> Self {
        Self {
            pow2: true,
            mip_levels: None,
            fourcc: Some(DEFAULT_FOURCC.to_string()),
            header: None,
            nologo: true,
        }
    }
}

impl TexconvOptions {
    /// `<input> [-pow2] [-m N] -ft dds -y -o <dir> [-nologo] [-f FOURCC] [-dx9|-dx10]`
    pub fn build_args(&self, input: &Path, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![input.into()];

        if self.pow2 {
            args.push("-pow2".into());
        }
        if let Some(levels) = self.mip_levels {
            args.push("-m".into());
            args.push(levels.to_string().into());
        }

        args.push("-ft".into());
        args.push("dds".into());
        args.push("-y".into());
        args.push("-o".into());
        args.push(output_dir.into());

        if self.nologo {
            args.push("-nologo".into());
        }
        if let Some(ref fourcc) = self.fourcc {
            args.push("-f".into());
            args.push(fourcc.into());
        }
        if let Some(header) = self.header {
            args.push(header.flag().into());
        }

        args
    }
}

/// texconv, optionally run through a launcher such as `wine`.
#[derive(Debug, Clone)]
pub struct TexconvTool {
    program: PathBuf,
    launcher: Option<PathBuf>,
    options: TexconvOptions,
}

impl TexconvTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            launcher: None,
            options: TexconvOptions::default(),
        }
    }

    /// Use an explicit program if given, otherwise search for texconv.
    ///
    /// Falls back to the bare program name when nothing is found, so a
    /// missing converter surfaces as a per-file launch failure.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        if let Some(program) = explicit {
            return Self::new(program);
        }
        match locate_texconv() {
            Some(program) => {
                tracing::debug!(program = %program.display(), "Found texconv");
                Self::new(program)
            }
            None => {
                tracing::warn!(
                    program = TEXCONV_PROGRAM,
                    "texconv not found on PATH or next to the executable"
                );
                Self::new(TEXCONV_PROGRAM)
            }
        }
    }

    pub fn with_launcher(mut self, launcher: Option<PathBuf>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_options(mut self, options: TexconvOptions) -> Self {
        self.options = options;
        self
    }

    /// Program to spawn and its full argument list.
    pub fn command_line(&self, input: &Path, output_dir: &Path) -> (OsString, Vec<OsString>) {
        let tool_args = self.options.build_args(input, output_dir);
        match self.launcher {
            Some(ref launcher) => {
                let mut args = Vec::with_capacity(tool_args.len() + 1);
                args.push(self.program.clone().into_os_string());
                args.extend(tool_args);
                (launcher.clone().into_os_string(), args)
            }
            None => (self.program.clone().into_os_string(), tool_args),
        }
    }
}

impl TextureConverter for TexconvTool {
    fn name(&self) -> String {
        let (program, args) = self.command_line(Path::new("<input>"), Path::new("<dir>"));
        render_command_line(&program, &args)
    }

    fn convert(&self, input: &Path, output_dir: &Path) -> Result<()> {
        let (program, args) = self.command_line(input, output_dir);

        let result = execute_external_command(&program, &args).map_err(|e| ConvertError::ToolLaunch {
            tool: program.to_string_lossy().into_owned(),
            reason: error_chain(&*e),
        })?;

        if !result.success() {
            let stderr = if result.stderr.trim().is_empty() {
                // texconv reports most errors on stdout
                result.stdout
            } else {
                result.stderr
            };
            return Err(ConvertError::ToolFailed {
                command: result.command,
                exit_code: result.exit_code,
                stderr,
            });
        }

        Ok(())
    }
}

/// texconv on `PATH`, then next to the running executable.
pub fn locate_texconv() -> Option<PathBuf> {
    if let Ok(path) = which::which(TEXCONV_PROGRAM) {
        return Some(path);
    }

    let beside_exe = std::env::current_exe()
        .ok()?
        .parent()?
        .join(TEXCONV_PROGRAM);
    beside_exe.is_file().then_some(beside_exe)
}
