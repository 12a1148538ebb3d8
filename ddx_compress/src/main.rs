use clap::{Parser, ValueEnum};
use ddx_compress::{
    run_directory, run_single_file, single_file_build_dir, DdsHeader, RunConfig, RunSummary,
    TexconvOptions, TexconvTool,
};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{print_simple_summary, print_summary_report, resolve_parallelism};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "ddx-compress")]
#[command(version, about = "Batch-compress DDX textures with texconv", long_about = None)]
struct Cli {
    /// Texture directory to mirror into <INPUT>_Build, or a single .ddx file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Maximum concurrent conversions (default: based on CPU count)
    #[arg(value_name = "PARALLELISM")]
    parallelism: Option<String>,

    /// texconv executable (default: PATH, then next to this program)
    #[arg(long, value_name = "PATH", env = "DDX_TEXCONV")]
    tool: Option<PathBuf>,

    /// Run texconv through this program, e.g. wine
    #[arg(long, value_name = "PROGRAM", env = "DDX_TEXCONV_LAUNCHER")]
    launcher: Option<PathBuf>,

    /// Output block-compression format
    #[arg(long, value_name = "CODE", default_value = ddx_compress::texconv::DEFAULT_FOURCC)]
    fourcc: String,

    /// Keep original dimensions instead of resizing to a power of two
    #[arg(long)]
    no_pow2: bool,

    /// Number of mip levels to generate
    #[arg(long, value_name = "N")]
    mips: Option<u32>,

    #[arg(long, value_enum)]
    dds_header: Option<DdsHeader>,

    #[arg(short, long, value_enum, default_value = "human")]
    output: OutputFormat,

    #[arg(short, long)]
    verbose: bool,

    /// Directory for log files (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Wait for Enter before exiting
    #[arg(long)]
    pause: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default().with_level(if cli.verbose { Level::DEBUG } else { Level::INFO });
    if let Some(ref dir) = cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    let _ = init_logging("ddx_compress", log_config);

    let code = match run(&cli) {
        Ok(summary) => {
            present(&summary, cli.output);
            summary.exit_code()
        }
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            1
        }
    };

    if cli.pause {
        wait_for_enter();
    }
    std::process::exit(code);
}

fn run(cli: &Cli) -> anyhow::Result<RunSummary> {
    let config = RunConfig {
        parallelism: resolve_parallelism(cli.parallelism.as_deref()),
        ..RunConfig::default()
    };

    let options = TexconvOptions {
        pow2: !cli.no_pow2,
        mip_levels: cli.mips,
        fourcc: Some(cli.fourcc.clone()),
        header: cli.dds_header,
        nologo: true,
    };
    let tool = TexconvTool::discover(cli.tool.clone())
        .with_launcher(cli.launcher.clone())
        .with_options(options);

    if cli.output == OutputFormat::Human {
        println!("Please do not touch the input folder while it is being processed.\n");
    }

    if cli.input.is_dir() {
        run_directory(&cli.input, &config, &tool)
    } else if cli.input.is_file() {
        run_single_file(&cli.input, &single_file_build_dir()?, &config, &tool)
    } else {
        anyhow::bail!("Input path does not exist: {}", cli.input.display())
    }
}

fn present(summary: &RunSummary, format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            let result = summary.batch_result();
            print_summary_report(&result, summary.elapsed, summary.size_totals(), "DDX Compression");
            println!("📂 Build output: {}", summary.build_root.display());
            print_simple_summary(&result);
        }
        OutputFormat::Json => match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("❌ Failed to serialize summary: {}", e),
        },
    }
}

fn wait_for_enter() {
    eprintln!("\nPress Enter to exit...");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}
