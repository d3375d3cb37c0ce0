//! Batch Resizer CLI
//!
//! Resizes every image under an input directory into an output directory
//! using a pool of concurrent workers.

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use batch_resizer::{
    init_logging, CancellationToken, Config, FilterType, ProgressUpdate, Resizer, RunStats,
};

/// Batch Resizer - concurrent batch image resizer
#[derive(Parser)]
#[command(
    name = "resizer",
    version,
    about = "Resize every image in a directory tree",
    long_about = "Scans the input directory recursively, resizes every image it can decode \
                  and writes the results to the output directory, mirroring the input tree. \
                  Files that cannot be decoded or written are skipped."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input directory [default: images]
    #[arg(short, long, value_name = "PATH", env = "RESIZER_INPUT")]
    input: Option<PathBuf>,

    /// Output directory [default: resized_images]
    #[arg(short, long, value_name = "PATH", env = "RESIZER_OUTPUT")]
    output: Option<PathBuf>,

    /// Target width in pixels, 0 keeps the aspect ratio [default: 1024]
    #[arg(short, long, value_name = "PIXELS")]
    width: Option<u32>,

    /// Target height in pixels, 0 keeps the aspect ratio [default: 0]
    #[arg(short = 'H', long, value_name = "PIXELS")]
    height: Option<u32>,

    /// Append the resized dimensions to file names (img_300x200.jpg)
    #[arg(long)]
    postfix: bool,

    /// Write into a <width>x<height> folder of the output directory
    #[arg(long)]
    resolution_folder: bool,

    /// Number of resize workers [default: logical CPUs]
    #[arg(short = 'j', long, value_name = "COUNT", allow_negative_numbers = true)]
    workers: Option<i64>,

    /// Output quality for lossy formats (1-100) [default: 90]
    #[arg(short, long, value_name = "QUALITY")]
    quality: Option<u8>,

    /// Resampling filter [default: lanczos3]
    #[arg(long, value_enum, value_name = "FILTER")]
    filter: Option<CliFilter>,

    /// Images buffered between the scanner and the workers [default: 1]
    #[arg(long, value_name = "COUNT")]
    channel_capacity: Option<usize>,

    /// Configuration file path (.toml or .yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print run statistics as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only, no progress)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path, .toml or .yaml
        #[arg(short, long, default_value = "resizer.toml")]
        output: PathBuf,
    },
    /// Validate configuration file
    CheckConfig {
        /// Configuration file to validate
        file: PathBuf,
    },
}

/// CLI-compatible resampling filter
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliFilter {
    Nearest,
    Triangle,
    Catmullrom,
    Gaussian,
    Lanczos3,
}

impl From<CliFilter> for FilterType {
    fn from(filter: CliFilter) -> Self {
        match filter {
            CliFilter::Nearest => FilterType::Nearest,
            CliFilter::Triangle => FilterType::Triangle,
            CliFilter::Catmullrom => FilterType::CatmullRom,
            CliFilter::Gaussian => FilterType::Gaussian,
            CliFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[tokio::main]
async fn main() {
    let mut cli = Cli::parse();

    if let Some(command) = cli.command.take() {
        if let Err(e) = handle_subcommand(command) {
            exit_with_error(e);
        }
        return;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => exit_with_error(e),
    };

    if let Err(e) = init_logging(&config.logging) {
        exit_with_error(e.into());
    }

    let resizer = match config.resizer_config().and_then(Resizer::new) {
        Ok(resizer) => resizer,
        Err(e) => exit_with_error(e.into()),
    };

    let cancel = CancellationToken::new();
    watch_for_interrupt(cancel.clone());

    let spinner = (!cli.quiet && !cli.json).then(|| spawn_spinner(&resizer));

    let stats = match resizer.run(&cancel).await {
        Ok(stats) => stats,
        Err(e) => exit_with_error(e.into()),
    };

    if let Some((bar, handle)) = spinner {
        let _ = handle.await;
        bar.finish_and_clear();
    }

    print_summary(&stats, cli.json);
}

fn exit_with_error(error: anyhow::Error) -> ! {
    eprintln!("{}: {:#}", style("Error").red().bold(), error);
    process::exit(1);
}

/// Merge defaults, the optional config file and CLI flags, in that order
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(input) = &cli.input {
        config.pipeline.input = input.clone();
    }
    if let Some(output) = &cli.output {
        config.pipeline.output = output.clone();
    }
    if let Some(width) = cli.width {
        config.resize.width = width;
    }
    if let Some(height) = cli.height {
        config.resize.height = height;
    }
    if let Some(quality) = cli.quality {
        config.resize.quality = quality;
    }
    if let Some(filter) = cli.filter {
        config.resize.filter = filter.into();
    }
    if let Some(workers) = cli.workers {
        config.pipeline.workers = Some(workers);
    }
    if let Some(capacity) = cli.channel_capacity {
        config.pipeline.channel_capacity = capacity;
    }
    if cli.postfix {
        config.naming.postfix = true;
    }
    if cli.resolution_folder {
        config.naming.resolution_folder = true;
    }

    if cli.quiet {
        config.logging.level = "error".to_string();
    } else if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    Ok(config)
}

/// Cancel the run on Ctrl-C; the partial count is still reported
fn watch_for_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping signal caught, shutting down...");
            info!("Interrupt received, cancelling run");
            cancel.cancel();
        }
    });
}

/// Spinner fed by progress events until the run finishes
fn spawn_spinner(resizer: &Resizer) -> (ProgressBar, JoinHandle<()>) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message("Scanning...");

    let mut updates = resizer.subscribe();
    let spinner = bar.clone();
    let handle = tokio::spawn(async move {
        let (mut resized, mut skipped, mut failed) = (0u64, 0u64, 0u64);
        loop {
            match updates.recv().await {
                Ok(ProgressUpdate::ImageResized { name, .. }) => {
                    resized += 1;
                    debug!("Resized {:?}", name);
                }
                Ok(ProgressUpdate::ImageSkipped { .. }) => skipped += 1,
                Ok(ProgressUpdate::ImageFailed { .. }) => failed += 1,
                Ok(ProgressUpdate::Finished { .. }) | Err(RecvError::Closed) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    debug!("Progress display missed {} updates", missed);
                    continue;
                }
            }
            spinner.set_message(format!(
                "{} resized, {} skipped, {} failed",
                resized, skipped, failed
            ));
        }
    });

    (bar, handle)
}

/// Handle subcommands
fn handle_subcommand(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::ExampleConfig { output } => generate_example_config(&output),
        Commands::CheckConfig { file } => check_config_file(&file),
    }
}

/// Validate configuration file
fn check_config_file(file_path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(file_path)?;
    let run = config.resizer_config()?;
    run.validate()?;

    println!("{}: Configuration file is valid", style("Success").green().bold());
    println!("Input: {}", run.input.display());
    println!("Output: {}", run.output_root().display());
    println!("Resolution: {}x{}", run.resize.width, run.resize.height);
    println!("Workers: {}", run.workers);

    Ok(())
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path) -> anyhow::Result<()> {
    Config::default().to_file(output_path)?;

    println!(
        "{}: Generated example configuration: {}",
        style("Success").green().bold(),
        output_path.display()
    );

    Ok(())
}

/// Print run summary
fn print_summary(stats: &RunStats, json_output: bool) {
    if json_output {
        match serde_json::to_string_pretty(stats) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}: {}", style("Error").red().bold(), e),
        }
        return;
    }

    if stats.is_cancelled() {
        println!("{}", style("Run cancelled").yellow().bold());
    }
    println!("Resized images: {}", stats.resized);
    if stats.skipped > 0 {
        println!("  {}: {}", style("Skipped").yellow(), stats.skipped);
    }
    if stats.failed > 0 {
        println!("  {}: {}", style("Failed").red(), stats.failed);
    }
    println!("  {}: {:.2}s", style("Duration").blue(), stats.elapsed.as_secs_f64());
    if stats.resized > 0 {
        println!("  {}: {}", style("Speed").cyan(), stats.speed_text());
    }
}
