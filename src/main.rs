use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use sff_split::{load_patterns, EmptyOutputPolicy, SffReader, SplitConfigBuilder, Splitter};

/// Exit code reported after an interrupted run (128 + SIGINT)
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "sff-split")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Split an SFF file into one file per adapter sequence", long_about = None)]
struct Cli {
    /// Input SFF file
    #[arg(value_name = "SFF")]
    input: PathBuf,

    /// Adapter list (lines of `IonXpress_NNN <sequence>`)
    #[arg(short, long, value_name = "FILE", required = true)]
    adapters: PathBuf,

    /// Search the whole read instead of its clipped region
    #[arg(short = 'c', long)]
    no_clipping: bool,

    /// Count matches without writing any output
    #[arg(short = 'r', long)]
    dry_run: bool,

    /// Directory receiving the split files
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// File name prefix of the split files
    #[arg(short, long, default_value = "split")]
    prefix: String,

    /// Number of matching threads (0 = auto-detect)
    #[arg(short = 't', long, default_value = "0")]
    threads: usize,

    /// Delete split files that received no read
    #[arg(long)]
    remove_empty: bool,
}

fn run(cli: Cli) -> Result<bool> {
    let interrupt = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&interrupt);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install signal handler")?;

    let patterns = load_patterns(&cli.adapters)?;
    info!("Loaded {} adapters from {:?}", patterns.len(), cli.adapters);

    let mut reader = SffReader::from_path(&cli.input)?;

    let config = SplitConfigBuilder::default()
        .ignore_clipping(cli.no_clipping)
        .dry_run(cli.dry_run)
        .threads(cli.threads)
        .output_dir(&cli.output_dir)
        .prefix(cli.prefix)
        .empty_outputs(if cli.remove_empty {
            EmptyOutputPolicy::Remove
        } else {
            EmptyOutputPolicy::Keep
        })
        .build();

    let mut splitter = Splitter::create(reader.header(), patterns, config)
        .context("Failed to prepare split outputs")?
        .with_interrupt(interrupt);
    let summary = splitter
        .run(&mut reader)
        .with_context(|| format!("Failed to split {:?}", cli.input))?;

    for target in &summary.targets {
        let destination = target
            .path
            .as_ref()
            .map_or_else(|| String::from("-"), |p| p.display().to_string());
        info!(
            "{} {}: {} reads -> {}",
            target.pattern.label,
            target.pattern.sequence_str(),
            target.count,
            destination
        );
    }
    info!("Processed {} reads", summary.records_processed);
    Ok(summary.interrupted)
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if run(cli)? {
        warn!("Run was interrupted; outputs hold the reads processed so far");
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}
