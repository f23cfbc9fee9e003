use anyhow::{Context, Result};
use caps::audio::{event_name_for, list_audio_files, Id3Tagger, SoxEngine};
use caps::config::Config;
use caps::error::CapsError;
use caps::interactive::{
    collect_metadata, default_output_csv, CollectOutcome, CollectSession, DialoguerPrompter,
};
use caps::metadata::MetadataStore;
use caps::pipeline::{print_summary, process_store_with_cancel, ProcessConfig};
use caps::ui::Theme;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "caps")]
#[command(version, about = "Conference audio processing")]
#[command(
    long_about = "Describe raw conference recordings interactively, then cut, filter and tag them into finished MP3s."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Prompt for metadata about each recording and write it to a CSV
    Collect {
        /// Directory containing raw audio to be processed
        path: PathBuf,

        /// CSV file to write results to (defaults to <event>.csv)
        #[arg(short, long)]
        output_csv: Option<PathBuf>,
    },

    /// Cut, filter and tag every recording described in a CSV
    Process {
        /// Metadata CSV written by `caps collect`
        input_csv: PathBuf,

        /// Directory for finished files (defaults to ./processed)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    if std::env::var_os("RUST_LOG").is_some() {
        builder.with_env_filter(EnvFilter::from_default_env()).init();
    } else {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        builder.with_max_level(level).init();
    }
}

fn install_interrupt_handler() -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .context("Failed to install Ctrl+C handler")?;
    Ok(interrupted)
}

fn run_collect(path: PathBuf, output_csv: Option<PathBuf>, config: &Config) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Input path not found: {}", path.display());
    }

    let files = list_audio_files(&path, &config.audio_extensions)?;
    if files.is_empty() {
        return Err(CapsError::NoAudioFiles(path.display().to_string()).into());
    }

    let default_event = event_name_for(&path);
    let output_csv = output_csv.unwrap_or_else(|| default_output_csv(&default_event));

    info!("Input:    {}", path.display());
    info!("Output:   {}", output_csv.display());
    info!("Files:    {}", files.len());

    let interrupted = install_interrupt_handler()?;
    let mut prompter = DialoguerPrompter::new(Theme::default(), interrupted.clone());
    let session = CollectSession {
        files,
        output_csv,
        default_event,
    };

    let report = collect_metadata(&session, &mut prompter, &interrupted)
        .with_context(|| format!("Collection into {} failed", session.output_csv.display()))?;

    match report.outcome {
        CollectOutcome::Completed => info!("All {} files visited", session.files.len()),
        CollectOutcome::Declined => info!("Nothing collected"),
        CollectOutcome::Interrupted => info!("Collection interrupted"),
    }
    if let Some(saved) = report.saved_to {
        info!("Saved {} records to {}", report.store.len(), saved.display());
    }

    Ok(())
}

fn run_process(input_csv: PathBuf, output_dir: Option<PathBuf>, config: &Config) -> Result<()> {
    if !input_csv.is_file() {
        anyhow::bail!("Input CSV not found: {}", input_csv.display());
    }

    let store = MetadataStore::open(&input_csv)
        .with_context(|| format!("Failed to read {}", input_csv.display()))?;

    let engine = SoxEngine::new(config.sox_program.clone(), config.filters.clone());
    engine.check().context("SoX is required for processing")?;

    let process_config = ProcessConfig {
        output_dir: output_dir.unwrap_or_else(|| config.output_dir.clone()),
        ..Default::default()
    };

    info!("Input:    {}", input_csv.display());
    info!("Output:   {}", process_config.output_dir.display());
    info!("Records:  {}", store.len());

    let interrupted = install_interrupt_handler()?;
    let result = process_store_with_cancel(
        &store,
        &engine,
        &Id3Tagger::default(),
        &process_config,
        interrupted,
    )?;

    print_summary(&result);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load and validate configuration
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    match cli.command {
        Command::Collect { path, output_csv } => run_collect(path, output_csv, &config),
        Command::Process {
            input_csv,
            output_dir,
        } => run_process(input_csv, output_dir, &config),
    }
}
