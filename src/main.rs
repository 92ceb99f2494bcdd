use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use labelcheck::{LabelConfig, LabelProcessor, Services};

#[derive(Parser)]
#[command(name = "labelcheck")]
#[command(version, about = "Check the pricing label of a meat package")]
struct Cli {
    /// Path to the label photograph
    #[arg(short, long, value_name = "FILE", value_parser = regular_file)]
    file: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// JSON file overriding the built-in label parameters
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the ocrs detection and recognition models
    #[arg(long, value_name = "DIR")]
    models: Option<PathBuf>,
}

fn regular_file(arg: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(arg);
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => Ok(path),
        Ok(_) => Err(format!("{} is not a regular file", arg)),
        Err(e) => Err(format!("{}: {}", arg, e)),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match &args.config {
        Some(path) => LabelConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LabelConfig::default(),
    };
    if let Some(models) = args.models {
        config.ocr.model_dir = Some(models);
    }

    let services = Services::from_config(&config)?;
    let mut processor = LabelProcessor::new(&config, &services);
    if let Some(debug_dir) = args.debug_out {
        processor = processor.with_debug(debug_dir)?;
    }

    let started = Instant::now();
    let report = processor.process_label(&args.file)?;
    log::info!("Label checked in {:?}", started.elapsed());

    println!("{}", report);
    Ok(())
}
