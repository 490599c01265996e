mod audio;
mod batch;
mod cli;
mod config;
mod error;
mod report;

use anyhow::{Context, Result};
use clap::Parser;

use batch::BatchDriver;
use cli::Cli;
use config::{Config, Settings};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match config::find_config(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    let settings = Settings::resolve(&cli, config).context("Invalid settings")?;
    let output_path = settings.output_path.clone();

    log::info!("songstats - batch acoustic feature extraction");
    log::info!("Input: {}", settings.input_directory.display());
    log::info!("Output: {}", output_path.display());
    log::info!(
        "Analysis: {}Hz, frame={}, hop={}, extensions=[{}]{}",
        settings.sample_rate,
        settings.frames.frame_size,
        settings.frames.hop_size,
        settings.extensions.join(", "),
        if settings.case_sensitive { "" } else { " (any case)" }
    );

    // 1. Discover, decode and analyse
    let outcome = BatchDriver::new(settings)
        .run()
        .context("Batch analysis failed")?;

    for skipped in &outcome.skipped {
        log::warn!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    // 2. Write report
    if outcome.table.is_empty() {
        log::warn!("No files analysed, writing header-only report");
    }
    report::write_report(&outcome.table, &output_path)
        .with_context(|| format!("Could not save results to {}", output_path.display()))?;

    log::info!(
        "Analysis complete! {} rows ({} skipped). Results saved to {}",
        outcome.table.len(),
        outcome.skipped.len(),
        output_path.display()
    );
    Ok(())
}
