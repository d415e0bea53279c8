use anyhow::{Context, Result};
use noisescan::decode::DecodedDir;
use noisescan::record::RunRecord;
use noisescan::{run, CliArgs};
use noisetools::cfg::Config;
use noisetools::{heatmap, ser};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

fn main() -> Result<()> {
    // Parse command line arguments
    let args: CliArgs = argh::from_env();

    if args.version {
        println!(
            concat!(
                env!("CARGO_BIN_NAME"),
                " ",
                "{}",
            ),
            GIT_VERSION,
        );
        return Ok(())
    }

    // Load the config file
    let cfg_path = PathBuf::from(&args.config);
    let config = Config::load(&cfg_path)
        .with_context(|| format!("loading {}", cfg_path.display()))?;

    // Log to file, truncated on every start
    let log = File::create(config.log_file())
        .with_context(|| format!("creating log {}", config.log_file().display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();
    warn!("Logging service has started.");

    ctrlc::set_handler(|| {
        warn!("Received SIGINT, exiting.");
        std::process::exit(130);
    })?;

    let start = Instant::now();
    let mut record = RunRecord::new(GIT_VERSION, &cfg_path);
    let resolver = DecodedDir::from_config(&config.path);

    let mut full_power = Vec::new();
    for &(run, ref map_name) in config.data.runs.iter() {
        let processed = match run::process_run(&config, run, map_name, &resolver, args.skip_plots) {
            Ok(p) => p,
            Err(e) => {
                error!("Run {} failed: {:#}", run, e);
                return Err(e);
            }
        };
        full_power.extend(processed.crates);
        record.outputs.extend(processed.outputs);
        record.runs.push(processed.summary);
    }

    for &run in config.data.analyzed_runs.iter() {
        full_power.extend(run::load_analyzed(&config, run)?);
        record.analyzed_runs.push(run);
    }
    let full_path = PathBuf::from("FullPower.csv");
    ser::table_file(&full_path, &full_power)?;
    info!("Wrote {} crate rows to {}", full_power.len(), full_path.display());
    record.outputs.push(full_path);

    if let Some(h) = &config.svg_heatmap {
        let written = heatmap::write_all(h, &full_power, Path::new(&config.path.images))
            .context("writing heatmaps")?;
        record.outputs.extend(written);
    }

    record.duration = start.elapsed().as_secs_f64();
    let rcd_path = record.save()?;
    info!("Saved run record {}", rcd_path.display());
    Ok(())
}
