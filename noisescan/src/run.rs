//! Processing of a single run: waveforms in, tables and plots out

use crate::decode::RunFileResolver;
use crate::plot;
use crate::record::RunSummary;
use anyhow::{anyhow, Context, Result};
use noisetools::cfg::Config;
use noisetools::map::{ChannelMap, TableMapper};
use noisetools::metrics::{self, ChannelMetrics, CrateMetrics, RunMetrics};
use noisetools::source::{WaveformFile, WaveformSource};
use noisetools::{de, ser, NoiseError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a processed run
pub struct Processed {
    pub summary: RunSummary,
    pub crates: Vec<CrateMetrics>,
    pub outputs: Vec<PathBuf>,
}

pub fn channel_table_path(run: u32) -> PathBuf {
    PathBuf::from(format!("MetricsByChannel_{}.csv", run))
}

/// Analyze `run`, write its channel and crate tables and, unless
/// `skip_plots`, the per-crate plots.
pub fn process_run(
    config: &Config,
    run: u32,
    map_name: &str,
    resolver: &dyn RunFileResolver,
    skip_plots: bool,
) -> Result<Processed> {
    let file = resolver.resolve(run).with_context(|| format!("run {}", run))?;
    info!("Run {}: processing {}", run, file.display());

    let raw = WaveformFile::open(&file, &config.path.daq_name_raw)?;
    let corrected = WaveformFile::open(&file, &config.path.daq_name_uncor)?;

    let map_path = config.map_path(map_name);
    let map = ChannelMap::load_or_build(&map_path, raw.channels(), || match &config.path.hardware_tables {
        Some(dir) => TableMapper::from_dir(dir),
        None => Err(NoiseError::ExternalIo(format!(
            "channel map {} not found and no HardwareTables configured",
            map_path.display()
        ))),
    })
    .with_context(|| format!("channel map {}", map_name))?;
    info!("Run {}: channel map {} with {} entries", run, map_name, map.len());

    let result = metrics::analyze(&raw, &corrected, &map, &config.analysis)
        .with_context(|| format!("analysis of run {}", run))?;

    let mut outputs = Vec::new();
    let channel_path = channel_table_path(run);
    ser::table_file(&channel_path, &result.channels)?;
    outputs.push(channel_path);
    let crate_path = config.crate_table_path(run);
    ser::table_file(&crate_path, &result.crates)?;
    outputs.push(crate_path);

    if !skip_plots {
        draw(&config.path.images, &result)?;
    }

    Ok(Processed {
        summary: RunSummary {
            run,
            map: map_name.to_string(),
            waveforms: file,
            channels: result.channels.len(),
            crates: result.crates.len(),
        },
        crates: result.crates,
        outputs,
    })
}

fn draw(dir: &Path, result: &RunMetrics) -> Result<()> {
    for spectra in result.crate_spectra.iter() {
        let label = &spectra.crate_label;
        let rows: Vec<&ChannelMetrics> = result
            .channels
            .iter()
            .filter(|r| &r.crate_label == label)
            .collect();
        plot::plot_rms(dir, label, &rows).map_err(|e| anyhow!("RMS plot of {}: {}", label, e))?;
        plot::plot_power(dir, &result.frequency, spectra).map_err(|e| anyhow!("power plot of {}: {}", label, e))?;
        plot::plot_background_separation(dir, &result.frequency, spectra)
            .map_err(|e| anyhow!("background plot of {}: {}", label, e))?;
    }
    info!("Plotted {} crates into {}", result.crate_spectra.len(), dir.display());
    Ok(())
}

/// Crate table of a run analyzed by an earlier invocation
pub fn load_analyzed(config: &Config, run: u32) -> Result<Vec<CrateMetrics>> {
    let path = config.crate_table_path(run);
    let rows: Vec<CrateMetrics> =
        de::table_file(&path).with_context(|| format!("crate table {}", path.display()))?;
    if rows.is_empty() {
        warn!("Run {}: crate table {} is empty", run, path.display());
    }
    Ok(rows)
}
