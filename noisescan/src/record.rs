//! JSON record of an invocation, saved next to the configuration file

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Summary of one processed run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run: u32,
    pub map: String,
    pub waveforms: PathBuf,
    pub channels: usize,
    pub crates: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub version: String,
    pub config: PathBuf,
    pub timestamp: DateTime<Local>,
    /// Wall time of the whole invocation in seconds
    pub duration: f64,
    pub runs: Vec<RunSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analyzed_runs: Vec<u32>,
    pub outputs: Vec<PathBuf>,
}

impl RunRecord {
    pub fn new(version: &str, config: &Path) -> Self {
        RunRecord {
            version: version.to_string(),
            config: config.to_path_buf(),
            timestamp: Local::now(),
            duration: 0.0,
            runs: Vec::new(),
            analyzed_runs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Write the record as `<config stem>_<date>_<time>.json` beside the
    /// configuration, adding milliseconds if that name is taken.
    pub fn save(&self) -> Result<PathBuf> {
        let json_record = serde_json::to_string_pretty(self)?;

        let ts = Local::now();
        let rcd_stem = self
            .config
            .file_stem()
            .unwrap_or_else(|| std::ffi::OsStr::new("noise"))
            .to_string_lossy()
            .to_string();
        let names = [
            format!("{}_{}.json", rcd_stem, ts.format("%F_%H-%M-%S")),
            format!("{}_{}.json", rcd_stem, ts.format("%F_%H-%M-%S%.3f")),
        ];
        for name in names.iter() {
            let rcd_path = self.config.with_file_name(name);
            if let Ok(f) = OpenOptions::new().write(true).create_new(true).open(&rcd_path) {
                let mut wtr = BufWriter::new(f);
                wtr.write_all(json_record.as_bytes())?;
                wtr.flush()?;
                return Ok(rcd_path);
            }
        }
        bail!("Saving more than one run record per millisecond")
    }
}
