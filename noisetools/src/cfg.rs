//! Configuration: what to analyze and where things live
//!
//! The analysis is driven by a YAML document with the sections below. Keys
//! keep the capitalization of the established configuration files, e.g.
//!
//! ```yaml
//! Analysis:
//!   Events: 50
//!   fLow: 1
//!   fHigh: 800
//! Data:
//!   Runs:
//!     5300: ChannelMap_East
//!   AnalyzedRuns: []
//! Path:
//!   DAQName_Raw: daq
//!   DAQName_Uncor: daq:Cor
//!   Images: images/
//!   Decoded: decoded/
//! Miscellaneous:
//!   LogPath: logs/
//!   LogName: noise.log
//! SVGHeatmap:
//!   Columns: [fPow, fRatio]
//!   ZMin: [0, 0]
//!   ZMax: [10000, 50]
//!   BarLabel: ["Peak Power", "Peak Ratio"]
//!   Gradient: viridis
//!   SVGBase: TPCBase
//!   EmptyColor: "255,255,255"
//! ```

use crate::error::{NoiseError, Result};
use crate::snip::SnipParams;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Config {
    #[serde(rename = "Analysis")]
    pub analysis: Analysis,
    #[serde(rename = "Data")]
    pub data: Data,
    #[serde(rename = "Path")]
    pub path: Paths,
    #[serde(rename = "Miscellaneous", default)]
    pub miscellaneous: Miscellaneous,
    #[serde(rename = "SVGHeatmap", default, skip_serializing_if = "Option::is_none")]
    pub svg_heatmap: Option<SvgHeatmap>,
}

/// Numeric settings of the noise analysis
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Analysis {
    /// Events to average over (fewer if the run has fewer)
    #[serde(rename = "Events")]
    pub events: usize,
    /// Lower edge of the peak search band, kHz
    #[serde(rename = "fLow", default = "f_low_default")]
    pub f_low: f64,
    /// Upper edge of the peak search band, kHz
    #[serde(rename = "fHigh", default = "f_high_default")]
    pub f_high: f64,
    #[serde(rename = "SNIP", default)]
    pub snip: SnipParams,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Data {
    /// Run number to channel map name, in file order; the map is cached as
    /// `<name>.csv`
    #[serde(rename = "Runs", with = "run_list")]
    pub runs: Vec<(u32, String)>,
    /// Runs processed earlier whose crate tables are merged as they are
    #[serde(rename = "AnalyzedRuns", default = "emptyvec", skip_serializing_if = "Vec::is_empty")]
    pub analyzed_runs: Vec<u32>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Paths {
    /// Producer of the raw waveforms
    #[serde(rename = "DAQName_Raw")]
    pub daq_name_raw: String,
    /// Producer of the coherent-noise-removed waveforms
    #[serde(rename = "DAQName_Uncor")]
    pub daq_name_uncor: String,
    /// Output directory for plots and crate tables
    #[serde(rename = "Images", default = "cwd")]
    pub images: PathBuf,
    /// Directory holding decoded waveform files
    #[serde(rename = "Decoded", default = "cwd")]
    pub decoded: PathBuf,
    /// External decoder to launch for runs without a decoded file; `{run}`
    /// is replaced by the run number
    #[serde(rename = "DecodeCommand", default, skip_serializing_if = "Option::is_none")]
    pub decode_command: Option<String>,
    /// Directory of cached channel maps
    #[serde(rename = "Maps", default = "cwd")]
    pub maps: PathBuf,
    /// Directory with the exported hardware database tables
    #[serde(rename = "HardwareTables", default, skip_serializing_if = "Option::is_none")]
    pub hardware_tables: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Miscellaneous {
    #[serde(rename = "LogPath", default = "cwd")]
    pub log_path: PathBuf,
    #[serde(rename = "LogName", default = "log_name_default")]
    pub log_name: String,
}

/// Geographic heatmaps, one per column of the crate table. `Columns`,
/// `ZMin`, `ZMax` and `BarLabel` are parallel lists.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct SvgHeatmap {
    #[serde(rename = "Columns")]
    pub columns: Vec<String>,
    #[serde(rename = "ZMin")]
    pub z_min: Vec<f64>,
    #[serde(rename = "ZMax")]
    pub z_max: Vec<f64>,
    #[serde(rename = "BarLabel")]
    pub bar_label: Vec<String>,
    /// Name of the color gradient, e.g. `viridis`
    #[serde(rename = "Gradient")]
    pub gradient: String,
    /// SVG template, without the `.svg` extension
    #[serde(rename = "SVGBase")]
    pub svg_base: PathBuf,
    /// `r,g,b` of crates without data
    #[serde(rename = "EmptyColor", default = "empty_color_default")]
    pub empty_color: String,
}

/// `Runs` is written as a YAML mapping but processed in the order listed
mod run_list {
    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(runs: &[(u32, String)], s: S) -> Result<S::Ok, S::Error> {
        s.collect_map(runs.iter().map(|(run, map)| (run, map)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<(u32, String)>, D::Error> {
        struct RunVisitor;

        impl<'de> Visitor<'de> for RunVisitor {
            type Value = Vec<(u32, String)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of run number to channel map name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut runs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    runs.push(entry);
                }
                Ok(runs)
            }
        }

        d.deserialize_map(RunVisitor)
    }
}

fn emptyvec<T>() -> Vec<T> {
    Vec::new()
}

fn cwd() -> PathBuf {
    PathBuf::from(".")
}

fn f_low_default() -> f64 {
    1.0
}

fn f_high_default() -> f64 {
    800.0
}

fn log_name_default() -> String {
    String::from("noise.log")
}

fn empty_color_default() -> String {
    String::from("255,255,255")
}

impl Default for Miscellaneous {
    fn default() -> Self {
        Miscellaneous {
            log_path: cwd(),
            log_name: log_name_default(),
        }
    }
}

impl Config {
    /// Read and check a YAML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let rdr = BufReader::new(File::open(path)?);
        let config: Config = serde_yaml::from_reader(rdr)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, (run, _)) in self.data.runs.iter().enumerate() {
            if self.data.runs[..i].iter().any(|(r, _)| r == run) {
                return Err(NoiseError::Config(format!("run {} listed twice", run)));
            }
        }
        if let Some(h) = &self.svg_heatmap {
            let n = h.columns.len();
            if h.z_min.len() != n || h.z_max.len() != n || h.bar_label.len() != n {
                return Err(NoiseError::Config(format!(
                    "SVGHeatmap lists differ in length: {} columns, {} ZMin, {} ZMax, {} BarLabel",
                    n,
                    h.z_min.len(),
                    h.z_max.len(),
                    h.bar_label.len(),
                )));
            }
        }
        Ok(())
    }

    /// Path of the cached channel map of a run
    pub fn map_path(&self, map_name: &str) -> PathBuf {
        self.path.maps.join(format!("{}.csv", map_name))
    }

    /// Path of the crate table written for a run
    pub fn crate_table_path(&self, run: u32) -> PathBuf {
        self.path.images.join(format!("Run{}Power.csv", run))
    }

    pub fn log_file(&self) -> PathBuf {
        self.miscellaneous.log_path.join(&self.miscellaneous.log_name)
    }
}
