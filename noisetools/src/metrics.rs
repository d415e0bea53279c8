//! Assembly of per-channel and per-crate noise tables for one run

use crate::calc::{self, Peak};
use crate::cfg::Analysis;
use crate::error::{NoiseError, Result, Stage};
use crate::map::{self, ChannelMap};
use crate::snip::{self, SnipParams};
use crate::source::WaveformSource;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Peak of a spectrum and how far it stands above the SNIP background
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Separation {
    pub peak: Peak,
    /// Background at the peak
    pub background: f64,
    /// Power above the background at the peak
    pub separated: f64,
    /// `separated / background`
    pub ratio: f64,
}

/// Find the peak of `power` in the analysis band and separate it from the
/// background. Returns the separation and the full background spectrum.
///
/// A spectrum without power at the peak, or whose background there is not
/// positive (a dead or flat channel), has no meaningful ratio and is
/// rejected at the background stage.
pub fn separate(
    frequency: &[f64],
    power: &[f64],
    f_low: f64,
    f_high: f64,
    snip: &SnipParams,
) -> Result<(Separation, Vec<f64>)> {
    let peak = calc::peak_find(frequency, power, f_low, f_high)?;
    let background = snip::background(power, snip)?;
    let bg = background[peak.index];
    if !(bg > 0.0 && bg.is_finite() && peak.power > 0.0) {
        return Err(NoiseError::invalid(
            Stage::Background,
            format!(
                "background {} under peak power {} at bin {}",
                bg, peak.power, peak.index
            ),
        ));
    }
    let separated = power[peak.index] - bg;
    Ok((
        Separation {
            peak,
            background: bg,
            separated,
            ratio: separated / bg,
        },
        background,
    ))
}

/// Row of the per-channel table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChannelMetrics {
    #[serde(rename = "fID")]
    pub id: u32,
    #[serde(rename = "fChannel")]
    pub local: u32,
    #[serde(rename = "fCrate")]
    pub crate_label: String,
    /// RMS of the raw waveforms
    #[serde(rename = "fRMS")]
    pub rms: f64,
    /// RMS after coherent noise removal
    #[serde(rename = "fUnRMS")]
    pub rms_corrected: f64,
    #[serde(rename = "fFreq")]
    pub frequency: f64,
    #[serde(rename = "fPow")]
    pub power: f64,
    #[serde(rename = "fPowSep")]
    pub separated: f64,
    #[serde(rename = "fPowBack")]
    pub background: f64,
    #[serde(rename = "fRatio")]
    pub ratio: f64,
}

/// Row of the per-crate table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CrateMetrics {
    #[serde(rename = "fCrate")]
    pub crate_label: String,
    #[serde(rename = "fFreq")]
    pub frequency: f64,
    #[serde(rename = "fPow")]
    pub power: f64,
    #[serde(rename = "fPowSep")]
    pub separated: f64,
    #[serde(rename = "fPowBack")]
    pub background: f64,
    #[serde(rename = "fRatio")]
    pub ratio: f64,
}

impl CrateMetrics {
    fn new(crate_label: &str, s: &Separation) -> Self {
        CrateMetrics {
            crate_label: crate_label.to_string(),
            frequency: s.peak.frequency,
            power: s.peak.power,
            separated: s.separated,
            background: s.background,
            ratio: s.ratio,
        }
    }

    /// Value of a table column by its header name
    pub fn column(&self, name: &str) -> Option<f64> {
        match name {
            "fFreq" => Some(self.frequency),
            "fPow" => Some(self.power),
            "fPowSep" => Some(self.separated),
            "fPowBack" => Some(self.background),
            "fRatio" => Some(self.ratio),
            _ => None,
        }
    }
}

/// Mean spectra of a crate, kept for plotting
#[derive(Clone, Debug, PartialEq)]
pub struct CrateSpectra {
    pub crate_label: String,
    pub raw: Vec<f64>,
    pub corrected: Vec<f64>,
    pub background: Vec<f64>,
}

/// Everything computed for one run
#[derive(Clone, Debug, PartialEq)]
pub struct RunMetrics {
    /// Frequency axis of all spectra, MHz
    pub frequency: Vec<f64>,
    pub channels: Vec<ChannelMetrics>,
    pub crates: Vec<CrateMetrics>,
    pub crate_spectra: Vec<CrateSpectra>,
}

/// Compute the noise tables of a run from its raw waveforms and the
/// coherent-noise-removed waveforms of the same events.
pub fn analyze<S, T>(raw: &S, corrected: &T, map: &ChannelMap, analysis: &Analysis) -> Result<RunMetrics>
where
    S: WaveformSource + ?Sized,
    T: WaveformSource + ?Sized,
{
    let channels = raw.channels().to_vec();
    if corrected.channels() != &channels[..] {
        return Err(NoiseError::invalid(
            Stage::Source,
            "raw and corrected waveforms have different channel lists",
        ));
    }
    let dups = map::duplicates(&channels);
    if !dups.is_empty() {
        warn!("Duplicate channels (id, count): {:?}", dups);
    }
    debug!("Channel list length: {}", channels.len());

    let crates = map.crates_of(&channels)?;
    let mut per_crate_count: HashMap<&str, usize> = HashMap::new();
    for &c in channels.iter() {
        *per_crate_count.entry(map.get(c)?.crate_label.as_str()).or_insert(0) += 1;
    }
    for label in crates.iter() {
        debug!("{}: {} channels", label, per_crate_count.get(label.as_str()).unwrap_or(&0));
    }

    let rms_raw = calc::rms(raw, analysis.events)?;
    let rms_corrected = calc::rms(corrected, analysis.events)?;

    let (frequency, power_raw) = calc::power(raw, analysis.events, true)?;
    let (_, power_corrected) = calc::power(corrected, analysis.events, true)?;

    info!("Separating peaks for {} crates", crates.len());
    let per_crate = crates
        .par_iter()
        .map(|label| {
            crate_separation(label, &frequency, &power_raw, &power_corrected, &channels, map, analysis)
                .map_err(|e| e.for_crate(label))
        })
        .collect::<Result<Vec<_>>>();
    let (crate_rows, crate_spectra): (Vec<_>, Vec<_>) = per_crate?.into_iter().unzip();

    info!("Separating peaks for {} channels", channels.len());
    let channel_rows = channels
        .par_iter()
        .enumerate()
        .map(|(i, &id)| {
            let entry = map.get(id)?;
            let (sep, _) = separate(&frequency, &power_raw[i], analysis.f_low, analysis.f_high, &analysis.snip)
                .map_err(|e| e.for_channel(id))?;
            Ok(ChannelMetrics {
                id,
                local: entry.local,
                crate_label: entry.crate_label.clone(),
                rms: rms_raw[i],
                rms_corrected: rms_corrected[i],
                frequency: sep.peak.frequency,
                power: sep.peak.power,
                separated: sep.separated,
                background: sep.background,
                ratio: sep.ratio,
            })
        })
        .collect::<Result<Vec<ChannelMetrics>>>()?;

    Ok(RunMetrics {
        frequency,
        channels: channel_rows,
        crates: crate_rows,
        crate_spectra,
    })
}

/// Mean spectra, peak and background of one crate
fn crate_separation(
    label: &str,
    frequency: &[f64],
    power_raw: &[Vec<f64>],
    power_corrected: &[Vec<f64>],
    channels: &[u32],
    map: &ChannelMap,
    analysis: &Analysis,
) -> Result<(CrateMetrics, CrateSpectra)> {
    let raw = calc::mean_power(power_raw, channels, map, label)?;
    let corrected = calc::mean_power(power_corrected, channels, map, label)?;
    let (sep, background) = separate(frequency, &raw, analysis.f_low, analysis.f_high, &analysis.snip)?;
    let spectra = CrateSpectra {
        crate_label: label.to_string(),
        raw,
        corrected,
        background,
    };
    Ok((CrateMetrics::new(label, &sep), spectra))
}
