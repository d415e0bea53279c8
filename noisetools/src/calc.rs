//! Noise calculations: RMS, power spectra, crate averages and peak finding
//!
//! A run can hold up to ~55,000 channels of 4096 ticks, so nothing here
//! loads more than one event at a time. Accumulators are indexed by channel
//! row and the per-channel work inside an event runs on the rayon pool.

use crate::error::{NoiseError, Result, Stage};
use crate::map::ChannelMap;
use crate::source::WaveformSource;
use crate::{LOG_EVERY, SAMPLE_RATE_MHZ};
use rayon::prelude::*;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;
use tracing::{debug, info};

/// Peak of a spectrum inside a frequency band
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// Frequency of the peak in kHz
    pub frequency: f64,
    pub power: f64,
    /// Index of the peak in the unrestricted spectrum
    pub index: usize,
}

/// Median of a waveform; the mean of the two central samples for even lengths.
pub fn median(samples: &[i16]) -> f64 {
    let n = samples.len();
    if n == 0 {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    let (lower, &mut mid, _) = sorted.select_nth_unstable(n / 2);
    if n % 2 == 1 {
        mid as f64
    } else {
        let below = lower.iter().copied().max().unwrap_or(mid);
        (below as f64 + mid as f64) / 2.0
    }
}

/// Number of events to average: the request or what the source holds,
/// whichever is smaller.
fn events_to_use<S: WaveformSource + ?Sized>(source: &S, requested: usize, stage: Stage) -> Result<usize> {
    let n = requested.min(source.num_events());
    if n == 0 {
        return Err(NoiseError::invalid(
            stage,
            format!("no events to average ({} requested, {} available)", requested, source.num_events()),
        ));
    }
    if source.num_ticks() == 0 || source.num_channels() == 0 {
        return Err(NoiseError::invalid(
            stage,
            format!("empty waveforms ({} channels of {} ticks)", source.num_channels(), source.num_ticks()),
        ));
    }
    Ok(n)
}

/// RMS of each channel averaged over (at most) `num_events` events.
///
/// For each event the pedestal (median) is subtracted and the squared
/// residuals are accumulated tick by tick. After dividing by the number of
/// events, the mean over ticks gives the mean square of the channel.
pub fn rms<S: WaveformSource + ?Sized>(source: &S, num_events: usize) -> Result<Vec<f64>> {
    let n = events_to_use(source, num_events, Stage::Rms)?;
    let n_ticks = source.num_ticks();
    let mut sum_sq = vec![vec![0f64; n_ticks]; source.num_channels()];

    for event in 0..n {
        if event % LOG_EVERY == 0 {
            info!("Processing (RMS) event {}...", event);
        }
        let waveforms = source
            .waveforms(event)
            .map_err(|e| relabel(e, Stage::Rms))?;
        sum_sq
            .par_iter_mut()
            .zip(waveforms.par_iter())
            .for_each(|(acc, wf)| {
                let pedestal = median(wf);
                for (a, &x) in acc.iter_mut().zip(wf.iter()) {
                    let d = x as f64 - pedestal;
                    *a += d * d;
                }
            });
    }

    let rms = sum_sq
        .par_iter()
        .map(|acc| {
            let mean_sq = acc.iter().map(|s| s / n as f64).sum::<f64>() / n_ticks as f64;
            mean_sq.sqrt()
        })
        .collect();
    Ok(rms)
}

/// Frequencies (MHz) of the one-sided spectrum of `n_ticks` samples
pub fn frequencies(n_ticks: usize) -> Vec<f64> {
    (0..n_ticks / 2 + 1)
        .map(|k| k as f64 * SAMPLE_RATE_MHZ / n_ticks as f64)
        .collect()
}

/// One-sided power spectral density estimator for a fixed waveform length:
/// boxcar window, constant detrend, density scaling.
#[derive(Clone)]
pub struct Periodogram {
    n_ticks: usize,
    fft: Arc<dyn RealToComplex<f64>>,
}

impl Periodogram {
    pub fn new(n_ticks: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n_ticks);
        Periodogram { n_ticks, fft }
    }

    /// Number of frequency bins
    pub fn bins(&self) -> usize {
        self.n_ticks / 2 + 1
    }

    /// Working buffers for one worker: input, spectrum, scratch
    pub fn buffers(&self) -> (Vec<f64>, Vec<Complex<f64>>, Vec<Complex<f64>>) {
        (
            self.fft.make_input_vec(),
            self.fft.make_output_vec(),
            self.fft.make_scratch_vec(),
        )
    }

    /// Add the periodogram of `input` into `acc`. `input` is consumed as
    /// scratch space.
    pub fn accumulate(
        &self,
        input: &mut [f64],
        spectrum: &mut [Complex<f64>],
        scratch: &mut [Complex<f64>],
        acc: &mut [f64],
    ) -> Result<()> {
        let n = self.n_ticks;
        let mean = input.iter().sum::<f64>() / n as f64;
        input.iter_mut().for_each(|x| *x -= mean);
        self.fft
            .process_with_scratch(input, spectrum, scratch)
            .map_err(|e| NoiseError::invalid(Stage::Spectrum, e.to_string()))?;

        let scale = 1.0 / (SAMPLE_RATE_MHZ * n as f64);
        let last = spectrum.len() - 1;
        for (k, (a, c)) in acc.iter_mut().zip(spectrum.iter()).enumerate() {
            let mut p = c.norm_sqr() * scale;
            // One-sided: fold in the negative frequencies, which DC and an
            // even-length Nyquist bin don't have
            if k != 0 && !(n % 2 == 0 && k == last) {
                p *= 2.0;
            }
            *a += p;
        }
        Ok(())
    }
}

/// Power spectrum of each channel averaged over (at most) `num_events`
/// events. Returns the frequency axis in MHz and one spectrum per channel.
///
/// With `pedestal_subtract` the per-event median is removed first; inputs
/// that are already corrected are transformed as they are.
pub fn power<S: WaveformSource + ?Sized>(
    source: &S,
    num_events: usize,
    pedestal_subtract: bool,
) -> Result<(Vec<f64>, Vec<Vec<f64>>)> {
    let n = events_to_use(source, num_events, Stage::Spectrum)?;
    let n_ticks = source.num_ticks();
    if n_ticks < 2 {
        return Err(NoiseError::invalid(
            Stage::Spectrum,
            format!("{} ticks is too short for a spectrum", n_ticks),
        ));
    }
    let periodogram = Periodogram::new(n_ticks);
    let frequency = frequencies(n_ticks);
    let mut spectra = vec![vec![0f64; periodogram.bins()]; source.num_channels()];

    for event in 0..n {
        if event % LOG_EVERY == 0 {
            info!("Processing (power) event {}...", event);
        }
        let waveforms = source
            .waveforms(event)
            .map_err(|e| relabel(e, Stage::Spectrum))?;
        spectra
            .par_iter_mut()
            .zip(waveforms.par_iter())
            .try_for_each_init(
                || periodogram.buffers(),
                |(input, spectrum, scratch), (acc, wf)| {
                    let pedestal = if pedestal_subtract { median(wf) } else { 0.0 };
                    for (i, &x) in input.iter_mut().zip(wf.iter()) {
                        *i = x as f64 - pedestal;
                    }
                    periodogram.accumulate(input, spectrum, scratch, acc)
                },
            )?;
    }

    spectra
        .par_iter_mut()
        .for_each(|s| s.iter_mut().for_each(|p| *p /= n as f64));
    Ok((frequency, spectra))
}

/// Mean power spectrum of the channels that belong to `crate_label`.
/// `spectra[i]` is the spectrum of `channels[i]`.
pub fn mean_power(
    spectra: &[Vec<f64>],
    channels: &[u32],
    map: &ChannelMap,
    crate_label: &str,
) -> Result<Vec<f64>> {
    if spectra.len() != channels.len() {
        return Err(NoiseError::invalid(
            Stage::Aggregate,
            format!("{} spectra for {} channels", spectra.len(), channels.len()),
        ));
    }
    let mut mean: Vec<f64> = Vec::new();
    let mut count = 0usize;
    for (spectrum, &channel) in spectra.iter().zip(channels.iter()) {
        if map.get(channel)?.crate_label != crate_label {
            continue;
        }
        if mean.is_empty() {
            mean = vec![0f64; spectrum.len()];
        } else if mean.len() != spectrum.len() {
            return Err(NoiseError::invalid(
                Stage::Aggregate,
                format!("channel {} has {} bins, expected {}", channel, spectrum.len(), mean.len()),
            ));
        }
        for (m, p) in mean.iter_mut().zip(spectrum.iter()) {
            *m += p;
        }
        count += 1;
    }
    if count == 0 {
        return Err(NoiseError::EmptyCrate {
            stage: Stage::Aggregate,
            crate_label: crate_label.to_string(),
        });
    }
    debug!("Crate {}: averaged {} channels", crate_label, count);
    mean.iter_mut().for_each(|m| *m /= count as f64);
    Ok(mean)
}

/// Find the frequency (kHz) and height of the largest bin strictly between
/// `f_low` and `f_high` kHz. Ties go to the lowest frequency.
///
/// The index returned is that of the first bin of the whole spectrum holding
/// exactly the peak power, which is the peak itself unless the same value
/// also occurs below the band.
pub fn peak_find(frequency: &[f64], power: &[f64], f_low: f64, f_high: f64) -> Result<Peak> {
    if frequency.len() != power.len() {
        return Err(NoiseError::invalid(
            Stage::PeakFind,
            format!("{} frequencies for {} power bins", frequency.len(), power.len()),
        ));
    }
    if f_low >= f_high {
        return Err(NoiseError::EmptyBand { f_low, f_high });
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, (&f, &p)) in frequency.iter().zip(power.iter()).enumerate() {
        let khz = 1000.0 * f;
        if !(khz > f_low && khz < f_high) {
            continue;
        }
        match best {
            Some((_, b)) if !(p > b) => {}
            _ => best = Some((i, p)),
        }
    }
    let (local, peak_power) = best.ok_or(NoiseError::EmptyBand { f_low, f_high })?;

    let index = power
        .iter()
        .position(|&p| p == peak_power)
        .unwrap_or(local);
    Ok(Peak {
        frequency: 1000.0 * frequency[local],
        power: peak_power,
        index,
    })
}

/// Source errors surface at the stage that was reading
fn relabel(e: NoiseError, stage: Stage) -> NoiseError {
    match e {
        NoiseError::InvalidInput { stage: Stage::Source, reason } => NoiseError::InvalidInput { stage, reason },
        other => other,
    }
}
