//! PNG diagnostics of a crate: RMS by channel, mean power spectra and the
//! separation of the spectrum from its background

use noisetools::metrics::{ChannelMetrics, CrateSpectra};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

pub type DynError = Box<dyn std::error::Error>;

type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const SIZE: (u32, u32) = (1280, 960);
/// Frequency range shown, kHz
const F_MAX_KHZ: f64 = 800.0;
/// Limits of the log power axis
const LOG_POWER: (f64, f64) = (0.1, 1e4);
/// Limit of the RMS axis, ADC counts
const RMS_MAX: f64 = 25.0;

fn scatter(
    area: &Panel,
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    x_range: (f64, f64),
    y_range: (f64, f64),
    points: &[(f64, f64)],
) -> Result<(), DynError> {
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .light_line_style(WHITE.mix(0.0))
        .draw()?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 2, BLUE.filled())))?;
    Ok(())
}

fn log_scatter(
    area: &Panel,
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    x_range: (f64, f64),
    y_range: (f64, f64),
    points: &[(f64, f64)],
) -> Result<(), DynError> {
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range.0..x_range.1, (y_range.0..y_range.1).log_scale())?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .light_line_style(WHITE.mix(0.0))
        .draw()?;
    // Nothing at or below zero has a place on a log axis
    chart.draw_series(
        points
            .iter()
            .filter(|&&(_, y)| y > 0.0)
            .map(|&p| Circle::new(p, 2, BLUE.filled())),
    )?;
    Ok(())
}

fn khz_points(frequency: &[f64], power: &[f64]) -> Vec<(f64, f64)> {
    frequency
        .iter()
        .zip(power.iter())
        .map(|(f, p)| (1000.0 * f, *p))
        .collect()
}

/// RMS and coherent-noise-removed RMS of the channels of one crate, in
/// order of crate-local channel
pub fn plot_rms(dir: &Path, crate_label: &str, rows: &[&ChannelMetrics]) -> Result<(), DynError> {
    if rows.is_empty() {
        return Err(format!("no channels to plot for crate {}", crate_label).into());
    }
    let mut sorted: Vec<&ChannelMetrics> = rows.to_vec();
    sorted.sort_by_key(|r| r.local);
    let raw: Vec<(f64, f64)> = sorted.iter().enumerate().map(|(i, r)| (i as f64, r.rms)).collect();
    let corrected: Vec<(f64, f64)> = sorted
        .iter()
        .enumerate()
        .map(|(i, r)| (i as f64, r.rms_corrected))
        .collect();

    let path = dir.join(format!("RMS_{}.png", crate_label));
    let root = BitMapBackend::new(&path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));
    let x_range = (0.0, noisetools::CRATE_CHANNELS as f64);
    scatter(&panels[0], "Mean RMS", "", "RMS [ADC]", x_range, (0.0, RMS_MAX), &raw)?;
    scatter(
        &panels[1],
        "RMS After Coherent Noise Removal",
        "Channel Number",
        "RMS [ADC]",
        x_range,
        (0.0, RMS_MAX),
        &corrected,
    )?;
    root.present()?;
    Ok(())
}

/// Mean raw and coherent-noise-removed power spectra of a crate
pub fn plot_power(dir: &Path, frequency: &[f64], spectra: &CrateSpectra) -> Result<(), DynError> {
    let path = dir.join(format!("Power_{}.png", spectra.crate_label));
    let root = BitMapBackend::new(&path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));
    log_scatter(
        &panels[0],
        "Raw Power Spectrum",
        "",
        "Power",
        (0.0, F_MAX_KHZ),
        LOG_POWER,
        &khz_points(frequency, &spectra.raw),
    )?;
    log_scatter(
        &panels[1],
        "Power Spectrum After Coherent Noise Removal",
        "Frequency [kHz]",
        "Power",
        (0.0, F_MAX_KHZ),
        LOG_POWER,
        &khz_points(frequency, &spectra.corrected),
    )?;
    root.present()?;
    Ok(())
}

/// Spectrum, background and their difference, on linear (`BGSep_Lin_`) and
/// log (`BGSep_Log_`) power axes
pub fn plot_background_separation(dir: &Path, frequency: &[f64], spectra: &CrateSpectra) -> Result<(), DynError> {
    let residual: Vec<f64> = spectra
        .raw
        .iter()
        .zip(spectra.background.iter())
        .map(|(p, b)| p - b)
        .collect();
    let panels_data = [
        ("Full Spectrum", khz_points(frequency, &spectra.raw)),
        ("Background", khz_points(frequency, &spectra.background)),
        ("Full Spectrum - Background", khz_points(frequency, &residual)),
    ];

    // Panels share the y range of the linear plot
    let in_view = |&&(f, _): &&(f64, f64)| f <= F_MAX_KHZ;
    let (lo, hi) = panels_data
        .iter()
        .flat_map(|(_, pts)| pts.iter().filter(in_view))
        .fold((0f64, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    let hi = if hi > lo { hi } else { lo + 1.0 };

    let path = dir.join(format!("BGSep_Lin_{}.png", spectra.crate_label));
    let root = BitMapBackend::new(&path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    for (area, (caption, pts)) in root.split_evenly((3, 1)).iter().zip(panels_data.iter()) {
        scatter(area, caption, "Frequency [kHz]", "Power", (0.0, F_MAX_KHZ), (lo, hi), pts)?;
    }
    root.present()?;

    let path = dir.join(format!("BGSep_Log_{}.png", spectra.crate_label));
    let root = BitMapBackend::new(&path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    for (area, (caption, pts)) in root.split_evenly((3, 1)).iter().zip(panels_data.iter()) {
        log_scatter(area, caption, "Frequency [kHz]", "Power", (0.0, F_MAX_KHZ), LOG_POWER, pts)?;
    }
    root.present()?;
    Ok(())
}
