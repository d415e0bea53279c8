//! Geographic heatmap of crate metrics, drawn by substituting colors into an
//! SVG template of the mini-crate layout
//!
//! The template carries tags: `$WE05$` where the fill color of mini-crate
//! WE05 goes, `$col1$`..`$col6$` and `$val1$`..`$val6$` for the color and
//! label of each legend stop, and `$bar_label$` for the legend title.

use crate::cfg::SvgHeatmap;
use crate::error::{NoiseError, Result};
use crate::metrics::CrateMetrics;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of legend stops
pub const LEGEND_STOPS: usize = 6;

/// Every mini-crate of the detector: two cryostats (E, W) with two TPCs each
/// (E, W), 20 flanges per TPC with the first and last split bottom, middle
/// and top.
pub fn mini_crates() -> Vec<String> {
    let mut crates = Vec::with_capacity(96);
    for side in ["EE", "EW", "WE", "WW"] {
        for flange in 1..=20 {
            if flange == 1 || flange == 20 {
                for part in ["B", "M", "T"] {
                    crates.push(format!("{}{:02}{}", side, flange, part));
                }
            } else {
                crates.push(format!("{}{:02}", side, flange));
            }
        }
    }
    crates
}

/// Color gradients, sampled at evenly spaced stops and interpolated linearly
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gradient {
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Cividis,
    Greys,
}

const VIRIDIS: [u32; 9] = [
    0x440154, 0x472d7b, 0x3b528b, 0x2c728e, 0x21918c, 0x28ae80, 0x5ec962, 0xaddc30, 0xfde725,
];
const PLASMA: [u32; 9] = [
    0x0d0887, 0x4c02a1, 0x7e03a8, 0xa92395, 0xcc4778, 0xe56b5d, 0xf89540, 0xfdc527, 0xf0f921,
];
const INFERNO: [u32; 9] = [
    0x000004, 0x1f0c48, 0x550f6d, 0x88226a, 0xba3655, 0xe35933, 0xf98e09, 0xf8c932, 0xfcffa4,
];
const MAGMA: [u32; 9] = [
    0x000004, 0x1c1044, 0x4f127b, 0x812581, 0xb5367a, 0xe55064, 0xfb8761, 0xfec287, 0xfcfdbf,
];
const CIVIDIS: [u32; 9] = [
    0x00224e, 0x123570, 0x3b496c, 0x575d6d, 0x707173, 0x8a8678, 0xa59c74, 0xc3b369, 0xfee838,
];
const GREYS: [u32; 9] = [
    0xffffff, 0xf0f0f0, 0xd9d9d9, 0xbdbdbd, 0x969696, 0x737373, 0x525252, 0x252525, 0x000000,
];

fn channels(hex: u32) -> [f64; 3] {
    [
        ((hex >> 16) & 0xff) as f64,
        ((hex >> 8) & 0xff) as f64,
        (hex & 0xff) as f64,
    ]
}

impl Gradient {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "viridis" => Ok(Gradient::Viridis),
            "plasma" => Ok(Gradient::Plasma),
            "inferno" => Ok(Gradient::Inferno),
            "magma" => Ok(Gradient::Magma),
            "cividis" => Ok(Gradient::Cividis),
            "Greys" | "greys" => Ok(Gradient::Greys),
            _ => Err(NoiseError::Config(format!("unknown gradient '{}'", name))),
        }
    }

    fn stops(&self) -> &'static [u32] {
        match self {
            Gradient::Viridis => &VIRIDIS,
            Gradient::Plasma => &PLASMA,
            Gradient::Inferno => &INFERNO,
            Gradient::Magma => &MAGMA,
            Gradient::Cividis => &CIVIDIS,
            Gradient::Greys => &GREYS,
        }
    }

    /// Color at `t`, clamped to [0, 1]; NaN maps to the low end
    pub fn at(&self, t: f64) -> [u8; 3] {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let x = t * (stops.len() - 1) as f64;
        let i = (x.floor() as usize).min(stops.len() - 2);
        let frac = x - i as f64;
        let (lo, hi) = (channels(stops[i]), channels(stops[i + 1]));
        let mut rgb = [0u8; 3];
        for c in 0..3 {
            rgb[c] = (lo[c] + (hi[c] - lo[c]) * frac).round() as u8;
        }
        rgb
    }
}

pub fn hex([r, g, b]: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

pub fn rgb([r, g, b]: [u8; 3]) -> String {
    format!("rgb({},{},{})", r, g, b)
}

/// One heatmap: which crate column to draw and how to color it
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapSpec {
    pub column: String,
    pub z_min: f64,
    pub z_max: f64,
    pub bar_label: String,
    pub gradient: Gradient,
    /// `r,g,b` of crates without data
    pub empty_color: String,
}

impl HeatmapSpec {
    /// One heatmap per configured column
    pub fn from_config(cfg: &SvgHeatmap) -> Result<Vec<Self>> {
        let gradient = Gradient::from_name(&cfg.gradient)?;
        let mut specs = Vec::with_capacity(cfg.columns.len());
        for (i, column) in cfg.columns.iter().enumerate() {
            let (z_min, z_max) = match (cfg.z_min.get(i), cfg.z_max.get(i)) {
                (Some(&lo), Some(&hi)) => (lo, hi),
                _ => return Err(NoiseError::Config(format!("no Z range for column {}", column))),
            };
            if z_max <= z_min {
                return Err(NoiseError::Config(format!(
                    "column {}: ZMax {} is not above ZMin {}",
                    column, z_max, z_min
                )));
            }
            specs.push(HeatmapSpec {
                column: column.clone(),
                z_min,
                z_max,
                bar_label: cfg.bar_label.get(i).cloned().unwrap_or_default(),
                gradient,
                empty_color: cfg.empty_color.clone(),
            });
        }
        Ok(specs)
    }

    fn normalize(&self, x: f64) -> f64 {
        (x - self.z_min) / (self.z_max - self.z_min)
    }
}

/// Fill in the template for `rows`. Crates missing from `rows` get the empty
/// color; if a crate appears more than once the last row wins.
pub fn render(template: &str, rows: &[CrateMetrics], spec: &HeatmapSpec) -> Result<String> {
    let mut changes: Vec<(String, String)> = Vec::new();

    for stop in 0..LEGEND_STOPS {
        let t = stop as f64 / (LEGEND_STOPS - 1) as f64;
        let value =
            spec.z_min + stop as f64 * (spec.z_max - spec.z_min) / (LEGEND_STOPS - 1) as f64;
        changes.push((format!("$col{}$", stop + 1), hex(spec.gradient.at(t))));
        changes.push((format!("$val{}$", stop + 1), value.to_string()));
    }

    let mut fills: Vec<(String, String)> = mini_crates()
        .into_iter()
        .map(|c| (c, format!("rgb({})", spec.empty_color)))
        .collect();
    for row in rows {
        let value = row.column(&spec.column).ok_or_else(|| {
            NoiseError::Config(format!("no crate table column '{}'", spec.column))
        })?;
        let color = rgb(spec.gradient.at(spec.normalize(value)));
        match fills.iter_mut().find(|(c, _)| *c == row.crate_label) {
            Some(fill) => fill.1 = color,
            None => fills.push((row.crate_label.clone(), color)),
        }
    }
    changes.extend(fills.into_iter().map(|(c, color)| (format!("${}$", c), color)));
    changes.push((String::from("$bar_label$"), spec.bar_label.clone()));

    let mut svg = template.to_string();
    for (tag, value) in changes.iter() {
        svg = svg.replace(tag.as_str(), value);
    }
    Ok(svg)
}

/// Render every configured heatmap into `out_dir/ModSVG_<column>.svg`
pub fn write_all(cfg: &SvgHeatmap, rows: &[CrateMetrics], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut base = cfg.svg_base.clone().into_os_string();
    base.push(".svg");
    let base = PathBuf::from(base);
    let template = fs::read_to_string(&base).map_err(|e| {
        NoiseError::ExternalIo(format!("SVG template {}: {}", base.display(), e))
    })?;
    debug!("Loaded SVG template {}", base.display());

    let mut written = Vec::new();
    for spec in HeatmapSpec::from_config(cfg)? {
        let svg = render(&template, rows, &spec)?;
        let path = out_dir.join(format!("ModSVG_{}.svg", spec.column));
        fs::write(&path, svg)?;
        info!("Wrote heatmap {}", path.display());
        written.push(path);
    }
    Ok(written)
}
