//! Background estimation with the Sensitive Nonlinear Iterative Peak (SNIP)
//! clipping algorithm
//!
//! The background is everything in a spectrum that is smooth and not a peak.
//! Each iteration replaces a bin with the average of its neighbors at
//! distance `n` whenever that average is lower, so narrow features are
//! clipped away while the continuum survives. The optional
//! Log-Log-Square root (LLS) operator compresses the dynamic range first,
//! which makes relatively small peaks easier to clip (sometimes too easy).

use crate::error::{NoiseError, Result, Stage};
use serde::{Deserialize, Serialize};

/// Knobs of the SNIP clipping
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct SnipParams {
    /// Number of clipping passes; pass `n` compares neighbors `n` bins away
    #[serde(rename = "Iterations")]
    pub iterations: usize,
    /// Apply the LLS operator before clipping and invert it afterwards
    #[serde(rename = "ApplyLLS")]
    pub apply_lls: bool,
    /// Bins at the start of the spectrum left untouched once
    /// `protect_iterations` passes have been made
    #[serde(rename = "ProtectRange")]
    pub protect_range: usize,
    /// Passes before `protect_range` takes over from the pass number
    #[serde(rename = "ProtectIterations")]
    pub protect_iterations: usize,
}

impl Default for SnipParams {
    fn default() -> Self {
        SnipParams {
            iterations: 20,
            apply_lls: true,
            protect_range: 100,
            protect_iterations: 5,
        }
    }
}

/// Log-Log-Square root operator
#[inline]
pub fn lls(x: f64) -> f64 {
    (((x + 1.0).sqrt() + 1.0).ln() + 1.0).ln()
}

/// Exact algebraic inverse of [`lls`]
#[inline]
pub fn inverse_lls(y: f64) -> f64 {
    let root = (y.exp() - 1.0).exp() - 1.0;
    root * root - 1.0
}

/// Estimate the smooth background of `spectrum`.
///
/// Every pass reads only the previous pass, so two buffers are swapped
/// rather than keeping the full iteration history. Bin 0 is never clipped.
pub fn background(spectrum: &[f64], params: &SnipParams) -> Result<Vec<f64>> {
    if let Some(j) = spectrum
        .iter()
        .position(|&x| !x.is_finite() || (params.apply_lls && x < -1.0))
    {
        return Err(NoiseError::invalid(
            Stage::Background,
            format!("bin {} holds {}, outside the domain of the transform", j, spectrum[j]),
        ));
    }

    let len = spectrum.len();
    let mut prev: Vec<f64> = if params.apply_lls {
        spectrum.iter().map(|&x| lls(x)).collect()
    } else {
        spectrum.to_vec()
    };
    let mut next = prev.clone();

    for n in 1..=params.iterations {
        let window = if n < params.protect_iterations {
            n
        } else {
            params.protect_range
        };
        for j in 1..len {
            next[j] = if j >= window && j + n < len {
                f64::min((prev[j - n] + prev[j + n]) / 2.0, prev[j])
            } else {
                prev[j]
            };
        }
        std::mem::swap(&mut prev, &mut next);
    }

    if params.apply_lls {
        prev.iter_mut().for_each(|y| *y = inverse_lls(*y));
    }
    Ok(prev)
}
