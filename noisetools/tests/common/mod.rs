#![allow(dead_code)]

use noisetools::map::ChannelMap;
use noisetools::source::MemorySource;
use noisetools::{Result, Waveforms};
use std::env;
use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;

pub const TICKS: usize = 4096;
/// Bin of the synthetic sine; an integer number of periods per waveform
pub const SINE_BIN: usize = 100;
pub const AMPLITUDE: f64 = 50.0;

/// Deterministic noise of -1, 0 or +1 ADC counts
fn dither(t: usize, seed: i16) -> i16 {
    let mut x = (t as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ (seed as u64).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 31;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 29;
    (x % 3) as i16 - 1
}

/// Pedestal plus a digitized sine sitting exactly on bin `SINE_BIN`, over a
/// floor of one-count noise so every spectrum has a positive background
pub fn sine(pedestal: i16, n_ticks: usize) -> Vec<i16> {
    (0..n_ticks)
        .map(|t| {
            let phase = 2.0 * PI * SINE_BIN as f64 * t as f64 / n_ticks as f64;
            pedestal + (AMPLITUDE * phase.sin()).round() as i16 + dither(t, pedestal)
        })
        .collect()
}

/// `n_events` identical events of a sine on every channel, each with its own
/// pedestal
pub fn sine_source(channels: &[u32], n_events: usize) -> MemorySource {
    let event: Waveforms = channels
        .iter()
        .map(|&c| sine(2000 + 10 * (c % 100) as i16, TICKS))
        .collect();
    MemorySource::new(channels.to_vec(), vec![event; n_events]).unwrap()
}

pub fn flat_source(channels: &[u32], n_events: usize, n_ticks: usize, value: i16) -> MemorySource {
    let event: Waveforms = vec![vec![value; n_ticks]; channels.len()];
    MemorySource::new(channels.to_vec(), vec![event; n_events]).unwrap()
}

/// Channels 0-2 on crate A, the rest on crate B
pub fn two_crate_map(channels: &[u32]) -> ChannelMap {
    let mapper = |c: u32| -> Result<(String, u32)> {
        if c < 3 {
            Ok((String::from("A"), c))
        } else {
            Ok((String::from("B"), c - 3))
        }
    };
    ChannelMap::build(channels, &mapper).unwrap()
}

/// Fresh scratch directory under the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("noisetools-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn assert_close(a: f64, b: f64, rel: f64) {
    let scale = a.abs().max(b.abs()).max(1e-300);
    assert!(
        (a - b).abs() / scale <= rel,
        "{} and {} differ by more than {}",
        a,
        b,
        rel,
    );
}
