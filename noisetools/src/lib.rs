pub mod calc;
pub mod cfg;
pub mod de;
pub mod error;
pub mod heatmap;
pub mod map;
pub mod metrics;
pub mod ser;
pub mod snip;
pub mod source;

pub use error::{NoiseError, Result, Stage};

/// One event worth of waveforms: a row of ADC samples per channel
pub type Waveforms = Vec<Vec<i16>>;

/// A single bin of a spectrum, used for text (de)serialization
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug)]
pub struct Bin {
    /// Frequency in MHz
    pub freq: f64,
    pub power: f64,
}

/// Digitizer tick in microseconds
pub const TICK_US: f64 = 0.4;
/// Sampling rate in MHz, the inverse of the tick
pub const SAMPLE_RATE_MHZ: f64 = 1.0 / TICK_US;
/// Channel IDs above this value are not readout channels and are masked out
pub const CHANNEL_SENTINEL: u32 = 56000;
/// Readout channels on a full mini-crate (a few carry 512)
pub const CRATE_CHANNELS: u32 = 576;
/// Channels per readout board
pub const BOARD_CHANNELS: u32 = 64;
/// Progress is logged every this many events
pub const LOG_EVERY: usize = 10;
