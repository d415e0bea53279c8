//! Error taxonomy shared by the numeric core and its collaborators

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for noise analysis operations
pub type Result<T> = std::result::Result<T, NoiseError>;

/// Pipeline stage at which an error was raised
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Source,
    Rms,
    Spectrum,
    Aggregate,
    PeakFind,
    Background,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Source => "source",
            Stage::Rms => "RMS",
            Stage::Spectrum => "spectrum",
            Stage::Aggregate => "aggregate",
            Stage::PeakFind => "peak-find",
            Stage::Background => "background",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum NoiseError {
    /// Zero available events, ragged waveform matrices, etc.
    #[error("invalid input at {stage} stage: {reason}")]
    InvalidInput { stage: Stage, reason: String },

    /// No channels of the requested crate in the selection
    #[error("crate {crate_label} has no channels ({stage} stage)")]
    EmptyCrate { stage: Stage, crate_label: String },

    /// No frequency bins strictly inside the band
    #[error("no frequency bins inside ({f_low}, {f_high}) kHz (peak-find stage)")]
    EmptyBand { f_low: f64, f_high: f64 },

    #[error("channel {channel} is missing from the channel map")]
    MissingMapEntry { channel: u32 },

    /// Failure of an external collaborator: decoder, hardware tables, ...
    #[error("external collaborator failed: {0}")]
    ExternalIo(String),

    #[error("channel {channel}: {source}")]
    Channel {
        channel: u32,
        #[source]
        source: Box<NoiseError>,
    },

    #[error("crate {crate_label}: {source}")]
    Crate {
        crate_label: String,
        #[source]
        source: Box<NoiseError>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl NoiseError {
    pub fn invalid(stage: Stage, reason: impl Into<String>) -> Self {
        NoiseError::InvalidInput { stage, reason: reason.into() }
    }

    /// Attach the offending channel ID
    pub fn for_channel(self, channel: u32) -> Self {
        NoiseError::Channel { channel, source: Box::new(self) }
    }

    /// Attach the offending crate label
    pub fn for_crate(self, crate_label: &str) -> Self {
        NoiseError::Crate { crate_label: crate_label.to_string(), source: Box::new(self) }
    }
}
