use argh::FromArgs;

#[derive(Debug, FromArgs, Clone)]
/// Survey the electronic noise of TPC mini-crates: RMS, power spectra,
/// peak frequencies and their separation from the noise background,
/// for every run listed in the configuration file.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// skip the per-crate PNG plots
    #[argh(switch)]
    pub skip_plots: bool,
    /// config file path
    #[argh(positional, default = "String::from(\"TPCConfig.yaml\")")]
    pub config: String,
}

pub mod decode;
pub mod plot;
pub mod record;
pub mod run;
