use argh::FromArgs;
use anyhow::{bail, Result};
use std::io::{stdin, stdout, Write};

use noisetools::snip::{self, SnipParams};
use noisetools::{calc, de, ser};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(Debug, FromArgs, Clone)]
/// Estimate the SNIP background of a spectrum given as tab-separated
/// (MHz, power) values and print the background in the same format.
/// With --f-low and --f-high, the peak in that band (kHz) and its
/// separation from the background are reported on standard error.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// clipping iterations
    #[argh(option, short = 'n', default = "20")]
    pub iterations: usize,
    /// clip the spectrum as it is, without the LLS transform
    #[argh(switch)]
    pub linear: bool,
    /// clipping window once the protected iterations are done
    #[argh(option, default = "100")]
    pub protect_range: usize,
    /// iterations whose window is the iteration number
    #[argh(option, default = "5")]
    pub protect_iterations: usize,
    /// lower edge of the peak search band, kHz
    #[argh(option)]
    pub f_low: Option<f64>,
    /// upper edge of the peak search band, kHz
    #[argh(option)]
    pub f_high: Option<f64>,
    /// spectrum file (reads standard input by default)
    #[argh(positional)]
    pub input: Option<String>,
}

fn main() -> Result<()> {
    let args: CliArgs = argh::from_env();
    if args.version {
        let stdout = stdout();
        let mut stdout = stdout.lock();
        writeln!(
            stdout,
            concat!(
                env!("CARGO_BIN_NAME"),
                " ",
                "{}",
            ),
            GIT_VERSION,
        )?;
        return Ok(())
    }

    let bins = match &args.input {
        // positional arg is filename
        Some(path) => {
            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(false)
                .delimiter(b'\t')
                .from_path(path)?;
            de::spectrum_tsv(&mut rdr)?
        },
        // otherwise take from stdin
        None => {
            let input = stdin();
            let input = input.lock();
            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(false)
                .delimiter(b'\t')
                .from_reader(input);
            de::spectrum_tsv(&mut rdr)?
        },
    };
    if bins.is_empty() {
        bail!("no spectrum bins in input");
    }
    let freq: Vec<f64> = bins.iter().map(|b| b.freq).collect();
    let power: Vec<f64> = bins.iter().map(|b| b.power).collect();

    let params = SnipParams {
        iterations: args.iterations,
        apply_lls: !args.linear,
        protect_range: args.protect_range,
        protect_iterations: args.protect_iterations,
    };
    let background = snip::background(&power, &params)?;

    if let (Some(f_low), Some(f_high)) = (args.f_low, args.f_high) {
        let peak = calc::peak_find(&freq, &power, f_low, f_high)?;
        let bg = background[peak.index];
        eprintln!(
            "peak {} kHz: power {}, background {}, ratio {}",
            peak.frequency,
            peak.power,
            bg,
            (peak.power - bg) / bg,
        );
    }

    let stdout = stdout();
    let stdout = stdout.lock();
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_writer(stdout);
    ser::spectrum_tsv(&mut wtr, &freq, &background)?;
    Ok(())
}
