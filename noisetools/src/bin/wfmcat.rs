use argh::FromArgs;
use anyhow::{bail, Result};
use either::{Left, Right};
use std::fs::{self, File};
use std::io::{stdin, stdout, BufReader, Read, Write};

use noisetools::{de, ser};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(Debug, FromArgs, Clone)]
/// Decompress decoded waveforms in the .wfm.zst format and print
/// tab-separated records (event, channel, producer, samples...) to
/// standard output, in analogy to zcat(1).
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// only print records of this producer
    #[argh(option, short = 'p')]
    pub producer: Option<String>,
    /// with no input or when input is '-', read from standard input
    #[argh(positional)]
    pub input: Vec<String>,
}

fn cat<R: Read, W: Write>(rdr: R, wtr: &mut csv::Writer<W>, producer: Option<&str>) -> Result<()> {
    let zrdr = zstd::stream::read::Decoder::new(rdr)?;
    let mut rdr = de::waveform_reader(zrdr);
    let mut records = de::waveforms(&mut rdr)?;
    if let Some(p) = producer {
        records.retain(|r| r.producer == p);
    }
    ser::waveform_records(wtr, &records)?;
    Ok(())
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

    // Collect inputs
    let mut inputs = Vec::new();
    if args.input.is_empty() {
        inputs.push(Left(()));
    } else {
        let mut contains_stdin = false;
        for i in args.input {
            if i == "-" {
                if contains_stdin {
                    bail!("cannot specify '-' for stdin twice");
                }
                contains_stdin = true;
                inputs.push(Left(()));
            } else {
                match fs::metadata(&i) {
                    Ok(m) => {
                        if m.is_file() {
                            inputs.push(Right(i));
                        } else {
                            bail!("{} is not a file", &i);
                        }
                    },
                    Err(e) => bail!(e),
                }
            }
        }
    }

    let stdout = stdout();
    let stdout = stdout.lock();
    let mut wtr = ser::waveform_writer(stdout);
    let producer = args.producer.as_deref();

    for i in inputs {
        match i {
            Left(()) => {
                let stdin = stdin();
                let stdin = stdin.lock();
                cat(stdin, &mut wtr, producer)?;
            },
            Right(path) => {
                let f = File::open(path)?;
                cat(BufReader::new(f), &mut wtr, producer)?;
            },
        }
    }
    wtr.flush()?;
    Ok(())
}
