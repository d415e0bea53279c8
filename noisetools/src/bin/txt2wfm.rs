use argh::FromArgs;
use anyhow::{bail, Result};
use either::{Left, Right};
use std::fs::{self, File};
use std::io::{stdin, stdout, BufReader, BufWriter, Read, Write};

use noisetools::{de, ser};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(Debug, FromArgs, Clone)]
/// Compress decoded waveforms stored as tab-separated records
/// (event, channel, producer, samples...) to the .wfm.zst format
/// read by noisescan. Each input becomes its own compressed stream
/// of the output.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// file to write output to (writes to standard output by default)
    #[argh(option, short = 'o')]
    pub out: Option<String>,
    /// with no input or when input is '-', read from standard input
    #[argh(positional)]
    pub input: Vec<String>,
}

fn encode<R: Read>(rdr: R, wtr: &mut impl Write) -> Result<()> {
    let mut rdr = de::waveform_reader(rdr);
    let records = de::waveforms(&mut rdr)?;
    let mut text = ser::waveform_writer(Vec::new());
    ser::waveform_records(&mut text, &records)?;
    let text = text.into_inner().map_err(|e| e.into_error())?;
    ser::compress(wtr, &text)?;
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
    let mut wtr: Box<dyn Write> = match args.out {
        None => {
            Box::new(stdout.lock())
        },
        Some(p) => {
            let f = File::create(p)?;
            Box::new(BufWriter::new(f))
        },
    };

    for i in inputs {
        match i {
            Left(()) => {
                let stdin = stdin();
                let stdin = stdin.lock();
                encode(stdin, &mut wtr)?;
            },
            Right(path) => {
                let f = File::open(path)?;
                encode(BufReader::new(f), &mut wtr)?;
            },
        }
    }
    wtr.flush()?;
    Ok(())
}
