//! Locating the decoded waveform file of a run, decoding it first if needed

use noisetools::cfg::Paths;
use noisetools::{NoiseError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Produces the decoded waveform file of a run
pub trait RunFileResolver {
    fn resolve(&self, run: u32) -> Result<PathBuf>;
}

/// Decoded files named `*<run>_1_*-decode.wfm.zst` in one directory, with an
/// optional external command that decodes a run into it.
#[derive(Clone, Debug)]
pub struct DecodedDir {
    dir: PathBuf,
    command: Option<String>,
}

impl DecodedDir {
    pub fn new(dir: &Path, command: Option<String>) -> Self {
        DecodedDir { dir: dir.to_path_buf(), command }
    }

    pub fn from_config(paths: &Paths) -> Self {
        DecodedDir::new(&paths.decoded, paths.decode_command.clone())
    }

    /// First decoded file of `run` in name order, if any. The run number
    /// must not be preceded by another digit, so run 300 does not pick up
    /// files of run 5300.
    pub fn find(&self, run: u32) -> Result<Option<PathBuf>> {
        let tag = format!("{}_1_", run);
        let mut found: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n,
                None => continue,
            };
            if let Some(stem) = name.strip_suffix("-decode.wfm.zst") {
                let whole_run = stem
                    .match_indices(&tag)
                    .any(|(i, _)| !stem[..i].ends_with(|c: char| c.is_ascii_digit()));
                if whole_run {
                    found.push(path.clone());
                }
            }
        }
        found.sort();
        if found.len() > 1 {
            debug!("Run {}: {} decoded files, using the first", run, found.len());
        }
        Ok(found.into_iter().next())
    }

    fn decode(&self, run: u32, command: &str) -> Result<()> {
        let command = command.replace("{run}", &run.to_string());
        info!("Decoding run {}: {}", run, command);
        let status = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&self.dir)
            .status()
            .map_err(|e| NoiseError::ExternalIo(format!("cannot launch decoder: {}", e)))?;
        if !status.success() {
            return Err(NoiseError::ExternalIo(format!(
                "decoder for run {} exited with {}",
                run, status
            )));
        }
        Ok(())
    }
}

impl RunFileResolver for DecodedDir {
    fn resolve(&self, run: u32) -> Result<PathBuf> {
        if let Some(path) = self.find(run)? {
            debug!("Run {}: found {}", run, path.display());
            return Ok(path);
        }
        match &self.command {
            Some(command) => {
                self.decode(run, command)?;
                self.find(run)?.ok_or_else(|| {
                    NoiseError::ExternalIo(format!(
                        "decoder produced no file for run {} in {}",
                        run,
                        self.dir.display()
                    ))
                })
            }
            None => Err(NoiseError::ExternalIo(format!(
                "no decoded file for run {} in {} and no decode command",
                run,
                self.dir.display()
            ))),
        }
    }
}
