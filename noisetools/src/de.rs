//! Deserialization of decoded waveforms, spectra and tables

use crate::error::{NoiseError, Result, Stage};
use crate::Bin;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::vec::Vec;
use zstd::stream;

/// Reader over a decoded waveform file
pub type WaveformReader = csv::Reader<stream::read::Decoder<'static, BufReader<File>>>;

/// One (event, channel) record of a decoded waveform file
#[derive(Clone, Debug, PartialEq)]
pub struct WaveformRecord {
    pub event: u64,
    pub channel: u32,
    pub producer: String,
    pub samples: Vec<i16>,
}

/// Open a decoded waveform file: zstd-compressed tab-separated records of
/// `event, channel, producer, samples...`
///
/// Files may be the concatenation of several compressed streams (one per
/// event, say); the decoder reads through them as one.
pub fn waveform_file(path: &Path) -> Result<WaveformReader> {
    let f = File::open(path)?;
    let zrdr = stream::read::Decoder::new(f)?;
    Ok(waveform_reader(zrdr))
}

/// Tab-separated waveform reader over already-decompressed input
pub fn waveform_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(rdr)
}

/// Parse the leading `event, channel, producer` fields of a record
pub fn waveform_header(record: &csv::StringRecord) -> Result<(u64, u32, &str)> {
    if record.len() < 3 {
        return Err(NoiseError::invalid(
            Stage::Source,
            format!("waveform record with {} fields", record.len()),
        ));
    }
    let event = record[0]
        .parse::<u64>()
        .map_err(|e| NoiseError::invalid(Stage::Source, format!("event '{}': {}", &record[0], e)))?;
    let channel = record[1]
        .parse::<u32>()
        .map_err(|e| NoiseError::invalid(Stage::Source, format!("channel '{}': {}", &record[1], e)))?;
    Ok((event, channel, &record[2]))
}

/// Parse the ADC samples trailing the header of a record
pub fn waveform_samples(record: &csv::StringRecord) -> Result<Vec<i16>> {
    record
        .iter()
        .skip(3)
        .map(|s| {
            s.parse::<i16>()
                .map_err(|e| NoiseError::invalid(Stage::Source, format!("sample '{}': {}", s, e)))
        })
        .collect()
}

/// Deserialize every waveform record
pub fn waveforms(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<WaveformRecord>> {
    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let (event, channel, producer) = waveform_header(&record)?;
        records.push(WaveformRecord {
            event,
            channel,
            producer: producer.to_string(),
            samples: waveform_samples(&record)?,
        });
    }
    Ok(records)
}

/// Deserialize a headed comma-separated table into rows of `T`
pub fn table<T: DeserializeOwned>(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<T>> {
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// Deserialize a headed comma-separated table file
pub fn table_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path)?;
    table(&mut rdr)
}

/// Deserialize a tab-separated spectrum of (MHz, power) records.
/// Lines that don't parse, like a header, are skipped.
pub fn spectrum_tsv(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<Bin>> {
    let mut bins: Vec<Bin> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() < 2 {
            continue;
        }
        if let (Ok(freq), Ok(power)) = (record[0].parse::<f64>(), record[1].parse::<f64>()) {
            bins.push(Bin { freq, power });
        }
    }
    Ok(bins)
}
