//! Serialization of decoded waveforms, spectra and tables

use crate::error::Result;
use crate::de::WaveformRecord;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zstd::stream;

/// Tab-separated waveform writer
pub fn waveform_writer<W: Write>(wtr: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(wtr)
}

/// Serialize one event of one producer as tab-separated records
pub fn waveforms<W: Write>(
    wtr: &mut csv::Writer<W>,
    event: u64,
    producer: &str,
    channels: &[u32],
    waveforms: &[Vec<i16>],
) -> Result<()> {
    for (channel, samples) in channels.iter().zip(waveforms.iter()) {
        let mut record = Vec::with_capacity(samples.len() + 3);
        record.push(event.to_string());
        record.push(channel.to_string());
        record.push(producer.to_string());
        record.extend(samples.iter().map(|s| s.to_string()));
        wtr.write_record(&record)?;
    }
    Ok(())
}

/// Serialize already-parsed records
pub fn waveform_records<W: Write>(wtr: &mut csv::Writer<W>, records: &[WaveformRecord]) -> Result<()> {
    for r in records {
        waveforms(wtr, r.event, &r.producer, &[r.channel], std::slice::from_ref(&r.samples))?;
    }
    Ok(())
}

/// Compress tab-separated waveform text into the decoded file format
///
/// Like many compressors, `zstd`'s API is linear under concatenation, so
/// compressing events one call at a time into the same file yields a file
/// that decompresses to the concatenated text.
pub fn compress(wtr: &mut impl Write, text: &[u8]) -> Result<()> {
    let mut zwtr = stream::write::Encoder::new(wtr, 0)?;
    zwtr.write_all(text)?;
    zwtr.finish()?;
    Ok(())
}

/// Write a whole decoded waveform file from parsed records
pub fn waveform_file(path: &Path, records: &[WaveformRecord]) -> Result<()> {
    let mut text = waveform_writer(Vec::new());
    waveform_records(&mut text, records)?;
    let text = text.into_inner().map_err(|e| e.into_error())?;
    let mut f = File::create(path)?;
    compress(&mut f, &text)?;
    Ok(())
}

/// Serialize rows of `T` as a headed comma-separated table
pub fn table<W: Write, T: Serialize>(wtr: &mut csv::Writer<W>, rows: &[T]) -> Result<()> {
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize rows of `T` to a headed comma-separated table file
pub fn table_file<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    table(&mut wtr, rows)
}

/// Serialize a spectrum to tab-separated values (MHz, power).
pub fn spectrum_tsv<W: Write>(wtr: &mut csv::Writer<W>, freq: &[f64], power: &[f64]) -> Result<()> {
    for (f, p) in freq.iter().zip(power.iter()) {
        wtr.write_record(&[f.to_string(), p.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}
