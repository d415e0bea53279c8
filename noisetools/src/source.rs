//! Sources of raw digitized waveforms, one matrix of channels x ticks per event

use crate::de::{self, WaveformReader};
use crate::error::{NoiseError, Result, Stage};
use crate::{Waveforms, CHANNEL_SENTINEL};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Access to the waveforms of a run, event by event.
///
/// The channel list is fixed for the whole run and already excludes IDs above
/// [`CHANNEL_SENTINEL`]; row `i` of every event belongs to `channels()[i]`.
pub trait WaveformSource {
    fn num_events(&self) -> usize;
    fn num_ticks(&self) -> usize;
    fn channels(&self) -> &[u32];
    fn waveforms(&self, event: usize) -> Result<Waveforms>;

    fn num_channels(&self) -> usize {
        self.channels().len()
    }
}

/// Which rows of a channel list survive the sentinel
fn sentinel_mask(channels: &[u32]) -> Vec<bool> {
    let mask: Vec<bool> = channels.iter().map(|&c| c <= CHANNEL_SENTINEL).collect();
    let masked = mask.iter().filter(|&&keep| !keep).count();
    debug!("There are {} masked channels.", masked);
    mask
}

fn check_shape(waveforms: &Waveforms, n_channels: usize, n_ticks: usize, event: usize) -> Result<()> {
    if waveforms.len() != n_channels {
        return Err(NoiseError::invalid(
            Stage::Source,
            format!("event {} has {} waveforms for {} channels", event, waveforms.len(), n_channels),
        ));
    }
    if let Some(i) = waveforms.iter().position(|w| w.len() != n_ticks) {
        return Err(NoiseError::invalid(
            Stage::Source,
            format!("event {} row {} has {} ticks, expected {}", event, i, waveforms[i].len(), n_ticks),
        ));
    }
    Ok(())
}

/// Waveforms held in memory, e.g. synthesized or already loaded
#[derive(Clone, Debug)]
pub struct MemorySource {
    channels: Vec<u32>,
    n_ticks: usize,
    events: Vec<Waveforms>,
}

impl MemorySource {
    /// Rows of each event follow `channels`; rows of sentinel channels are
    /// dropped and ragged events are rejected.
    pub fn new(channels: Vec<u32>, events: Vec<Waveforms>) -> Result<Self> {
        let mask = sentinel_mask(&channels);
        let n_ticks = events
            .first()
            .and_then(|e| e.first())
            .map(|w| w.len())
            .unwrap_or(0);
        let mut kept_events = Vec::with_capacity(events.len());
        for (i, event) in events.into_iter().enumerate() {
            check_shape(&event, channels.len(), n_ticks, i)?;
            kept_events.push(
                event
                    .into_iter()
                    .zip(mask.iter())
                    .filter_map(|(w, &keep)| if keep { Some(w) } else { None })
                    .collect(),
            );
        }
        let channels = channels
            .into_iter()
            .zip(mask.iter())
            .filter_map(|(c, &keep)| if keep { Some(c) } else { None })
            .collect();
        Ok(MemorySource { channels, n_ticks, events: kept_events })
    }
}

impl WaveformSource for MemorySource {
    fn num_events(&self) -> usize {
        self.events.len()
    }

    fn num_ticks(&self) -> usize {
        self.n_ticks
    }

    fn channels(&self) -> &[u32] {
        &self.channels
    }

    fn waveforms(&self, event: usize) -> Result<Waveforms> {
        self.events.get(event).cloned().ok_or_else(|| {
            NoiseError::invalid(
                Stage::Source,
                format!("event {} requested of {}", event, self.events.len()),
            )
        })
    }
}

/// Position of a forward-only pass through a waveform file
struct Cursor {
    rdr: WaveformReader,
    /// Index of the next event the reader will reach
    next: usize,
    /// First record of `next`, already read off the stream
    pending: Option<csv::StringRecord>,
}

/// Decoded waveform file for one producer (raw digits, coherent-noise
/// removed digits, ...).
///
/// Opening the file makes one pass to index events and channels. Events are
/// then streamed on demand: reading them in increasing order costs a single
/// pass over the file, going backwards reopens it.
pub struct WaveformFile {
    path: PathBuf,
    producer: String,
    events: Vec<u64>,
    channels: Vec<u32>,
    n_ticks: usize,
    cursor: Mutex<Option<Cursor>>,
}

impl WaveformFile {
    pub fn open(path: &Path, producer: &str) -> Result<Self> {
        let mut rdr = de::waveform_file(path)?;
        let mut events: Vec<u64> = Vec::new();
        let mut lists: Vec<Vec<u32>> = Vec::new();
        let mut n_ticks = None;
        for result in rdr.records() {
            let record = result?;
            let (event, channel, prod) = de::waveform_header(&record)?;
            if prod != producer {
                continue;
            }
            match events.last().copied() {
                Some(last) if last == event => {}
                Some(last) if last > event => {
                    return Err(NoiseError::invalid(
                        Stage::Source,
                        format!("{}: event {} follows event {}", path.display(), event, last),
                    ))
                }
                _ => {
                    events.push(event);
                    lists.push(Vec::new());
                }
            }
            let ticks = record.len() - 3;
            match n_ticks {
                None => n_ticks = Some(ticks),
                Some(n) if n != ticks => {
                    return Err(NoiseError::invalid(
                        Stage::Source,
                        format!("{}: channel {} of event {} has {} ticks, expected {}", path.display(), channel, event, ticks, n),
                    ))
                }
                _ => {}
            }
            if let Some(list) = lists.last_mut() {
                list.push(channel);
            }
        }

        let full_list = lists.first().cloned().unwrap_or_default();
        if let Some(i) = lists.iter().position(|l| *l != full_list) {
            return Err(NoiseError::invalid(
                Stage::Source,
                format!("{}: event {} has a different channel list than event {}", path.display(), events[i], events[0]),
            ));
        }
        let mask = sentinel_mask(&full_list);
        let channels = full_list
            .into_iter()
            .zip(mask)
            .filter_map(|(c, keep)| if keep { Some(c) } else { None })
            .collect::<Vec<u32>>();
        debug!(
            "{}: producer {} has {} events of {} channels",
            path.display(),
            producer,
            events.len(),
            channels.len(),
        );

        Ok(WaveformFile {
            path: path.to_path_buf(),
            producer: producer.to_string(),
            events,
            channels,
            n_ticks: n_ticks.unwrap_or(0),
            cursor: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }
}

impl WaveformSource for WaveformFile {
    fn num_events(&self) -> usize {
        self.events.len()
    }

    fn num_ticks(&self) -> usize {
        self.n_ticks
    }

    fn channels(&self) -> &[u32] {
        &self.channels
    }

    fn waveforms(&self, event: usize) -> Result<Waveforms> {
        let target = *self.events.get(event).ok_or_else(|| {
            NoiseError::invalid(
                Stage::Source,
                format!("event {} requested of {}", event, self.events.len()),
            )
        })?;

        let mut guard = self.cursor.lock();
        let mut cursor = match guard.take() {
            Some(c) if c.next <= event => c,
            _ => Cursor {
                rdr: de::waveform_file(&self.path)?,
                next: 0,
                pending: None,
            },
        };

        let mut waveforms = Waveforms::with_capacity(self.channels.len());
        let mut record = csv::StringRecord::new();
        loop {
            let have = match cursor.pending.take() {
                Some(r) => {
                    record = r;
                    true
                }
                None => cursor.rdr.read_record(&mut record)?,
            };
            if !have {
                break;
            }
            let (id, channel, prod) = de::waveform_header(&record)?;
            if prod != self.producer || id < target {
                continue;
            }
            if id > target {
                cursor.pending = Some(record.clone());
                break;
            }
            if channel <= CHANNEL_SENTINEL {
                waveforms.push(de::waveform_samples(&record)?);
            }
        }
        cursor.next = event + 1;
        *guard = Some(cursor);

        check_shape(&waveforms, self.channels.len(), self.n_ticks, event)?;
        Ok(waveforms)
    }
}
