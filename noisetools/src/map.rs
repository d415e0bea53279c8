//! Channel map: which mini-crate, and which slot on it, each DAQ channel is
//!
//! Querying the hardware database is far too slow to do per lookup, so a map
//! is built once per run configuration and cached as a CSV file
//! (`fID,fChannel,fCrate`) for every later lookup.

use crate::error::{NoiseError, Result};
use crate::{de, ser, BOARD_CHANNELS};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// One row of the channel map
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MapEntry {
    /// DAQ channel ID
    #[serde(rename = "fID")]
    pub id: u32,
    /// Channel number local to the mini-crate (0-575)
    #[serde(rename = "fChannel")]
    pub local: u32,
    /// Mini-crate label, e.g. `WE05`
    #[serde(rename = "fCrate")]
    pub crate_label: String,
}

/// Resolves a DAQ channel to its mini-crate and crate-local channel number
pub trait ChannelMapper {
    fn resolve(&self, channel: u32) -> Result<(String, u32)>;
}

impl<F> ChannelMapper for F
where
    F: Fn(u32) -> Result<(String, u32)>,
{
    fn resolve(&self, channel: u32) -> Result<(String, u32)> {
        self(channel)
    }
}

/// IDs that appear more than once, with their counts
pub fn duplicates(ids: &[u32]) -> Vec<(u32, usize)> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for &id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts.into_iter().filter(|&(_, c)| c > 1).collect()
}

/// Channel-ID keyed lookup table, in the order rows were added
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelMap {
    entries: Vec<MapEntry>,
    index: HashMap<u32, usize>,
}

impl ChannelMap {
    /// Duplicate IDs are reported; the first row of an ID is the one looked up.
    pub fn new(entries: Vec<MapEntry>) -> Self {
        let ids: Vec<u32> = entries.iter().map(|e| e.id).collect();
        let dups = duplicates(&ids);
        if !dups.is_empty() {
            warn!("Duplicate channels in map: {:?}", dups);
        }
        let mut index = HashMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            index.entry(e.id).or_insert(i);
        }
        ChannelMap { entries, index }
    }

    /// Resolve every channel of `ids` through `mapper`
    pub fn build(ids: &[u32], mapper: &dyn ChannelMapper) -> Result<Self> {
        info!("Beginning map construction for {} channels", ids.len());
        let mut entries = Vec::with_capacity(ids.len());
        for &id in ids {
            let (crate_label, local) = mapper.resolve(id)?;
            entries.push(MapEntry { id, local, crate_label });
        }
        info!("Finished map construction");
        Ok(ChannelMap::new(entries))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let entries: Vec<MapEntry> = de::table_file(path)?;
        debug!("Loaded channel map {} with {} rows", path.display(), entries.len());
        Ok(ChannelMap::new(entries))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ser::table_file(path, &self.entries)?;
        debug!("Wrote channel map {}", path.display());
        Ok(())
    }

    /// Read the cached map at `path`, or build it for `ids` with the mapper
    /// from `mapper` and cache it. The mapper is only created on a miss.
    pub fn load_or_build<M, F>(path: &Path, ids: &[u32], mapper: F) -> Result<Self>
    where
        M: ChannelMapper,
        F: FnOnce() -> Result<M>,
    {
        if path.exists() {
            return ChannelMap::load(path);
        }
        let map = ChannelMap::build(ids, &mapper()?)?;
        map.save(path)?;
        Ok(map)
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, channel: u32) -> Result<&MapEntry> {
        self.index
            .get(&channel)
            .map(|&i| &self.entries[i])
            .ok_or(NoiseError::MissingMapEntry { channel })
    }

    /// Distinct crates of `channels`, in order of first appearance
    pub fn crates_of(&self, channels: &[u32]) -> Result<Vec<String>> {
        let labels = channels
            .iter()
            .map(|&c| self.get(c).map(|e| e.crate_label.clone()))
            .collect::<Result<Vec<String>>>()?;
        Ok(labels.into_iter().unique().collect())
    }
}

#[derive(Deserialize, Debug)]
struct DaqChannel {
    channel_id: u32,
    readout_board_id: String,
    readout_board_slot: u32,
    channel_number: u32,
}

#[derive(Deserialize, Debug)]
struct ReadoutBoard {
    readout_board_id: String,
    flange_id: String,
}

#[derive(Deserialize, Debug)]
struct Flange {
    flange_id: String,
    flange_pos_at_chimney: String,
}

/// Mapper over an offline export of the hardware database.
///
/// The information is spread across three tables: `daq_channels.csv` gives
/// the readout board of a channel and its slot, `readout_boards.csv` the
/// flange of the board, and `flanges.csv` the flange position at the chimney,
/// which is the mini-crate label. Each board carries 64 channels, so the
/// crate-local channel is `slot * 64 + channel_number`.
#[derive(Debug, Default)]
pub struct TableMapper {
    channels: HashMap<u32, DaqChannel>,
    boards: HashMap<String, String>,
    flanges: HashMap<String, String>,
}

impl TableMapper {
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let open = |name: &str| {
            let path = dir.join(name);
            if path.exists() {
                Ok(path)
            } else {
                Err(NoiseError::ExternalIo(format!("hardware table {} not found", path.display())))
            }
        };
        let channels: Vec<DaqChannel> = de::table_file(&open("daq_channels.csv")?)?;
        let boards: Vec<ReadoutBoard> = de::table_file(&open("readout_boards.csv")?)?;
        let flanges: Vec<Flange> = de::table_file(&open("flanges.csv")?)?;
        debug!(
            "Hardware tables: {} channels, {} boards, {} flanges",
            channels.len(),
            boards.len(),
            flanges.len(),
        );
        Ok(TableMapper {
            channels: channels.into_iter().map(|c| (c.channel_id, c)).collect(),
            boards: boards.into_iter().map(|b| (b.readout_board_id, b.flange_id)).collect(),
            flanges: flanges.into_iter().map(|f| (f.flange_id, f.flange_pos_at_chimney)).collect(),
        })
    }
}

impl ChannelMapper for TableMapper {
    fn resolve(&self, channel: u32) -> Result<(String, u32)> {
        let daq = self
            .channels
            .get(&channel)
            .ok_or(NoiseError::MissingMapEntry { channel })?;
        let flange = self.boards.get(&daq.readout_board_id).ok_or_else(|| {
            NoiseError::ExternalIo(format!(
                "readout board {} of channel {} has no flange",
                daq.readout_board_id, channel
            ))
        })?;
        let crate_label = self.flanges.get(flange).ok_or_else(|| {
            NoiseError::ExternalIo(format!("flange {} of channel {} has no position", flange, channel))
        })?;
        Ok((
            crate_label.clone(),
            daq.readout_board_slot * BOARD_CHANNELS + daq.channel_number,
        ))
    }
}
