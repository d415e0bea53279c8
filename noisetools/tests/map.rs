use noisetools::map::{self, ChannelMap, ChannelMapper, MapEntry, TableMapper};
use noisetools::{NoiseError, Result};
use std::fs;

mod common;

fn entry(id: u32, local: u32, crate_label: &str) -> MapEntry {
    MapEntry { id, local, crate_label: crate_label.to_string() }
}

#[test]
fn save_load() {
    let dir = common::scratch_dir("map-save");
    let path = dir.join("ChannelMap_Test.csv");
    let map = ChannelMap::new(vec![entry(7, 0, "WE05"), entry(8, 65, "WE05"), entry(9, 3, "EE01T")]);
    map.save(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("fID,fChannel,fCrate"));
    let loaded = ChannelMap::load(&path).unwrap();
    assert_eq!(loaded, map);
    assert_eq!(loaded.get(8).unwrap().local, 65);
}

#[test]
fn lookup() {
    let map = ChannelMap::new(vec![entry(7, 0, "WE05"), entry(9, 3, "EE01T"), entry(8, 65, "WE05")]);
    assert_eq!(map.len(), 3);
    assert_eq!(map.get(9).unwrap().crate_label, "EE01T");
    assert!(matches!(map.get(10), Err(NoiseError::MissingMapEntry { channel: 10 })));
    assert_eq!(map.crates_of(&[8, 9, 7]).unwrap(), vec!["WE05", "EE01T"]);
}

#[test]
fn first_duplicate_wins() {
    let map = ChannelMap::new(vec![entry(7, 0, "WE05"), entry(7, 1, "WW06")]);
    assert_eq!(map.get(7).unwrap().crate_label, "WE05");
    assert_eq!(map::duplicates(&[3, 7, 7, 1, 3, 7]), vec![(3, 2), (7, 3)]);
}

#[test]
fn build_with_closure() {
    let mapper = |c: u32| -> Result<(String, u32)> { Ok((format!("EW{:02}", c / 576 + 2), c % 576)) };
    let map = ChannelMap::build(&[0, 577], &mapper).unwrap();
    assert_eq!(map.get(577).unwrap(), &entry(577, 1, "EW03"));
}

#[test]
fn cached_map_skips_mapper() {
    let dir = common::scratch_dir("map-cache");
    let path = dir.join("ChannelMap_Cached.csv");
    let built = ChannelMap::load_or_build(&path, &[1, 2], || {
        Ok(|c: u32| -> Result<(String, u32)> { Ok((String::from("WW10"), c)) })
    })
    .unwrap();
    assert!(path.exists());

    let cached = ChannelMap::load_or_build(&path, &[1, 2], || -> Result<TableMapper> {
        panic!("mapper created for a cached map")
    })
    .unwrap();
    assert_eq!(built, cached);
}

fn write_tables(dir: &std::path::Path) {
    fs::write(
        dir.join("daq_channels.csv"),
        "channel_id,readout_board_id,readout_board_slot,channel_number\n\
         100,B7,0,5\n\
         101,B7,2,63\n\
         102,B9,1,0\n\
         103,B404,0,0\n",
    )
    .unwrap();
    fs::write(
        dir.join("readout_boards.csv"),
        "readout_board_id,flange_id\nB7,F1\nB9,F2\n",
    )
    .unwrap();
    fs::write(
        dir.join("flanges.csv"),
        "flange_id,flange_pos_at_chimney\nF1,EE01B\nF2,WW20T\n",
    )
    .unwrap();
}

#[test]
fn hardware_tables() {
    let dir = common::scratch_dir("map-tables");
    write_tables(&dir);
    let mapper = TableMapper::from_dir(&dir).unwrap();
    assert_eq!(mapper.resolve(100).unwrap(), (String::from("EE01B"), 5));
    assert_eq!(mapper.resolve(101).unwrap(), (String::from("EE01B"), 191));
    assert_eq!(mapper.resolve(102).unwrap(), (String::from("WW20T"), 64));
    assert!(matches!(mapper.resolve(999), Err(NoiseError::MissingMapEntry { channel: 999 })));
    // Board without a flange row
    assert!(matches!(mapper.resolve(103), Err(NoiseError::ExternalIo(_))));

    let map = ChannelMap::build(&[102, 100], &mapper).unwrap();
    assert_eq!(map.crates_of(&[102, 100]).unwrap(), vec!["WW20T", "EE01B"]);
}

#[test]
fn missing_hardware_table() {
    let dir = common::scratch_dir("map-missing");
    assert!(matches!(TableMapper::from_dir(&dir), Err(NoiseError::ExternalIo(_))));
}
