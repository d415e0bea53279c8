use noisescan::record::{RunRecord, RunSummary};
use std::env;
use std::fs;
use std::path::PathBuf;

#[test]
fn save_beside_config() {
    let dir = env::temp_dir().join(format!("noisescan-record-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    let mut record = RunRecord::new("v1.0.0", &dir.join("TPCConfig.yaml"));
    record.runs.push(RunSummary {
        run: 5300,
        map: String::from("ChannelMap_East"),
        waveforms: PathBuf::from("decoded/run5300_1_x-decode.wfm.zst"),
        channels: 576,
        crates: 1,
    });
    record.outputs.push(PathBuf::from("FullPower.csv"));

    let first = record.save().unwrap();
    let second = record.save().unwrap();
    assert_ne!(first, second);
    assert!(first.file_name().unwrap().to_string_lossy().starts_with("TPCConfig_"));

    let text = fs::read_to_string(&first).unwrap();
    let back: RunRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(back, record);
}
