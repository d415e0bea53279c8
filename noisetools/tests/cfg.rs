use noisetools::cfg::Config;
use noisetools::NoiseError;
use std::path::PathBuf;

const FULL: &str = r#"
Analysis:
  Events: 50
  fLow: 1
  fHigh: 800
  SNIP:
    Iterations: 30
    ApplyLLS: false
Data:
  Runs:
    5300: ChannelMap_East
    5301: ChannelMap_West
  AnalyzedRuns: [5100, 5200]
Path:
  DAQName_Raw: daq
  DAQName_Uncor: daq:Cor
  Images: images/
  Decoded: decoded/
  DecodeCommand: "lar -c decode.fcl -s run{run}.root"
  Maps: maps/
  HardwareTables: hw/
Miscellaneous:
  LogPath: logs/
  LogName: noise.log
SVGHeatmap:
  Columns: [fPow, fRatio]
  ZMin: [0, 0]
  ZMax: [10000, 50]
  BarLabel: ["Peak Power", "Peak Ratio"]
  Gradient: viridis
  SVGBase: TPCBase
"#;

#[test]
fn de_full() {
    let config = Config::from_yaml(FULL).unwrap();
    assert_eq!(config.analysis.events, 50);
    assert_eq!(config.analysis.f_high, 800.0);
    assert_eq!(config.analysis.snip.iterations, 30);
    assert!(!config.analysis.snip.apply_lls);
    // Unset SNIP keys keep their defaults
    assert_eq!(config.analysis.snip.protect_range, 100);
    assert_eq!(config.data.runs.len(), 2);
    assert_eq!(config.data.runs[1], (5301, String::from("ChannelMap_West")));
    assert_eq!(config.data.analyzed_runs, vec![5100, 5200]);
    assert_eq!(config.path.daq_name_uncor, "daq:Cor");
    assert_eq!(config.path.hardware_tables, Some(PathBuf::from("hw/")));
    let heatmap = config.svg_heatmap.as_ref().unwrap();
    assert_eq!(heatmap.columns, vec!["fPow", "fRatio"]);
    assert_eq!(heatmap.empty_color, "255,255,255");

    assert_eq!(config.map_path("ChannelMap_East"), PathBuf::from("maps/ChannelMap_East.csv"));
    assert_eq!(config.crate_table_path(5300), PathBuf::from("images/Run5300Power.csv"));
    assert_eq!(config.log_file(), PathBuf::from("logs/noise.log"));
}

#[test]
fn de_minimal() {
    let yaml = r#"
        Analysis:
          Events: 5
        Data:
          Runs:
            1: Map
        Path:
          DAQName_Raw: raw
          DAQName_Uncor: uncor
    "#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.analysis.f_low, 1.0);
    assert_eq!(config.analysis.f_high, 800.0);
    assert!(config.analysis.snip.apply_lls);
    assert!(config.data.analyzed_runs.is_empty());
    assert_eq!(config.path.decode_command, None);
    assert_eq!(config.miscellaneous.log_name, "noise.log");
    assert!(config.svg_heatmap.is_none());
}

#[test]
fn serde_roundtrip() {
    let config = Config::from_yaml(FULL).unwrap();
    let ser = serde_yaml::to_string(&config).unwrap();
    let de = Config::from_yaml(&ser).unwrap();
    assert_eq!(config, de);
}

#[test]
fn heatmap_lists_must_match() {
    let yaml = FULL.replace("ZMax: [10000, 50]", "ZMax: [10000]");
    match Config::from_yaml(&yaml) {
        Err(NoiseError::Config(msg)) => assert!(msg.contains("SVGHeatmap")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn missing_section() {
    let yaml = "Analysis:\n  Events: 5\n";
    assert!(matches!(Config::from_yaml(yaml), Err(NoiseError::Yaml(_))));
}

#[test]
fn runs_keep_file_order() {
    let yaml = FULL.replace(
        "    5300: ChannelMap_East\n    5301: ChannelMap_West\n",
        "    5301: ChannelMap_West\n    5300: ChannelMap_East\n    4999: ChannelMap_East\n",
    );
    let config = Config::from_yaml(&yaml).unwrap();
    let runs: Vec<u32> = config.data.runs.iter().map(|(run, _)| *run).collect();
    assert_eq!(runs, vec![5301, 5300, 4999]);
    let de = Config::from_yaml(&serde_yaml::to_string(&config).unwrap()).unwrap();
    assert_eq!(de.data.runs, config.data.runs);
}

#[test]
fn repeated_run() {
    let yaml = FULL.replace("    5301: ChannelMap_West\n", "    5301: ChannelMap_West\n    5300: ChannelMap_West\n");
    assert!(Config::from_yaml(&yaml).is_err());
}
