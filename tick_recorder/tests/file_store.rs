use std::fs;
use std::time::Duration;

use tick_common::{EngineConfig, Tick};
use tick_recorder::{PersistenceEngine, SinkDriver};
use url::Url;

#[test]
fn engine_writes_jsonl_through_driver() {
    let dir = tempfile::tempdir().unwrap();
    let address = Url::from_directory_path(dir.path()).unwrap().to_string();
    let driver = SinkDriver::init().unwrap();

    let mut engine = PersistenceEngine::new(64, Duration::from_secs(5));
    assert!(engine.initialize(&driver, EngineConfig::new("ftp://nowhere", "md")).is_err());
    engine
        .initialize(&driver, EngineConfig::new(&address, "md"))
        .unwrap();
    engine.start().unwrap();

    for (instrument, destination, volume) in [
        ("IF2012", "cffex", 10),
        ("IF2012", "cffex", 0),
        ("rb2101", "shfe", 3),
        ("IF2012", "cffex", 12),
    ] {
        let mut tick = Tick::new(instrument, destination);
        tick.volume = volume;
        engine.enqueue(tick).unwrap();
    }
    let stats = engine.stop().unwrap();
    drop(engine);
    drop(driver);

    assert_eq!(stats.written, 3);
    let cffex = fs::read_to_string(dir.path().join("md").join("cffex.jsonl")).unwrap();
    let volumes: Vec<i64> = cffex
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["volume"].as_i64().unwrap())
        .collect();
    assert_eq!(volumes, vec![10, 12]);

    let shfe = fs::read_to_string(dir.path().join("md").join("shfe.jsonl")).unwrap();
    assert_eq!(shfe.lines().count(), 1);
    assert!(shfe.contains("\"recordTime\""));
}
