use liquidlight_core::{BeatDetectorConfig, CoreError, EngineConfig, Tier};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("LiquidLight").join("engine.json");

    let mut config = EngineConfig::default();
    config.audio.beat = BeatDetectorConfig::ambient();
    config.audio.trust_beat_hint = true;
    config.performance.quality.target_fps = 30.0;
    config.resource_pool.memory_budget_bytes = 64 * 1024 * 1024;
    config.logging.level = "debug".to_string();
    config.device.is_mobile = true;

    config.save_to(&path).unwrap();
    assert!(path.exists());

    let loaded = EngineConfig::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.json");
    fs::write(
        &path,
        r#"{ "performance": { "tiers": { "step_down_fps": 60.0, "step_up_fps": 30.0 } } }"#,
    )
    .unwrap();

    match EngineConfig::load_from(&path) {
        Err(CoreError::InvalidConfig(msg)) => assert!(msg.contains("step_down_fps")),
        other => panic!("expected InvalidConfig, got {:?}", other),
    }
    assert_eq!(EngineConfig::load_or_default(Some(&path)), EngineConfig::default());
}

#[test]
fn test_tier_names_in_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.json");
    EngineConfig::default().save_to(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"smoothing_alpha\""));
    assert!(text.contains("\"cleanup_threshold\""));
    assert_eq!(serde_json::to_string(&Tier::High).unwrap(), "\"high\"");
}

#[test]
fn test_missing_io_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        EngineConfig::load_from(&dir.path().join("absent.json")),
        Err(CoreError::Io(_))
    ));
}
