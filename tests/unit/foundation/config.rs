use super::*;

#[test]
fn defaults_validate() {
    let cfg = ReelConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.card_frames(), 150);
    assert_eq!(cfg.fps().unwrap().as_f64(), 30.0);
}

#[test]
fn partial_json_keeps_defaults() {
    let cfg: ReelConfig =
        serde_json::from_str(r#"{ "fps": 24, "card": { "song_max_chars": 30 } }"#).unwrap();
    assert_eq!(cfg.fps, 24);
    assert_eq!(cfg.card.song_max_chars, 30);
    assert_eq!(cfg.card.artist_max_chars, 25);
    assert_eq!(cfg.timeline.slide_duration_s, 0.8);
    assert_eq!(cfg.loudness.integrated_lufs, -16.0);
}

#[test]
fn validation_catches_bad_values() {
    let mut cfg = ReelConfig::default();
    cfg.fade_s = 3.0;
    assert!(cfg.validate().is_err());

    let mut cfg = ReelConfig::default();
    cfg.fps = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = ReelConfig::default();
    cfg.background.darken = 0.0;
    assert!(cfg.validate().is_err());

    let mut cfg = ReelConfig::default();
    cfg.threading.threads = Some(0);
    assert!(cfg.validate().is_err());

    let mut cfg = ReelConfig::default();
    cfg.card.width = 2000;
    assert!(cfg.validate().is_err());
}

#[test]
fn narration_template_substitutes_title() {
    let intro = IntroConfig::default();
    assert_eq!(
        intro.narration_text("Top 5 Rock Anthems"),
        "Here is the Top 5 Rock Anthems. Let's go!"
    );
}

#[test]
fn load_reads_json_file() {
    let dir = PathBuf::from("target").join("config_load");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cfg.json");
    std::fs::write(&path, r#"{ "card_duration_s": 6.0 }"#).unwrap();

    let cfg = ReelConfig::load(&path).unwrap();
    assert_eq!(cfg.card_duration_s, 6.0);
    assert_eq!(cfg.card_frames(), 180);

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(ReelConfig::load(&path), Err(ReelError::Serde(_))));
}
