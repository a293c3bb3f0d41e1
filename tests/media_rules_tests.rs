// Cross-crate checks for the media and configuration rules the HTTP
// surface relies on

use roadwatch_core::media::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use roadwatch_core::{AppConfig, MediaKind, StoredUpload};

#[test]
fn test_upload_names_are_unique_per_request() {
    let a = StoredUpload::for_original("pothole.png").unwrap();
    let b = StoredUpload::for_original("pothole.png").unwrap();

    assert_ne!(a.id, b.id);
    assert_ne!(a.upload_name, b.upload_name);
    assert_ne!(a.output_name, b.output_name);
}

#[test]
fn test_media_kind_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&MediaKind::Image).unwrap(), "\"image\"");
    assert_eq!(serde_json::to_string(&MediaKind::Video).unwrap(), "\"video\"");
}

#[test]
fn test_hostile_filenames_become_safe_single_components() {
    let stored = StoredUpload::for_original("../../etc/cron.d/evil.png").unwrap();

    assert!(!stored.upload_name.contains('/'));
    assert!(!stored.upload_name.contains(".."));
    assert!(stored.upload_name.ends_with("evil.png"));
}

#[test]
fn test_every_accepted_extension_round_trips_through_naming() {
    for ext in IMAGE_EXTENSIONS {
        let stored = StoredUpload::for_original(&format!("road.{}", ext)).unwrap();
        assert_eq!(stored.kind, MediaKind::Image);
        assert!(stored.output_name.ends_with(&format!(".{}", ext)));
    }

    // video results are always re-encoded as mp4
    for ext in VIDEO_EXTENSIONS {
        let stored = StoredUpload::for_original(&format!("dash.{}", ext)).unwrap();
        assert_eq!(stored.kind, MediaKind::Video);
        assert!(stored.output_name.ends_with(".mp4"));
    }
}

#[test]
fn test_json_config_is_accepted() {
    let config = AppConfig::from_str(
        r#"{"server": {"host": "127.0.0.1", "port": 9000, "log_level": "debug"}}"#,
    )
    .unwrap();

    assert_eq!(config.server.port, 9000);
    // untouched sections keep their defaults
    assert_eq!(config.model.class_names, vec!["pothole".to_string()]);
    assert_eq!(config.paths.output_dir, "outputs");
}

#[test]
fn test_config_file_then_env_layering() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roadwatch.toml");
    std::fs::write(
        &path,
        "[server]\nhost = \"0.0.0.0\"\nport = 6100\nlog_level = \"info\"\n",
    )
    .unwrap();

    let mut config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.server.port, 6100);

    // environment wins over the file
    std::env::set_var("ROADWATCH_PORT", "6200");
    config.apply_env();
    std::env::remove_var("ROADWATCH_PORT");

    assert_eq!(config.server.port, 6200);
    assert!(config.validate().is_ok());
}
