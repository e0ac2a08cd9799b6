mod support;

use shape_sketch::app_dirs::APP_DIR_NAME;
use shape_sketch::artifacts::ArtifactStore;
use shape_sketch::config::{self, AppConfig, ModelSettings};
use shape_sketch::egui_app::ShapeSketchApp;
use support::config_env::ConfigHomeGuard;

#[test]
fn config_round_trips_through_overridden_home() {
    let temp = tempfile::tempdir().expect("create tempdir");
    let _env = ConfigHomeGuard::set(temp.path().to_path_buf());

    let path = config::config_path().expect("config path");
    assert_eq!(path, temp.path().join(APP_DIR_NAME).join("config.toml"));
    assert_eq!(config::load_or_default().expect("defaults"), AppConfig::default());

    let mut custom = AppConfig::default();
    custom.sketch.debounce_every = 5;
    custom.training.epochs = 12;
    custom.model.import_key = "my-shapes".to_string();
    config::save(&custom).expect("save config");
    assert!(path.is_file());
    assert_eq!(config::load_or_default().expect("load config"), custom);
}

#[test]
fn artifact_store_defaults_to_app_models_dir() {
    let temp = tempfile::tempdir().expect("create tempdir");
    let _env = ConfigHomeGuard::set(temp.path().to_path_buf());

    let store = ArtifactStore::from_settings(&ModelSettings::default()).expect("store");
    assert_eq!(store.dir(), temp.path().join(APP_DIR_NAME).join("models"));
    assert!(store.dir().is_dir());

    let custom = temp.path().join("elsewhere");
    let settings = ModelSettings {
        models_dir: Some(custom.clone()),
        ..ModelSettings::default()
    };
    let store = ArtifactStore::from_settings(&settings).expect("store");
    assert_eq!(store.dir(), custom);
}

#[test]
fn app_starts_without_a_model() {
    let temp = tempfile::tempdir().expect("create tempdir");
    let _env = ConfigHomeGuard::set(temp.path().to_path_buf());

    assert!(ShapeSketchApp::new(&AppConfig::default()).is_ok());
}
