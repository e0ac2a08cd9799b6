use super::*;
use crate::sketch::Normalization;
use tempfile::tempdir;

#[test]
fn missing_file_loads_defaults() {
    let dir = tempdir().unwrap();
    let config = load_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.sketch.debounce_every, 20);
    assert_eq!(config.model.import_key, "demo-shape-classifier");
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "[canvas]\nnormalization = \"zero_centered\"\n\n[training]\nepochs = 5\n",
    )
    .unwrap();
    let config = load_from(&path).unwrap();
    assert_eq!(config.canvas.normalization, Normalization::ZeroCentered);
    assert_eq!(config.canvas.grid_rows, 28);
    assert_eq!(config.training.epochs, 5);
    assert_eq!(config.training.batch_size, 64);
}

#[test]
fn out_of_range_values_are_clamped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        concat!(
            "[sketch]\ndebounce_every = 0\n\n",
            "[training]\nthread_workers = 0\naccuracy_threshold = 4.0\nlearning_rate = -1.0\n\n",
            "[dataset]\nmin_scale = 0.9\nmax_scale = 0.1\n\n",
            "[model]\nimport_key = \"  \"\n",
        ),
    )
    .unwrap();
    let config = load_from(&path).unwrap();
    assert_eq!(config.sketch.debounce_every, 1);
    assert_eq!(config.training.thread_workers, 1);
    assert_eq!(config.training.accuracy_threshold, 1.0);
    assert!(config.training.learning_rate > 0.0);
    assert!(config.dataset.min_scale <= config.dataset.max_scale);
    assert_eq!(config.model.import_key, "demo-shape-classifier");
}

#[test]
fn save_then_load_preserves_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
    let mut config = AppConfig::default();
    config.canvas.soft_brush = true;
    config.training.metrics_frequency = 7;
    config.model.models_dir = Some(dir.path().join("models"));

    save_to_path(&config, &path).unwrap();
    let loaded = load_from(&path).unwrap();
    assert_eq!(loaded, config);

    let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
    assert_eq!(leftovers, 1, "temp files must not survive a save");
}

#[test]
fn invalid_toml_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[canvas\n").unwrap();
    let err = load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
    assert!(err.to_string().contains(CONFIG_FILE_NAME));
}
