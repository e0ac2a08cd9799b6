//! Headless trainer: builds the generated shape dataset, trains the MLP and
//! stores the artifact so the app's import action can load it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shape_sketch::artifacts::{ArtifactStore, DEMO_MODEL_KEY};
use shape_sketch::config::{self, AppConfig};
use shape_sketch::dataset::{DatasetSource, GeneratedShapes};
use shape_sketch::lifecycle::{Capabilities, LifecycleOptions, ModelLifecycleController};
use shape_sketch::logging;
use shape_sketch::ml::{Classifier, Predictor};
use shape_sketch::ml::metrics::{ConfusionMatrix, precision_recall_by_class};
use shape_sketch::ml::mlp::{MlpClassifier, TrainOptions};
use shape_sketch::tensor::argmax;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let config = options.apply(config::load_or_default().map_err(|err| err.to_string())?);

    let store = match &options.models_dir {
        Some(dir) => ArtifactStore::new(dir),
        None => ArtifactStore::from_settings(&config.model).map_err(|err| err.to_string())?,
    };
    let source = Arc::new(GeneratedShapes::new(config.dataset.clone(), &config.canvas));
    let classifier = Arc::new(MlpClassifier::new(TrainOptions::from(&config.training)));
    let capabilities = Capabilities {
        dataset: source.clone(),
        classifier: classifier.clone(),
    };
    let lifecycle_options = LifecycleOptions {
        export_on_complete: false,
        ..LifecycleOptions::from(&config)
    };
    let mut controller = ModelLifecycleController::new(capabilities, store, lifecycle_options);
    let updates = controller.reader().subscribe();

    println!("Training {} classes...", source.class_labels().len());
    controller.train().map_err(|err| err.to_string())?;
    let mut last_line = String::new();
    while controller.is_busy() {
        std::thread::sleep(POLL_INTERVAL);
        controller.poll();
        for snapshot in updates.try_iter() {
            let Some(metrics) = snapshot.metrics else {
                continue;
            };
            let line = format!("{}  {}", snapshot.text, snapshot.subtext);
            if line != last_line {
                println!("epoch {:>3} batch {:>3}  {line}", metrics.epoch + 1, metrics.batch);
                last_line = line;
            }
        }
    }
    if let Some(err) = controller.snapshot().last_error {
        return Err(err.to_string());
    }

    let path = controller
        .export_model(&options.key, !options.plain)
        .map_err(|err| err.to_string())?;
    println!("Wrote {}", path.display());

    let bytes = std::fs::read(&path).map_err(|err| err.to_string())?;
    let model = classifier.load(&bytes)?;
    let dataset = source.build().map_err(|err| err.to_string())?;
    let mut cm = ConfusionMatrix::new(dataset.classes.len());
    let inputs: Vec<_> = dataset.validation.iter().map(|example| example.data.clone()).collect();
    for (example, distribution) in dataset.validation.iter().zip(model.predict(&inputs)) {
        if let (Some(truth), Some((predicted, _))) = (example.class_index(), argmax(&distribution)) {
            cm.add(truth, predicted);
        }
    }
    println!("validation accuracy: {:.4}", cm.accuracy());
    for (idx, stats) in precision_recall_by_class(&cm).iter().enumerate() {
        println!(
            "class {:>2} {:<10}  precision={:.3}  recall={:.3}  support={}",
            idx, dataset.classes[idx], stats.precision, stats.recall, stats.support
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    key: String,
    models_dir: Option<PathBuf>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    hidden_size: Option<usize>,
    learning_rate: Option<f32>,
    workers: Option<usize>,
    per_class: Option<usize>,
    seed: Option<u64>,
    plain: bool,
}

impl CliOptions {
    fn apply(&self, mut config: AppConfig) -> AppConfig {
        let training = &mut config.training;
        training.epochs = self.epochs.unwrap_or(training.epochs);
        training.batch_size = self.batch_size.unwrap_or(training.batch_size);
        training.hidden_size = self.hidden_size.unwrap_or(training.hidden_size);
        training.learning_rate = self.learning_rate.unwrap_or(training.learning_rate);
        training.thread_workers = self.workers.unwrap_or(training.thread_workers);
        training.seed = self.seed.unwrap_or(training.seed);
        if let Some(per_class) = self.per_class {
            config.dataset.training_per_class = per_class;
        }
        config.normalized()
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], idx: usize, flag: &str) -> Result<T, String> {
    let value = args
        .get(idx)
        .ok_or_else(|| format!("{flag} requires a value"))?;
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions {
        key: DEMO_MODEL_KEY.to_string(),
        ..CliOptions::default()
    };
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text()),
            "--key" => {
                idx += 1;
                options.key = parse_value(&args, idx, flag)?;
            }
            "--models-dir" => {
                idx += 1;
                options.models_dir = Some(parse_value(&args, idx, flag)?);
            }
            "--epochs" => {
                idx += 1;
                options.epochs = Some(parse_value(&args, idx, flag)?);
            }
            "--batch" => {
                idx += 1;
                options.batch_size = Some(parse_value(&args, idx, flag)?);
            }
            "--hidden" => {
                idx += 1;
                options.hidden_size = Some(parse_value(&args, idx, flag)?);
            }
            "--learning-rate" => {
                idx += 1;
                options.learning_rate = Some(parse_value(&args, idx, flag)?);
            }
            "--workers" => {
                idx += 1;
                options.workers = Some(parse_value(&args, idx, flag)?);
            }
            "--per-class" => {
                idx += 1;
                options.per_class = Some(parse_value(&args, idx, flag)?);
            }
            "--seed" => {
                idx += 1;
                options.seed = Some(parse_value(&args, idx, flag)?);
            }
            "--plain" => options.plain = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "shape-sketch-train",
        "",
        "Trains the shape classifier on generated shapes and stores <key>.smodel.",
        "",
        "Usage:",
        "  shape-sketch-train [--key demo-shape-classifier] [--models-dir <dir>]",
        "",
        "Options:",
        "  --key <name>          Artifact key (default demo-shape-classifier)",
        "  --models-dir <dir>    Output directory (default: app models dir)",
        "  --epochs <n>          Training epochs (default from config)",
        "  --batch <n>           Batch size",
        "  --hidden <n>          Hidden layer size",
        "  --learning-rate <f>   Learning rate",
        "  --workers <n>         Gradient worker threads",
        "  --per-class <n>       Generated training examples per class",
        "  --seed <n>            Training RNG seed",
        "  --plain               Write uncompressed JSON instead of zip",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn defaults_to_demo_key() {
        let options = parse_args(Vec::new()).unwrap();
        assert_eq!(options.key, DEMO_MODEL_KEY);
        assert!(!options.plain);
    }

    #[test]
    fn overrides_apply_to_config() {
        let options = parse_args(args(&["--epochs", "3", "--workers", "0", "--plain"])).unwrap();
        let config = options.apply(AppConfig::default());
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.thread_workers, 1);
        assert!(options.plain);
    }

    #[test]
    fn bad_values_are_reported() {
        let err = parse_args(args(&["--epochs", "many"])).unwrap_err();
        assert!(err.contains("Invalid --epochs value"));
        assert!(parse_args(args(&["--epochs"])).unwrap_err().contains("requires a value"));
        assert!(parse_args(args(&["--bogus"])).unwrap_err().contains("Unknown argument"));
    }
}
