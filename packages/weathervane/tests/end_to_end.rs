//! Corpus directory → trained model on disk → classification.
//
//   cargo test -p weathervane --test end_to_end
//

mod common;

use anyhow::Result;
use common::{small_config, weather_corpus, write_tone};
use weathervane::{ModelArchive, Predictor, TrainingHistory, pipeline::train_from_dir};

#[test]
fn train_persist_and_classify() -> Result<()> {
    let data = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    weather_corpus(data.path(), 5);
    let cfg = small_config();

    let summary = train_from_dir(data.path(), &cfg, out.path())?;
    assert_eq!(summary.train_size, 8);
    assert_eq!(summary.eval_size, 2);
    assert_eq!(summary.history.len(), cfg.training.epochs);
    assert!(summary.archive_path.is_file());
    assert!(summary.export_dir.join("weights.safetensors").is_file());

    // history.json is what the plotting side reads
    let history: TrainingHistory =
        serde_json::from_str(&std::fs::read_to_string(&summary.history_path)?)?;
    assert_eq!(history.epochs.len(), summary.history.len());

    // both persisted formats describe the same model
    let archive = ModelArchive::open(&summary.archive_path)?;
    let exported = ModelArchive::import_dir(&summary.export_dir)?;
    assert_eq!(archive.labels, exported.labels);
    assert_eq!(archive.padded_shape, exported.padded_shape);
    assert_eq!(archive.weights, exported.weights);

    let clip = data.path().join("query.wav");
    write_tone(&clip, 320.0, 0.25, 16_000);

    let from_file = Predictor::open(&summary.archive_path)?.classify_file(&clip)?;
    let from_dir = Predictor::open(&summary.export_dir)?.classify_file(&clip)?;

    assert!(["rain", "thunder"].contains(&from_file.label.as_str()));
    let total: f32 = from_file.probabilities.iter().map(|(_, p)| p).sum();
    assert!((total - 1.0).abs() < 1e-4);
    assert_eq!(from_file, from_dir);

    // the same clip already in memory goes through the identical front-end
    let pcm: Vec<f32> = hound::WavReader::open(&clip)?
        .samples::<i32>()
        .map(|s| s.map(|v| v as f32 / 32_768.0))
        .collect::<Result<_, _>>()?;
    let from_memory = Predictor::open(&summary.archive_path)?.classify_samples(&pcm, 16_000)?;
    assert_eq!(from_memory, from_file);
    Ok(())
}

#[test]
fn empty_root_aborts_the_run() -> Result<()> {
    let data = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    let err = train_from_dir(data.path(), &small_config(), out.path()).unwrap_err();
    assert!(matches!(err, weathervane::Error::EmptyCorpus { .. }));
    Ok(())
}
