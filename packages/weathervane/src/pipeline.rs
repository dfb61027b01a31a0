//! End-to-end runs: corpus directory → trained archive, archive + clip → label.

use std::{
    fs,
    path::{Path, PathBuf},
};

use candle_core::Device;
use log::info;

use crate::{
    Error, Result,
    audio::AudioNormalizer,
    config::PipelineConfig,
    constants::MODEL_ARCHIVE_EXTENSION,
    corpus::{CorpusLoader, LabelVocabulary, SkippedFile},
    dataset::{DatasetSplitter, TensorPreparer},
    features::SpectrogramExtractor,
    model::{ArchiveSave, ModelArchive, SpectrogramNet},
    training::{Classifier, TrainingController, TrainingHistory, stack_inputs},
};

pub const HISTORY_FILE: &str = "history.json";
pub const EXPORT_DIR: &str = "model";

/// What a training run produced and where it was written.
#[derive(Debug)]
pub struct TrainSummary {
    pub vocabulary: LabelVocabulary,
    pub class_counts: Vec<(String, usize)>,
    pub skipped: Vec<SkippedFile>,
    pub train_size: usize,
    pub eval_size: usize,
    pub history: TrainingHistory,
    pub best_epoch: Option<usize>,
    pub archive_path: PathBuf,
    pub export_dir: PathBuf,
    pub history_path: PathBuf,
}

/// Load → prepare → split → train → persist.
///
/// Writes `<out>/model.wvc`, `<out>/model/` and `<out>/history.json`. The
/// persisted weights are those of the best checkpoint (or the final state if
/// no epoch produced a finite eval loss).
pub fn train_from_dir<P, Q>(root: P, cfg: &PipelineConfig, out_dir: Q) -> Result<TrainSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    cfg.validate()?;
    let out_dir = out_dir.as_ref();

    let corpus = CorpusLoader::new(cfg)?.load(root)?;
    let class_counts = corpus.class_counts();

    let prepared = TensorPreparer::new(&cfg.tensor).prepare(&corpus.samples, &corpus.vocabulary)?;
    let split = DatasetSplitter::new(&cfg.split)?.split(prepared.tensors)?;

    let mut net = SpectrogramNet::new(
        cfg.training.model_type,
        cfg.tensor.shape(),
        corpus.vocabulary.len(),
        cfg.training.learning_rate,
        &Device::Cpu,
    )?;
    let mut controller = TrainingController::new(cfg.training.clone());
    let history = controller.train(&mut net, &split.train, &split.eval)?;

    let weights = match controller.best_checkpoint() {
        Some(state) => state.clone(),
        None => net.state()?,
    };
    let archive = ModelArchive::new(
        corpus.vocabulary.clone(),
        cfg.clone(),
        prepared.padded_shape,
        cfg.training.model_type,
        weights,
    );

    fs::create_dir_all(out_dir)?;
    let archive_path = out_dir.join("model").with_extension(MODEL_ARCHIVE_EXTENSION);
    let export_dir = out_dir.join(EXPORT_DIR);
    let history_path = out_dir.join(HISTORY_FILE);

    archive.save_to_file(&archive_path)?;
    archive.export_dir(&export_dir)?;
    history.save_json(&history_path)?;
    info!(
        "wrote {}, {}/ and {}",
        archive_path.display(),
        export_dir.display(),
        history_path.display()
    );

    Ok(TrainSummary {
        vocabulary: corpus.vocabulary,
        class_counts,
        skipped: corpus.skipped,
        train_size: split.train.len(),
        eval_size: split.eval.len(),
        best_epoch: controller.best_epoch(),
        history,
        archive_path,
        export_dir,
        history_path,
    })
}

/* ────────────────────── inference ────────────────────── */

#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
    /// `(label, probability)` for every class, vocabulary order.
    pub probabilities: Vec<(String, f32)>,
}

/// A trained model plus the exact front-end it was trained with.
pub struct Predictor {
    archive: ModelArchive,
    normalizer: AudioNormalizer,
    extractor: SpectrogramExtractor,
    preparer: TensorPreparer,
    net: SpectrogramNet,
    device: Device,
}

impl Predictor {
    /// Accepts either a `.wvc` archive or an exported model directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let archive = if path.is_dir() {
            ModelArchive::import_dir(path)?
        } else {
            ModelArchive::open(path)?
        };
        Self::from_archive(archive)
    }

    pub fn from_archive(archive: ModelArchive) -> Result<Self> {
        let device = Device::Cpu;
        let cfg = &archive.config;
        let net = SpectrogramNet::from_state(
            archive.model_type,
            archive.input_shape(),
            archive.labels.len(),
            &archive.weights,
            &device,
        )?;
        Ok(Self {
            normalizer: AudioNormalizer::new(&cfg.audio),
            extractor: SpectrogramExtractor::new(&cfg.spectrogram, cfg.audio.sample_rate)?,
            preparer: TensorPreparer::new(&cfg.tensor),
            net,
            device,
            archive,
        })
    }

    #[inline]
    pub fn archive(&self) -> &ModelArchive {
        &self.archive
    }

    #[inline]
    pub fn labels(&self) -> &LabelVocabulary {
        &self.archive.labels
    }

    pub fn classify_file<P: AsRef<Path>>(&self, path: P) -> Result<Prediction> {
        let path = path.as_ref();
        let waveform = self
            .normalizer
            .normalize(path)
            .map_err(|source| Error::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        self.classify_waveform(&waveform)
    }

    /// Mono samples at `sample_rate`; resampled and fitted like training input.
    pub fn classify_samples(&self, samples: &[f32], sample_rate: u32) -> Result<Prediction> {
        let waveform = self
            .normalizer
            .normalize_samples(samples, sample_rate)
            .map_err(|source| Error::FileRead {
                path: PathBuf::from("<memory>"),
                source,
            })?;
        self.classify_waveform(&waveform)
    }

    fn classify_waveform(&self, waveform: &crate::audio::Waveform) -> Result<Prediction> {
        let features = self.extractor.extract(waveform)?;
        let tensor = self.preparer.prepare_one(&features, self.archive.padded_shape)?;
        let x = stack_inputs([&tensor], &self.device)?;

        let probs: Vec<f32> = self.net.predict(&x)?.squeeze(0)?.to_vec1()?;
        let labels = &self.archive.labels;
        let (label, confidence) = labels.decode(&probs).ok_or_else(|| {
            Error::shape("prediction width", &[labels.len()], &[probs.len()])
        })?;

        Ok(Prediction {
            label: label.to_owned(),
            confidence,
            probabilities: labels.iter().map(str::to_owned).zip(probs.iter().copied()).collect(),
        })
    }
}
