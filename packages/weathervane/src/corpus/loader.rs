//! **CorpusLoader**: `root/<class>/<clip>` → samples + vocabulary.
//!
//! 1. Class directories are the immediate sub-directories of `root`, sorted.
//! 2. Each class's files are visited in sorted order (hidden entries ignored).
//! 3. Per file: [`AudioNormalizer`] then [`SpectrogramExtractor`].
//!    Unreadable / undecodable files are logged and skipped, never fatal.
//!
//! With the `desktop` feature the files of a class are processed on the rayon
//! pool; results are collected back in file order.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
#[cfg(feature = "desktop")]
use rayon::prelude::*;

use crate::{
    Error, Result,
    audio::AudioNormalizer,
    config::PipelineConfig,
    features::{FeatureMatrix, SpectrogramExtractor},
};

use super::LabelVocabulary;

/// One successfully processed clip.
#[derive(Clone, Debug)]
pub struct Sample {
    pub features: FeatureMatrix,
    pub label: String,
    pub source: PathBuf,
}

/// A file the loader gave up on.
#[derive(Clone, Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything discovered under one corpus root.
#[derive(Debug)]
pub struct Corpus {
    pub samples: Vec<Sample>,
    pub vocabulary: LabelVocabulary,
    pub skipped: Vec<SkippedFile>,
}

impl Corpus {
    /// `(label, sample count)` in vocabulary order; empty classes report 0.
    pub fn class_counts(&self) -> Vec<(String, usize)> {
        self.vocabulary
            .iter()
            .map(|l| {
                let n = self.samples.iter().filter(|s| s.label == l).count();
                (l.to_owned(), n)
            })
            .collect()
    }
}

pub struct CorpusLoader {
    normalizer: AudioNormalizer,
    extractor: SpectrogramExtractor,
}

impl CorpusLoader {
    pub fn new(cfg: &PipelineConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            normalizer: AudioNormalizer::new(&cfg.audio),
            extractor: SpectrogramExtractor::new(&cfg.spectrogram, cfg.audio.sample_rate)?,
        })
    }

    #[inline]
    pub fn from_parts(normalizer: AudioNormalizer, extractor: SpectrogramExtractor) -> Self {
        Self {
            normalizer,
            extractor,
        }
    }

    /// Normalize + extract one file.
    pub fn process_file(&self, path: &Path) -> Result<FeatureMatrix> {
        let waveform = self
            .normalizer
            .normalize(path)
            .map_err(|source| Error::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        self.extractor
            .extract(&waveform)
            .map_err(|source| Error::Extract {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Walk `root` and build the corpus.
    pub fn load<P: AsRef<Path>>(&self, root: P) -> Result<Corpus> {
        let root = root.as_ref();
        let entries = sorted_entries(root).map_err(|source| Error::CorpusRoot {
            root: root.to_path_buf(),
            source,
        })?;

        let class_dirs: Vec<PathBuf> = entries.into_iter().filter(|p| p.is_dir()).collect();
        if class_dirs.is_empty() {
            return Err(Error::EmptyCorpus {
                root: root.to_path_buf(),
            });
        }

        // Vocabulary is frozen before any sample is touched.
        let vocabulary = LabelVocabulary::sorted(class_dirs.iter().filter_map(|d| dir_label(d)));

        let mut samples = Vec::new();
        let mut skipped = Vec::new();

        for dir in &class_dirs {
            let Some(label) = dir_label(dir) else {
                warn!("skipping class directory with non UTF-8 name: {}", dir.display());
                continue;
            };

            let files: Vec<PathBuf> = match sorted_entries(dir) {
                Ok(entries) => entries.into_iter().filter(|p| p.is_file()).collect(),
                Err(e) => {
                    warn!("cannot list class directory {}: {e}", dir.display());
                    Vec::new()
                }
            };

            let before = samples.len();
            for (path, outcome) in self.process_all(&files) {
                match outcome {
                    Ok(features) => {
                        debug!("{label}: {} → {:?}", path.display(), features.dim());
                        samples.push(Sample {
                            features,
                            label: label.clone(),
                            source: path,
                        });
                    }
                    Err(e) if e.is_recoverable() => {
                        warn!("skipping {}: {e}", path.display());
                        skipped.push(SkippedFile {
                            path,
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }

            let loaded = samples.len() - before;
            if loaded == 0 {
                warn!("class \"{label}\" has no usable recordings; it keeps its output slot but gets no training signal");
            } else {
                info!("class \"{label}\": {loaded} recordings");
            }
        }

        info!(
            "corpus {}: {} samples, {} classes, {} skipped",
            root.display(),
            samples.len(),
            vocabulary.len(),
            skipped.len()
        );

        Ok(Corpus {
            samples,
            vocabulary,
            skipped,
        })
    }

    /* -------- helpers ------------------------------------------------- */

    #[cfg(feature = "desktop")]
    fn process_all(&self, files: &[PathBuf]) -> Vec<(PathBuf, Result<FeatureMatrix>)> {
        files
            .par_iter()
            .map(|p| (p.clone(), self.process_file(p)))
            .collect()
    }

    #[cfg(not(feature = "desktop"))]
    fn process_all(&self, files: &[PathBuf]) -> Vec<(PathBuf, Result<FeatureMatrix>)> {
        files
            .iter()
            .map(|p| (p.clone(), self.process_file(p)))
            .collect()
    }
}

/* ────────────────────── utils ────────────────────── */

/// Non-hidden entries of `dir`, sorted by file name.
fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if !hidden {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn dir_label(dir: &Path) -> Option<String> {
    dir.file_name().and_then(|n| n.to_str()).map(str::to_owned)
}
