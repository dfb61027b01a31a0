//! Trained-model persistence.
//!
//! Two independent formats:
//! * single file: CBOR-encoded [`ModelArchive`] (`*.wvc`), written atomically
//!   via `<file>.tmp` → rename;
//! * directory: `weights.safetensors` + `labels.json` + `model.json`.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use candle_core::Device;
use ciborium::{de, ser};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    config::PipelineConfig, corpus::LabelVocabulary, model::ModelType,
    training::ClassifierState,
};

/// Current on-disk version. Bump if the layout changes.
pub const ARCHIVE_VERSION: u8 = 1;

pub const WEIGHTS_FILE: &str = "weights.safetensors";
pub const LABELS_FILE: &str = "labels.json";
pub const MANIFEST_FILE: &str = "model.json";

/* --------------------------------------------------------------------- */
/*  Error type                                                           */

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cbor: {0}")]
    Cbor(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("weights: {0}")]
    Weights(#[from] candle_core::Error),
    #[error("unsupported archive version {found} (expected {})", ARCHIVE_VERSION)]
    Version { found: u8 },
    #[error("inconsistent archive: {0}")]
    Inconsistent(String),
}

type ArchiveResult<T> = Result<T, ArchiveError>;

fn write_cbor<W: Write, T: Serialize + ?Sized>(w: W, val: &T) -> ArchiveResult<()> {
    ser::into_writer(val, w).map_err(|e| ArchiveError::Cbor(e.to_string()))
}
fn read_cbor<R: Read, T: DeserializeOwned>(r: R) -> ArchiveResult<T> {
    de::from_reader(r).map_err(|e| ArchiveError::Cbor(e.to_string()))
}

/* --------------------------------------------------------------------- */
/*  Save / load traits                                                   */

pub trait ArchiveSave: Serialize {
    /// Atomically write CBOR to `path`.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ArchiveResult<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");

        {
            let f = File::create(&tmp)?;
            let mut bw = BufWriter::new(f);
            write_cbor(&mut bw, self)?;
            bw.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn save_to_buffer(&self) -> ArchiveResult<Vec<u8>> {
        let mut buf = Vec::new();
        write_cbor(&mut buf, self)?;
        Ok(buf)
    }
}

pub trait ArchiveLoad: DeserializeOwned + Sized {
    /// Load a CBOR file produced by [`ArchiveSave::save_to_file`].
    fn load_from_file<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        let f = File::open(path)?;
        read_cbor(BufReader::new(f))
    }

    fn load_from_buffer(buf: &[u8]) -> ArchiveResult<Self> {
        read_cbor(buf)
    }
}

/* --------------------------------------------------------------------- */
/*  Archive                                                              */

/// Everything needed to rebuild the classifier and replay the front-end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArchive {
    version: u8,

    /// Class names in output-index order.
    pub labels: LabelVocabulary,

    /// Front-end + training configuration the model was produced with.
    pub config: PipelineConfig,

    /// Common `(bands, frames)` shape feature matrices were padded to.
    pub padded_shape: (usize, usize),

    /// Network size preset.
    pub model_type: ModelType,

    pub weights: ClassifierState,
}

impl ModelArchive {
    pub fn new(
        labels: LabelVocabulary,
        config: PipelineConfig,
        padded_shape: (usize, usize),
        model_type: ModelType,
        weights: ClassifierState,
    ) -> Self {
        Self {
            version: ARCHIVE_VERSION,
            labels,
            config,
            padded_shape,
            model_type,
            weights,
        }
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    #[inline]
    pub fn input_shape(&self) -> (usize, usize, usize) {
        self.config.tensor.shape()
    }

    /// Load a single-file archive and check its version.
    pub fn open<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        let archive = Self::load_from_file(path)?;
        archive.check()?;
        Ok(archive)
    }

    fn check(&self) -> ArchiveResult<()> {
        if self.version != ARCHIVE_VERSION {
            return Err(ArchiveError::Version {
                found: self.version,
            });
        }
        if self.labels.is_empty() {
            return Err(ArchiveError::Inconsistent("empty label set".into()));
        }
        if self.weights.is_empty() {
            return Err(ArchiveError::Inconsistent("no weight tensors".into()));
        }
        Ok(())
    }

    /* ---------- directory format ---------- */

    /// Write `weights.safetensors`, `labels.json` and `model.json` into `dir`.
    pub fn export_dir<P: AsRef<Path>>(&self, dir: P) -> ArchiveResult<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        candle_core::safetensors::save(&self.weights.to_tensors()?, dir.join(WEIGHTS_FILE))?;
        fs::write(
            dir.join(LABELS_FILE),
            serde_json::to_string_pretty(&self.labels)?,
        )?;
        let manifest = Manifest {
            version: self.version,
            model_type: self.model_type,
            padded_shape: self.padded_shape,
            input_shape: self.input_shape(),
            num_classes: self.labels.len(),
            config: self.config.clone(),
        };
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        Ok(())
    }

    /// Read back a directory written by [`ModelArchive::export_dir`].
    pub fn import_dir<P: AsRef<Path>>(dir: P) -> ArchiveResult<Self> {
        let dir = dir.as_ref();
        let manifest: Manifest = serde_json::from_slice(&fs::read(dir.join(MANIFEST_FILE))?)?;
        let labels: LabelVocabulary = serde_json::from_slice(&fs::read(dir.join(LABELS_FILE))?)?;

        if labels.len() != manifest.num_classes {
            return Err(ArchiveError::Inconsistent(format!(
                "{} labels but manifest declares {} classes",
                labels.len(),
                manifest.num_classes
            )));
        }

        let tensors = candle_core::safetensors::load(dir.join(WEIGHTS_FILE), &Device::Cpu)?;
        let weights = ClassifierState::capture(tensors.iter())?;

        let archive = Self {
            version: manifest.version,
            labels,
            config: manifest.config,
            padded_shape: manifest.padded_shape,
            model_type: manifest.model_type,
            weights,
        };
        archive.check()?;
        Ok(archive)
    }
}

impl ArchiveLoad for ModelArchive {}
impl ArchiveSave for ModelArchive {}

/// `model.json` contents.
#[derive(Serialize, Deserialize)]
struct Manifest {
    version: u8,
    model_type: ModelType,
    padded_shape: (usize, usize),
    input_shape: (usize, usize, usize),
    num_classes: usize,
    config: PipelineConfig,
}
