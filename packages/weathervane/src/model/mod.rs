pub mod archive;
pub mod network;

pub use archive::{ArchiveError, ArchiveLoad, ArchiveSave, ModelArchive};
pub use network::{ModelType, SpectrogramNet};
