mod loader;
mod vocabulary;

pub use loader::{Corpus, CorpusLoader, Sample, SkippedFile};
pub use vocabulary::LabelVocabulary;
