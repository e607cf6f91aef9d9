use std::path::PathBuf;

/// A reference source that could not be read. The affected source contributes no entries.
#[derive(Debug, thiserror::Error)]
pub enum LexiconLoadError {
	#[error("Failed to open lexicon source at {path:?}.")]
	Open { path: PathBuf, source: std::io::Error },
	#[error("Lexicon source at {path:?} has no column {column}.")]
	MissingColumn { path: PathBuf, column: String },
	#[error("Failed to read lexicon source at {path:?}.")]
	Record { path: PathBuf, source: csv::Error },
	#[error("Unknown entity type {entity_type} for lexicon source.")]
	UnknownType { entity_type: String },
}
