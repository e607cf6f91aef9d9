//! Entity extraction over a catalog-derived lexicon, plus query modifiers and intent detection.

pub mod analyzer;
pub mod error;
pub mod extractor;
pub mod lexicon;
pub mod similarity;

pub use analyzer::{QueryAnalyzer, QuerySettings};
pub use error::LexiconLoadError;
pub use extractor::{EntityExtractor, ExtractorSettings, resolve_spans};
pub use lexicon::{EntityLexicon, LexiconBuilder, LexiconEntry};
