pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] vetq_config::Error),

	#[error(transparent)]
	Lexicon(#[from] vetq_ner::LexiconLoadError),
}
