pub mod error;
pub mod filter;
pub mod search;

pub use error::{Error, Result};
pub use filter::{
	FilterBuilder, FilterDraft, FilterOutcome, FilterRepair, FilterSettings, FilterSource,
	OracleFailure, RepairAction,
};
pub use search::{CandidateScorer, SearchRequest, SearchResponse};

use std::{future::Future, pin::Pin, sync::Arc};

use serde::Deserialize;
use serde_json::Value;

use vetq_config::{Config, LlmProviderConfig, ProviderConfig};
use vetq_domain::{QueryIntent, RawHit};
use vetq_ner::{EntityExtractor, EntityLexicon, ExtractorSettings, QueryAnalyzer, QuerySettings};
use vetq_providers::{oracle, retrieval, retrieval::RetrievalRequest};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait OracleProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, vetq_providers::Result<Value>>;
}

pub trait RetrievalProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		request: &'a RetrievalRequest,
	) -> BoxFuture<'a, vetq_providers::Result<Vec<RawHit>>>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
	pub query: String,
}

#[derive(Clone)]
pub struct Providers {
	pub oracle: Arc<dyn OracleProvider>,
	pub retrieval: Arc<dyn RetrievalProvider>,
}
impl Providers {
	pub fn new(oracle: Arc<dyn OracleProvider>, retrieval: Arc<dyn RetrievalProvider>) -> Self {
		Self { oracle, retrieval }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { oracle: provider.clone(), retrieval: provider }
	}
}

/// The query pipeline: analyze, derive filters, retrieve, rank.
pub struct QueryService {
	pub cfg: Config,
	pub analyzer: QueryAnalyzer,
	pub filters: FilterBuilder,
	pub providers: Providers,
}
impl QueryService {
	/// Builds the lexicon from the configured sources. Sources that fail to load are logged and
	/// skipped.
	pub fn new(cfg: Config) -> Self {
		Self::with_providers(cfg, Providers::default())
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		let (lexicon, errors) = EntityLexicon::load(&cfg.lexicon, &cfg.extractor.stop_words);

		if !errors.is_empty() {
			tracing::warn!(failed_sources = errors.len(), "Lexicon built with missing sources.");
		}

		Self::with_lexicon(cfg, Arc::new(lexicon), providers)
	}

	pub fn with_lexicon(cfg: Config, lexicon: Arc<EntityLexicon>, providers: Providers) -> Self {
		let extractor = EntityExtractor::new(lexicon, ExtractorSettings::from_config(&cfg.extractor));
		let analyzer = QueryAnalyzer::new(extractor, QuerySettings::from_config(&cfg.query));
		let filters =
			FilterBuilder::new(FilterSettings::from_config(&cfg.filter, cfg.query.open_weight_max));

		Self { cfg, analyzer, filters, providers }
	}

	pub fn analyze(&self, req: AnalyzeRequest) -> Result<QueryIntent> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		Ok(self.analyzer.analyze(query))
	}
}

struct DefaultProviders;

impl OracleProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, vetq_providers::Result<Value>> {
		Box::pin(oracle::complete(cfg, messages))
	}
}

impl RetrievalProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		request: &'a RetrievalRequest,
	) -> BoxFuture<'a, vetq_providers::Result<Vec<RawHit>>> {
		Box::pin(retrieval::search(cfg, request))
	}
}
