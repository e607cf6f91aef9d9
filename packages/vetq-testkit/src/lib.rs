//! In-memory stand-ins for the oracle and retrieval backends, plus a small catalog to analyze
//! queries against.

mod error;

pub use error::{Error, Result};

use std::{
	collections::VecDeque,
	path::Path,
	sync::{Arc, Mutex},
};

use serde_json::{Map, Value};

use vetq_config::{Config, LlmProviderConfig, ProviderConfig};
use vetq_domain::{EntityType, RawHit};
use vetq_ner::{EntityLexicon, LexiconBuilder};
use vetq_providers::retrieval::RetrievalRequest;
use vetq_service::{BoxFuture, OracleProvider, Providers, QueryService, RetrievalProvider};

pub const SAMPLE_CONFIG_TOML: &str = include_str!("../fixtures/config.toml");
pub const VADEMECUM_CSV: &str = include_str!("../fixtures/vademecum.csv");

const CONCEPTS: [&str; 4] = ["PIPETA", "COLLAR", "GOTAS", "JARABE"];

pub fn sample_config() -> Result<Config> {
	Ok(vetq_config::parse(SAMPLE_CONFIG_TOML, Path::new("vetq-testkit.toml"))?)
}

/// Builds the lexicon from the bundled vademecum, the same way configured CSV sources load.
pub fn sample_lexicon(cfg: &Config) -> Result<EntityLexicon> {
	let mut builder = LexiconBuilder::new(&cfg.lexicon, &cfg.extractor.stop_words);
	let origin = Path::new("fixtures/vademecum.csv");
	let drug_delimiters = vec![",".to_string(), "+".to_string()];
	let columns = [
		(EntityType::Product, "PRODUCTO", &[][..]),
		(EntityType::Brand, "LABORATORIO", &[][..]),
		(EntityType::Drug, "PRINCIPIO ACTIVO", &drug_delimiters[..]),
		(EntityType::Category, "CATEGORIA", &[][..]),
	];

	for (ty, column, delimiters) in columns {
		builder.load_csv(ty, VADEMECUM_CSV.as_bytes(), origin, column, delimiters, false)?;
	}
	for concept in CONCEPTS {
		builder.add_value(EntityType::Concept, concept);
	}

	Ok(builder.build())
}

/// A service over the sample config and lexicon, wired to the given fakes.
pub fn service(
	oracle: Arc<ScriptedOracle>,
	retrieval: Arc<StaticRetrieval>,
) -> Result<QueryService> {
	let cfg = sample_config()?;
	let lexicon = sample_lexicon(&cfg)?;

	Ok(QueryService::with_lexicon(cfg, Arc::new(lexicon), Providers::new(oracle, retrieval)))
}

pub fn hit(id: &str, title: &str) -> HitBuilder {
	let mut metadata = Map::new();

	metadata.insert("title".to_string(), Value::from(title));

	HitBuilder {
		hit: RawHit {
			id: id.to_string(),
			item_type: "product".to_string(),
			title: None,
			semantic_score: 0.0,
			keyword_score: 0.0,
			metadata,
		},
	}
}

enum Reply {
	Draft(Value),
	Failure(String),
}

/// Answers oracle calls from a queue. An exhausted queue behaves like an unreachable oracle.
#[derive(Default)]
pub struct ScriptedOracle {
	replies: Mutex<VecDeque<Reply>>,
	calls: Mutex<Vec<Vec<Value>>>,
}
impl ScriptedOracle {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_draft(self, draft: Value) -> Self {
		self.push(Reply::Draft(draft));

		self
	}

	pub fn with_failure(self, message: &str) -> Self {
		self.push(Reply::Failure(message.to_string()));

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	/// Messages of the most recent call.
	pub fn last_messages(&self) -> Option<Vec<Value>> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).last().cloned()
	}

	fn push(&self, reply: Reply) {
		self.replies.lock().unwrap_or_else(|err| err.into_inner()).push_back(reply);
	}
}

impl OracleProvider for ScriptedOracle {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, vetq_providers::Result<Value>> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).push(messages.to_vec());

		let reply = self.replies.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

		Box::pin(async move {
			match reply {
				Some(Reply::Draft(draft)) => Ok(draft),
				Some(Reply::Failure(message)) =>
					Err(vetq_providers::Error::InvalidResponse { message }),
				None => Err(vetq_providers::Error::InvalidResponse {
					message: "No scripted oracle reply left.".to_string(),
				}),
			}
		})
	}
}

/// Returns the same hits for every request, or fails every request.
pub struct StaticRetrieval {
	hits: Vec<RawHit>,
	failure: Option<String>,
	requests: Mutex<Vec<RetrievalRequest>>,
}
impl StaticRetrieval {
	pub fn new(hits: Vec<RawHit>) -> Self {
		Self { hits, failure: None, requests: Mutex::new(Vec::new()) }
	}

	pub fn failing(message: &str) -> Self {
		Self {
			hits: Vec::new(),
			failure: Some(message.to_string()),
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn requests(&self) -> Vec<RetrievalRequest> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}

impl RetrievalProvider for StaticRetrieval {
	fn search<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		request: &'a RetrievalRequest,
	) -> BoxFuture<'a, vetq_providers::Result<Vec<RawHit>>> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).push(request.clone());

		let result = match &self.failure {
			Some(message) => Err(vetq_providers::Error::InvalidResponse { message: message.clone() }),
			None => Ok(self.hits.clone()),
		};

		Box::pin(async move { result })
	}
}

pub struct HitBuilder {
	hit: RawHit,
}
impl HitBuilder {
	pub fn semantic(mut self, score: f32) -> Self {
		self.hit.semantic_score = score;

		self
	}

	pub fn keyword(mut self, score: f32) -> Self {
		self.hit.keyword_score = score;

		self
	}

	pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
		self.hit.metadata.insert(key.to_string(), value.into());

		self
	}

	pub fn build(self) -> RawHit {
		self.hit
	}
}
