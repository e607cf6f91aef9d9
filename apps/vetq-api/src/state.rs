use std::sync::Arc;

use vetq_service::QueryService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<QueryService>,
}
impl AppState {
	/// Loads the lexicon and wires the HTTP providers. Missing lexicon sources are logged, not
	/// fatal.
	pub fn new(config: vetq_config::Config) -> Self {
		Self::from_service(QueryService::new(config))
	}

	pub fn from_service(service: QueryService) -> Self {
		Self { service: Arc::new(service) }
	}
}
