use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};
use vetq_config::ProviderConfig;
use vetq_domain::{FilterSet, RawHit};

/// Body of a retrieval call. Only the hard filters the backend can apply server-side are sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
	pub query: String,
	pub limit: u32,
	pub filters: RetrievalFilters,
	#[serde(default)]
	pub target_products: Vec<String>,
	pub dosage_value: Option<f32>,
}
impl RetrievalRequest {
	pub fn from_filters(filters: &FilterSet, limit: u32) -> Self {
		Self {
			query: filters.search_term.clone(),
			limit,
			filters: RetrievalFilters {
				category: filters.category.clone(),
				species: filters.species.clone(),
				brand: filters.brand.clone(),
				is_offer: filters.is_offer.then_some(true),
			},
			target_products: filters.target_products.clone(),
			dosage_value: filters.dosage_value,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalFilters {
	pub category: Option<String>,
	pub species: Option<String>,
	pub brand: Option<String>,
	pub is_offer: Option<bool>,
}

pub async fn search(cfg: &ProviderConfig, request: &RetrievalRequest) -> Result<Vec<RawHit>> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(request)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_hits(json)
}

/// Reads `hits`, or `results` as an alias. An empty list is a valid answer.
///
/// Each hit is read on its own. A hit without a usable id is skipped and logged.
pub fn parse_hits(mut json: Value) -> Result<Vec<RawHit>> {
	let hits = json
		.get_mut("hits")
		.map(Value::take)
		.or_else(|| json.get_mut("results").map(Value::take))
		.and_then(|hits| match hits {
			Value::Array(items) => Some(items),
			_ => None,
		})
		.ok_or_else(|| Error::InvalidResponse {
			message: "Retrieval response is missing a hits array.".to_string(),
		})?;
	let mut out = Vec::with_capacity(hits.len());

	for (index, item) in hits.into_iter().enumerate() {
		match serde_json::from_value::<RawHit>(item) {
			Ok(hit) => out.push(hit),
			Err(err) => {
				tracing::warn!(error = %err, index, "Skipping unreadable retrieval hit.");
			},
		}
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn request_carries_only_server_side_filters() {
		let filters = FilterSet {
			search_term: "power gold".to_string(),
			brand: Some("Holliday".to_string()),
			presentation: Some("comprimido".to_string()),
			weight_min: Some(4.0),
			weight_max: Some(10.0),
			target_products: vec!["POWER GOLD".to_string()],
			..Default::default()
		};
		let body = serde_json::to_value(RetrievalRequest::from_filters(&filters, 80))
			.expect("Failed to serialize request.");

		assert_eq!(body["query"], "power gold");
		assert_eq!(body["limit"], 80);
		assert_eq!(body["filters"]["brand"], "Holliday");
		assert!(body["filters"]["is_offer"].is_null());
		assert!(body["filters"].get("presentation").is_none());
		assert_eq!(body["target_products"], json!(["POWER GOLD"]));
	}

	#[test]
	fn parses_hits_and_results_alias() {
		let hit = json!({
			"id": "p-1",
			"type": "product",
			"semantic_score": 0.8,
			"keyword_score": 1.5,
			"metadata": { "title": "POWER GOLD 4-10KG" }
		});
		let from_hits = parse_hits(json!({ "hits": [hit.clone()] })).expect("Failed to parse hits.");
		let from_results =
			parse_hits(json!({ "results": [hit] })).expect("Failed to parse results alias.");

		assert_eq!(from_hits, from_results);
		assert_eq!(from_hits[0].display_title(), "POWER GOLD 4-10KG");
	}

	#[test]
	fn malformed_hits_are_isolated() {
		let hits = parse_hits(json!({
			"hits": [
				{ "id": "a", "semantic_score": 0.9, "keyword_score": 1.0 },
				{ "id": "b", "semantic_score": null, "keyword_score": "bad" },
				{ "id": 42, "semantic_score": 0.4 },
				{ "semantic_score": 0.7 },
				"not-a-hit"
			]
		}))
		.expect("Failed to parse hits.");
		let ids: Vec<&str> = hits.iter().map(|hit| hit.id.as_str()).collect();

		assert_eq!(ids, vec!["a", "b", "42"]);
		assert_eq!(hits[0].semantic_score, 0.9);
		assert_eq!((hits[1].semantic_score, hits[1].keyword_score), (0.0, 0.0));
		assert_eq!(hits[2].semantic_score, 0.4);
	}

	#[test]
	fn empty_and_missing_hits() {
		assert!(parse_hits(json!({ "hits": [] })).expect("Failed to parse empty hits.").is_empty());
		assert!(matches!(parse_hits(json!({ "items": [] })), Err(Error::InvalidResponse { .. })));
	}
}
