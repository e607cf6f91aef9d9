mod ranking;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	Error, QueryService, Result,
	filter::{FilterRepair, FilterSource},
};
use vetq_config::{Query as QueryConfig, Scoring};
use vetq_domain::{
	Candidate, FilterSet, Intent, RawHit, SearchSummary, SubScores, cmp_f32_desc, normalize,
	weight,
};
use vetq_providers::retrieval::RetrievalRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub top_k: Option<u32>,
	#[serde(default)]
	pub history: Vec<SearchSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
	pub query_id: Uuid,
	pub intent: Intent,
	pub filters: FilterSet,
	pub filter_source: FilterSource,
	pub repairs: Vec<FilterRepair>,
	pub items: Vec<Candidate>,
	/// Feed back as history on the next turn.
	pub summary: SearchSummary,
}

/// Scores, thresholds, and diversifies retrieval hits for one filter set.
pub struct CandidateScorer<'a> {
	scoring: &'a Scoring,
	weight_brackets: &'a [[f32; 2]],
	open_weight_max: f32,
}
impl<'a> CandidateScorer<'a> {
	pub fn new(scoring: &'a Scoring, query: &'a QueryConfig) -> Self {
		Self {
			scoring,
			weight_brackets: &query.weight_brackets,
			open_weight_max: query.open_weight_max,
		}
	}

	pub fn default_top_k(&self, intent: Intent) -> u32 {
		ranking::intent_top_k(&self.scoring.intent_top_k, intent)
	}

	pub fn adaptive_k(&self, requested: u32, filters: &FilterSet) -> u32 {
		ranking::adaptive_k(requested, filters, self.scoring.adaptive_k_cap)
	}

	/// Ranks `hits` and returns at most the adaptive K. Empty input gives empty output.
	pub fn rank(
		&self,
		hits: Vec<RawHit>,
		filters: &FilterSet,
		query_text: &str,
		requested_k: u32,
	) -> Vec<Candidate> {
		let k = self.adaptive_k(requested_k, filters) as usize;
		let excluded: Vec<String> = filters
			.exclude_brands
			.iter()
			.map(|brand| normalize::normalize_text(brand))
			.filter(|brand| !brand.is_empty())
			.collect();
		let mut seen = HashSet::new();
		let mut candidates: Vec<Candidate> = hits
			.into_iter()
			.filter(|hit| !is_excluded(hit, &excluded))
			.filter(|hit| seen.insert(hit.id.clone()))
			.map(|hit| self.score(hit, filters, query_text))
			.collect();

		candidates.sort_by(|a, b| {
			cmp_f32_desc(a.total_score, b.total_score)
				.then_with(|| cmp_f32_desc(a.sub_scores.semantic, b.sub_scores.semantic))
				.then_with(|| a.id.cmp(&b.id))
		});

		let threshold = &self.scoring.threshold;
		let floor = ranking::specificity_floor(threshold, filters.specificity());
		let mut ranked = ranking::apply_threshold(
			candidates,
			floor,
			threshold.dropoff_ratio,
			self.scoring.min_results,
		);

		if !filters.requests_promotions() {
			ranked = ranking::diversify(ranked, k, &self.scoring.diversity);
		}

		ranked.truncate(k);

		ranked
	}

	pub fn score(&self, hit: RawHit, filters: &FilterSet, query_text: &str) -> Candidate {
		let weights = &self.scoring.weights;
		let candidate_range = hit
			.meta_str(&["weight_range"])
			.and_then(weight::parse_range_label)
			.or_else(|| {
				weight::from_text(hit.display_title(), self.weight_brackets, self.open_weight_max)
			});
		let sub_scores = SubScores {
			semantic: finite(hit.semantic_score),
			keyword: finite(hit.keyword_score),
			exact_attribute: ranking::attribute_score(filters, &hit),
			brand: ranking::brand_similarity(
				filters.brand.as_deref(),
				hit.meta_str(&["brand", "enterprise_title"]),
			),
			name: ranking::name_similarity(hit.display_title(), query_text),
			weight_fit: ranking::weight_fit(
				filters.weight_range(self.open_weight_max),
				candidate_range,
			),
			commercial: ranking::commercial_boost(filters, &hit),
			dosage: ranking::dosage_proximity(
				filters.dosage_value,
				hit.meta_f32(&["dosage_value"]),
			),
		};
		let total_score = weights.semantic * sub_scores.semantic
			+ weights.keyword * sub_scores.keyword
			+ weights.exact_attribute * sub_scores.exact_attribute
			+ weights.brand * sub_scores.brand
			+ weights.name * sub_scores.name
			+ weights.weight_fit * sub_scores.weight_fit
			+ weights.commercial * sub_scores.commercial
			+ weights.dosage * sub_scores.dosage;
		let is_promotional = hit.is_offer() || hit.is_transfer();
		let title = hit.display_title().to_string();

		Candidate {
			id: hit.id,
			item_type: hit.item_type,
			title,
			metadata: hit.metadata,
			sub_scores,
			total_score,
			is_promotional,
		}
	}
}

impl QueryService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}
		if req.top_k == Some(0) {
			return Err(Error::InvalidRequest {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		let query_id = Uuid::new_v4();
		let intent = self.analyzer.analyze(query);
		let scorer = CandidateScorer::new(&self.cfg.scoring, &self.cfg.query);
		let top_k = req.top_k.unwrap_or_else(|| scorer.default_top_k(intent.intent));

		if !intent.intent.wants_products() {
			tracing::info!(
				query_id = %query_id,
				intent = intent.intent.as_str(),
				"Search skipped for non-product intent."
			);

			return Ok(SearchResponse {
				query_id,
				intent: intent.intent,
				filters: FilterSet::fallback(query),
				filter_source: FilterSource::Skipped,
				repairs: Vec::new(),
				items: Vec::new(),
				summary: intent.summary(),
			});
		}

		let outcome = self
			.filters
			.build(
				self.providers.oracle.as_ref(),
				&self.cfg.providers.oracle,
				&intent,
				&req.history,
			)
			.await;
		let limit = scorer
			.adaptive_k(top_k, &outcome.filters)
			.saturating_mul(self.cfg.scoring.candidate_multiplier);
		let request = RetrievalRequest::from_filters(&outcome.filters, limit);
		let hits = self
			.providers
			.retrieval
			.search(&self.cfg.providers.retrieval, &request)
			.await
			.map_err(|err| {
				tracing::warn!(query_id = %query_id, error = %err, "Retrieval call failed.");

				Error::Retrieval { message: err.to_string() }
			})?;
		let hit_count = hits.len();
		let items = scorer.rank(hits, &outcome.filters, query, top_k);

		tracing::info!(
			query_id = %query_id,
			intent = intent.intent.as_str(),
			entities = intent.entities.len(),
			filter_source = ?outcome.source,
			repairs = outcome.repairs.len(),
			hits = hit_count,
			items = items.len(),
			"Search completed."
		);

		Ok(SearchResponse {
			query_id,
			intent: intent.intent,
			filters: outcome.filters,
			filter_source: outcome.source,
			repairs: outcome.repairs,
			items,
			summary: intent.summary(),
		})
	}
}

fn is_excluded(hit: &RawHit, excluded: &[String]) -> bool {
	let Some(brand) = hit.meta_str(&["brand", "enterprise_title"]) else { return false };
	let brand = normalize::normalize_text(brand);

	excluded
		.iter()
		.any(|name| brand == *name || !normalize::find_bounded(&brand, name).is_empty())
}

fn finite(value: f32) -> f32 {
	if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn hit(id: &str, semantic: f32, metadata: serde_json::Value) -> RawHit {
		serde_json::from_value(json!({
			"id": id,
			"type": "product",
			"semantic_score": semantic,
			"keyword_score": 0.0,
			"metadata": metadata,
		}))
		.expect("Failed to build hit.")
	}

	fn rank(hits: Vec<RawHit>, filters: &FilterSet, query: &str, k: u32) -> Vec<Candidate> {
		let scoring = Scoring::default();
		let query_cfg = QueryConfig::default();

		CandidateScorer::new(&scoring, &query_cfg).rank(hits, filters, query, k)
	}

	#[test]
	fn empty_hits_rank_to_nothing() {
		assert!(rank(Vec::new(), &FilterSet::default(), "pipeta", 8).is_empty());
	}

	#[test]
	fn excluded_brands_and_duplicates_are_dropped() {
		let filters = FilterSet {
			exclude_brands: vec!["Bravecto".to_string()],
			..FilterSet::fallback("antipulgas")
		};
		let hits = vec![
			hit("a", 0.9, json!({ "title": "BRAVECTO 10-20KG", "brand": "BRAVECTO" })),
			hit("b", 0.8, json!({ "title": "NEXGARD 10-25KG", "brand": "BOEHRINGER" })),
			hit("b", 0.1, json!({ "title": "NEXGARD DUP" })),
		];
		let ranked = rank(hits, &filters, "antipulgas", 8);

		assert_eq!(ranked.len(), 1);
		assert_eq!(ranked[0].id, "b");
		assert_eq!(ranked[0].title, "NEXGARD 10-25KG");
	}

	#[test]
	fn malformed_weight_labels_fall_back_to_the_title() {
		let filters =
			FilterSet { weight_min: Some(4.0), weight_max: Some(10.0), ..Default::default() };
		let hits = vec![
			hit("a", 0.5, json!({ "title": "POWER GOLD 4-10KG", "weight_range": "n/a" })),
			hit("b", 0.5, json!({ "title": "POWER GOLD", "weight_range": "abc" })),
		];
		let ranked = rank(hits, &filters, "power gold", 8);

		assert_eq!(ranked[0].id, "a");
		assert_eq!(ranked[0].sub_scores.weight_fit, 4.0);
		assert_eq!(ranked[1].sub_scores.weight_fit, 0.0);
	}

	#[test]
	fn ties_break_on_semantic_then_id() {
		let hits = vec![
			hit("c", 0.2, json!({ "title": "ALFA" })),
			hit("b", 0.2, json!({ "title": "ALFA" })),
			hit("a", 0.1, json!({ "title": "ALFA" })),
		];
		let filters = FilterSet::fallback("zzz");
		let ranked = rank(hits, &filters, "zzz", 8);

		assert_eq!(ranked.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["b", "c", "a"]);
	}

	#[test]
	fn promotions_are_capped_unless_requested() {
		let mut hits: Vec<RawHit> = (0..8)
			.map(|idx| {
				hit(&format!("promo-{idx}"), 5.0, json!({ "title": "PIPETA", "is_offer": true }))
			})
			.collect();

		hits.extend(
			(0..4).map(|idx| hit(&format!("plain-{idx}"), 4.8, json!({ "title": "PIPETA" }))),
		);

		let open = FilterSet::fallback("pipeta");
		let ranked = rank(hits.clone(), &open, "pipeta", 10);

		assert!(ranked.iter().filter(|c| c.is_promotional).count() <= 3);
		assert_eq!(ranked.iter().filter(|c| !c.is_promotional).count(), 4);

		let offers = FilterSet { is_offer: true, ..open };
		let ranked = rank(hits, &offers, "pipeta", 10);

		assert_eq!(ranked.iter().filter(|c| c.is_promotional).count(), 8);
	}
}
