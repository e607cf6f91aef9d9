use std::collections::HashSet;

use vetq_domain::{FilterSet, RawHit, WeightRange, normalize};
use vetq_ner::similarity;

const ATTRIBUTE_MATCH: f32 = 0.5;
const ATTRIBUTE_CAP: f32 = 2.0;

pub fn brand_similarity(requested: Option<&str>, candidate: Option<&str>) -> f32 {
	let (Some(requested), Some(candidate)) = (requested, candidate) else { return 0.0 };
	let requested = normalize::normalize_text(requested);
	let candidate = normalize::normalize_text(candidate);

	if requested.is_empty() || candidate.is_empty() {
		return 0.0;
	}
	if requested == candidate {
		return 5.0;
	}
	if requested.contains(&candidate) || candidate.contains(&requested) {
		return 3.0;
	}

	let ratio = similarity::ratio(&requested, &candidate);

	if ratio > 0.8 {
		2.0 * ratio
	} else if ratio > 0.6 {
		1.0
	} else {
		0.0
	}
}

/// Token Jaccard between title and query, bucketed.
pub fn name_similarity(title: &str, query: &str) -> f32 {
	let title = normalize::normalize_text(title);
	let query = normalize::normalize_text(query);
	let title_tokens = name_tokens(&title);
	let query_tokens = name_tokens(&query);

	if title_tokens.is_empty() || query_tokens.is_empty() {
		return 0.0;
	}

	let shared = title_tokens.intersection(&query_tokens).count() as f32;
	let union = title_tokens.union(&query_tokens).count() as f32;
	let jaccard = shared / union;

	match jaccard {
		j if j >= 0.8 => 5.0,
		j if j >= 0.6 => 4.0,
		j if j >= 0.4 => 2.0,
		j if j >= 0.2 => 1.0,
		_ => 0.0,
	}
}

/// How well a candidate's weight range serves the requested one. Missing information on either
/// side scores zero.
pub fn weight_fit(requested: Option<WeightRange>, candidate: Option<WeightRange>) -> f32 {
	let (Some(requested), Some(candidate)) = (requested, candidate) else { return 0.0 };
	let span = requested.span().max(1.0);

	if requested.contains_range(&candidate) {
		return 4.0;
	}

	let overlap = requested.overlap(&candidate);

	if overlap > 0.0 {
		return 2.0 + 1.5 * (overlap / span).min(1.0);
	}

	let gap = requested.gap(&candidate) / span;

	if gap < 0.2 {
		2.0
	} else if gap < 0.5 {
		1.0
	} else {
		0.0
	}
}

pub fn attribute_score(filters: &FilterSet, hit: &RawHit) -> f32 {
	let title = normalize::normalize_text(hit.display_title());
	let checks = [
		(filters.category.as_deref(), hit.meta_str(&["category"])),
		(filters.presentation.as_deref(), hit.meta_str(&["presentation"])),
		(filters.species.as_deref(), hit.meta_str(&["species", "species_filter"])),
		(filters.drug.as_deref(), hit.meta_str(&["drug"])),
	];
	let matched = checks
		.into_iter()
		.filter(|(wanted, field)| {
			wanted.is_some_and(|wanted| attribute_matches(wanted, *field, &title))
		})
		.count();

	(matched as f32 * ATTRIBUTE_MATCH).min(ATTRIBUTE_CAP)
}

pub fn commercial_boost(filters: &FilterSet, hit: &RawHit) -> f32 {
	let offer = match (filters.is_offer, hit.is_offer()) {
		(true, true) => 2.0,
		(false, true) => 0.5,
		_ => 0.0,
	};
	let transfer = match (filters.is_transfer, hit.is_transfer()) {
		(true, true) => 1.5,
		(false, true) => 0.3,
		_ => 0.0,
	};

	offer + transfer
}

pub fn dosage_proximity(requested: Option<f32>, candidate: Option<f32>) -> f32 {
	match (requested, candidate) {
		(Some(requested), Some(candidate)) => 1.0 / (1.0 + (candidate - requested).abs()),
		_ => 0.0,
	}
}

fn name_tokens(text: &str) -> HashSet<&str> {
	normalize::tokenize(text).into_iter().filter(|token| token.len() >= 2).collect()
}

fn attribute_matches(wanted: &str, field: Option<&str>, title: &str) -> bool {
	let wanted = normalize::normalize_text(wanted);

	if wanted.is_empty() {
		return false;
	}
	if let Some(field) = field {
		let field = normalize::normalize_text(field);

		if !field.is_empty() && (field.contains(&wanted) || wanted.contains(&field)) {
			return true;
		}
	}

	!normalize::find_bounded(title, &wanted).is_empty()
}
