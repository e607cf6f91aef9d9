mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, ENTITY_TYPES, Extractor, Filter, IntentTopK, Lexicon, LexiconSource,
	LlmProviderConfig, ProviderConfig, Providers, Query, Scoring, ScoringDiversity,
	ScoringThreshold, ScoringWeights, Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw, path)
}

/// Parses `raw` as if it had been read from `origin`. Relative source paths resolve against the
/// directory of `origin`.
pub fn parse(raw: &str, origin: &Path) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: origin.to_path_buf(), source: err })?;

	normalize(&mut cfg, origin.parent());

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.lexicon.min_value_chars == 0 {
		return Err(Error::Validation {
			message: "lexicon.min_value_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.lexicon.min_token_chars == 0 {
		return Err(Error::Validation {
			message: "lexicon.min_token_chars must be greater than zero.".to_string(),
		});
	}

	for source in &cfg.lexicon.sources {
		if !ENTITY_TYPES.contains(&source.entity_type.trim().to_ascii_uppercase().as_str()) {
			return Err(Error::Validation {
				message: format!(
					"lexicon.sources.entity_type {} must be one of {}.",
					source.entity_type,
					ENTITY_TYPES.join(", ")
				),
			});
		}
		if source.path.is_some() != source.column.is_some() {
			return Err(Error::Validation {
				message: "lexicon.sources.path and lexicon.sources.column must be set together."
					.to_string(),
			});
		}
		if source.path.is_none() && source.extra_values.is_empty() {
			return Err(Error::Validation {
				message: "lexicon.sources must define a path or extra_values.".to_string(),
			});
		}
	}

	for (label, value) in [
		("extractor.fuzzy_cutoff", cfg.extractor.fuzzy_cutoff),
		("extractor.coverage_min", cfg.extractor.coverage_min),
		("extractor.overlap_keep_score", cfg.extractor.overlap_keep_score),
		("filter.min_span_score", cfg.filter.min_span_score),
		("scoring.threshold.dropoff_ratio", cfg.scoring.threshold.dropoff_ratio),
		("scoring.diversity.max_promotional_ratio", cfg.scoring.diversity.max_promotional_ratio),
	] {
		if !value.is_finite() || !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if cfg.extractor.fuzzy_min_token_chars == 0 {
		return Err(Error::Validation {
			message: "extractor.fuzzy_min_token_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.extractor.coverage_max_products == 0 {
		return Err(Error::Validation {
			message: "extractor.coverage_max_products must be greater than zero.".to_string(),
		});
	}

	validate_type_priority(&cfg.extractor.type_priority)?;
	validate_weight_brackets(&cfg.query.weight_brackets)?;

	if !cfg.query.open_weight_max.is_finite() || cfg.query.open_weight_max <= 0.0 {
		return Err(Error::Validation {
			message: "query.open_weight_max must be a positive finite number.".to_string(),
		});
	}
	if cfg.filter.product_cap == 0 || cfg.filter.short_query_product_cap == 0 {
		return Err(Error::Validation {
			message: "filter.product_cap and filter.short_query_product_cap must be greater than zero."
				.to_string(),
		});
	}
	if cfg.scoring.candidate_multiplier == 0 {
		return Err(Error::Validation {
			message: "scoring.candidate_multiplier must be greater than zero.".to_string(),
		});
	}
	if cfg.scoring.adaptive_k_cap == 0 {
		return Err(Error::Validation {
			message: "scoring.adaptive_k_cap must be greater than zero.".to_string(),
		});
	}

	let top_k = &cfg.scoring.intent_top_k;

	if [top_k.search, top_k.recommend, top_k.smalltalk, top_k.out_of_scope].contains(&0) {
		return Err(Error::Validation {
			message: "scoring.intent_top_k values must be greater than zero.".to_string(),
		});
	}

	let weights = &cfg.scoring.weights;

	for (label, value) in [
		("semantic", weights.semantic),
		("keyword", weights.keyword),
		("exact_attribute", weights.exact_attribute),
		("brand", weights.brand),
		("name", weights.name),
		("weight_fit", weights.weight_fit),
		("commercial", weights.commercial),
		("dosage", weights.dosage),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("scoring.weights.{label} must be a finite number zero or greater."),
			});
		}
	}

	let threshold = &cfg.scoring.threshold;

	for (label, value) in [
		("product_floor", threshold.product_floor),
		("brand_floor", threshold.brand_floor),
		("attribute_floor", threshold.attribute_floor),
		("open_floor", threshold.open_floor),
		("category_floor", threshold.category_floor),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!(
					"scoring.threshold.{label} must be a finite number zero or greater."
				),
			});
		}
	}

	for (label, key) in [
		("oracle", &cfg.providers.oracle.api_key),
		("retrieval", &cfg.providers.retrieval.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if !cfg.providers.oracle.temperature.is_finite() || cfg.providers.oracle.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.oracle.temperature must be zero or greater.".to_string(),
		});
	}

	Ok(())
}

fn validate_type_priority(priority: &[String]) -> Result<()> {
	let complete = priority.len() == ENTITY_TYPES.len()
		&& ENTITY_TYPES.iter().all(|ty| {
			priority.iter().filter(|p| p.trim().eq_ignore_ascii_case(ty)).count() == 1
		});

	if !complete {
		return Err(Error::Validation {
			message: format!(
				"extractor.type_priority must list each of {} exactly once.",
				ENTITY_TYPES.join(", ")
			),
		});
	}

	Ok(())
}

fn validate_weight_brackets(brackets: &[[f32; 2]]) -> Result<()> {
	if brackets.is_empty() {
		return Err(Error::Validation {
			message: "query.weight_brackets must be non-empty.".to_string(),
		});
	}

	let mut previous_upper = f32::NEG_INFINITY;

	for [lower, upper] in brackets {
		if !lower.is_finite() || !upper.is_finite() || lower < &0.0 || lower >= upper {
			return Err(Error::Validation {
				message: "query.weight_brackets entries must satisfy 0 <= lower < upper."
					.to_string(),
			});
		}
		if *upper <= previous_upper {
			return Err(Error::Validation {
				message: "query.weight_brackets must be sorted by ascending upper bound."
					.to_string(),
			});
		}

		previous_upper = *upper;
	}

	Ok(())
}

fn normalize(cfg: &mut Config, base_dir: Option<&Path>) {
	for source in &mut cfg.lexicon.sources {
		source.entity_type = source.entity_type.trim().to_ascii_uppercase();

		if let Some(base_dir) = base_dir
			&& let Some(path) = source.path.as_ref()
			&& path.is_relative()
		{
			source.path = Some(base_dir.join(path));
		}
	}

	for ty in &mut cfg.extractor.type_priority {
		*ty = ty.trim().to_ascii_uppercase();
	}

	for list in [
		&mut cfg.lexicon.stop_terms,
		&mut cfg.lexicon.species_synonyms,
		&mut cfg.extractor.stop_words,
		&mut cfg.query.offer_keywords,
		&mut cfg.query.transfer_keywords,
		&mut cfg.query.smalltalk_keywords,
		&mut cfg.query.recommend_keywords,
		&mut cfg.filter.stop_words,
		&mut cfg.filter.presentation_terms,
		&mut cfg.filter.placeholder_brands,
		&mut cfg.filter.hallucination_patterns,
	] {
		normalize_terms(list);
	}

	// Prefixes keep their trailing separator.
	for prefix in &mut cfg.filter.brand_label_prefixes {
		*prefix = prefix.to_lowercase();
	}

	cfg.filter.brand_label_prefixes.retain(|prefix| !prefix.trim().is_empty());
}

fn normalize_terms(terms: &mut Vec<String>) {
	for term in terms.iter_mut() {
		*term = term.trim().to_lowercase();
	}

	terms.retain(|term| !term.is_empty());
}
