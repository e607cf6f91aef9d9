use std::sync::LazyLock;

use regex::Regex;

use crate::extractor::EntityExtractor;
use vetq_config::Query as QueryConfig;
use vetq_domain::{Dosage, Intent, NumericModifiers, QueryIntent, normalize, weight};

static DOSAGE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*(mg|ml|gr?)\b").ok());

#[derive(Clone, Debug)]
pub struct QuerySettings {
	pub offer_keywords: Vec<String>,
	pub transfer_keywords: Vec<String>,
	pub smalltalk_keywords: Vec<String>,
	pub recommend_keywords: Vec<String>,
	pub weight_brackets: Vec<[f32; 2]>,
	pub open_weight_max: f32,
}
impl QuerySettings {
	pub fn from_config(cfg: &QueryConfig) -> Self {
		Self {
			offer_keywords: normalized(&cfg.offer_keywords),
			transfer_keywords: normalized(&cfg.transfer_keywords),
			smalltalk_keywords: normalized(&cfg.smalltalk_keywords),
			recommend_keywords: normalized(&cfg.recommend_keywords),
			weight_brackets: cfg.weight_brackets.clone(),
			open_weight_max: cfg.open_weight_max,
		}
	}
}

impl Default for QuerySettings {
	fn default() -> Self {
		Self::from_config(&QueryConfig::default())
	}
}

/// Turns a raw query into a [`QueryIntent`]: entities, numeric modifiers, and the conversational
/// intent.
pub struct QueryAnalyzer {
	extractor: EntityExtractor,
	settings: QuerySettings,
}
impl QueryAnalyzer {
	pub fn new(extractor: EntityExtractor, settings: QuerySettings) -> Self {
		Self { extractor, settings }
	}

	pub fn extractor(&self) -> &EntityExtractor {
		&self.extractor
	}

	pub fn settings(&self) -> &QuerySettings {
		&self.settings
	}

	pub fn analyze(&self, query: &str) -> QueryIntent {
		let normalized_query = normalize::normalize_text(query);
		let tokens = normalize::tokenize(&normalized_query);
		let modifiers = self.modifiers(&normalized_query, &tokens);
		let intent = self.detect_intent(&normalized_query, &tokens);
		let entities = if intent == Intent::Smalltalk || tokens.is_empty() {
			Vec::new()
		} else {
			self.extractor.extract_normalized(&normalized_query)
		};
		let confidence = confidence(entities.len(), &modifiers);

		tracing::debug!(
			intent = intent.as_str(),
			entities = entities.len(),
			weight = ?modifiers.weight,
			dosage = ?modifiers.dosage,
			is_offer = modifiers.is_offer,
			is_transfer = modifiers.is_transfer,
			"Query analyzed."
		);

		QueryIntent {
			query: query.to_string(),
			normalized_query,
			intent,
			entities,
			modifiers,
			confidence,
		}
	}

	/// Dosage, weight hint, and promotion flags. `text` must already be normalized.
	pub fn modifiers(&self, text: &str, tokens: &[&str]) -> NumericModifiers {
		NumericModifiers {
			dosage: parse_dosage(text),
			weight: weight::from_text(
				text,
				&self.settings.weight_brackets,
				self.settings.open_weight_max,
			),
			is_offer: mentions_any(text, tokens, &self.settings.offer_keywords),
			is_transfer: mentions_any(text, tokens, &self.settings.transfer_keywords),
		}
	}

	fn detect_intent(&self, text: &str, tokens: &[&str]) -> Intent {
		if tokens.is_empty() {
			return Intent::OutOfScope;
		}

		let stop_words = &self.extractor.settings().stop_words;
		let is_smalltalk = |token: &str| {
			self.settings.smalltalk_keywords.iter().any(|keyword| keyword == token)
		};

		if tokens.iter().copied().any(is_smalltalk) {
			let meaningful = tokens.iter().copied().any(|token| {
				!is_smalltalk(token) && token.len() >= 3 && !stop_words.contains(token)
			});

			if !meaningful {
				return Intent::Smalltalk;
			}
		}
		if mentions_any(text, tokens, &self.settings.recommend_keywords) {
			return Intent::Recommend;
		}

		Intent::Search
	}
}

fn normalized(terms: &[String]) -> Vec<String> {
	terms
		.iter()
		.map(|term| normalize::normalize_text(term))
		.filter(|term| !term.is_empty())
		.collect()
}

fn parse_dosage(text: &str) -> Option<Dosage> {
	let captures = DOSAGE.as_ref()?.captures(text)?;
	let value = captures.get(1)?.as_str().replace(',', ".").parse::<f32>().ok()?;
	let unit = captures.get(2)?.as_str().to_string();

	Some(Dosage { value, unit })
}

/// Phrases match on word boundaries, short keywords need the whole token, longer ones match as a
/// token prefix (`promo` matches `promocion`).
fn mentions_any(text: &str, tokens: &[&str], keywords: &[String]) -> bool {
	keywords.iter().any(|keyword| {
		if keyword.contains(' ') {
			!normalize::find_bounded(text, keyword).is_empty()
		} else if keyword.len() <= 3 {
			tokens.iter().any(|token| *token == keyword.as_str())
		} else {
			tokens.iter().any(|token| token.starts_with(keyword.as_str()))
		}
	})
}

fn confidence(entity_count: usize, modifiers: &NumericModifiers) -> f32 {
	let mut score = 0.5 + 0.2 * entity_count as f32;

	if !modifiers.is_empty() {
		score += 0.1;
	}

	score.min(1.0)
}
