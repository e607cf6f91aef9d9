//! Derives a validated [`FilterSet`] from extracted entities and an untrusted oracle draft.

use std::{
	collections::{BTreeMap, HashSet},
	sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OracleProvider;
use vetq_config::{Filter as FilterConfig, LlmProviderConfig};
use vetq_domain::{
	EntitySpan, EntityType, FilterSet, QueryIntent, SearchSummary, WeightRange, normalize,
};

const EXCLUSION_CUES: [&str; 4] = ["no sea", "menos", "excepto", "salvo"];

static NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").ok());

#[derive(Debug, thiserror::Error)]
pub enum OracleFailure {
	#[error("Oracle unavailable: {message}")]
	Unavailable { message: String },
	#[error("Oracle output malformed: {message}")]
	Malformed { message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSource {
	Oracle,
	Fallback,
	/// No filters were needed, e.g. for smalltalk.
	Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
	Rejected,
	StrippedPrefix,
	MovedToPresentation,
	NotInQuery,
	ReplacedFromQuery,
	Swapped,
}

/// One correction applied to the oracle draft.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterRepair {
	pub field: String,
	pub action: RepairAction,
	pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterOutcome {
	pub filters: FilterSet,
	pub source: FilterSource,
	pub repairs: Vec<FilterRepair>,
}

/// The oracle's answer before validation. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterDraft {
	pub search_input: Option<String>,
	pub brand: Option<String>,
	pub category: Option<String>,
	pub species: Option<String>,
	pub presentation: Option<String>,
	pub drug: Option<String>,
	pub weight_min: Option<f32>,
	pub weight_max: Option<f32>,
	pub is_offer: Option<bool>,
	pub is_transfer: Option<bool>,
	pub exclude_brands: Vec<String>,
}
impl FilterDraft {
	/// Reads a draft leniently: strings or one-element lists, numbers or numeric strings.
	pub fn from_value(value: &Value) -> Result<Self, OracleFailure> {
		let Some(object) = value.as_object() else {
			return Err(OracleFailure::Malformed {
				message: "Draft is not a JSON object.".to_string(),
			});
		};
		let filters = match object.get("search_filters") {
			None | Some(Value::Null) => None,
			Some(filters @ Value::Object(_)) => Some(filters),
			Some(_) => {
				return Err(OracleFailure::Malformed {
					message: "search_filters is not a JSON object.".to_string(),
				});
			},
		};
		let field = |key: &str| filters.and_then(|filters| filters.get(key));

		Ok(Self {
			search_input: text(object.get("search_input")),
			brand: text(field("brand")),
			category: text(field("category")),
			species: text(field("species")),
			presentation: text(field("presentation")),
			drug: text(field("drug")),
			weight_min: number(field("weight_min")),
			weight_max: number(field("weight_max")),
			is_offer: field("is_offer").and_then(Value::as_bool),
			is_transfer: field("is_transfer").and_then(Value::as_bool),
			exclude_brands: field("exclude_brands")
				.and_then(Value::as_array)
				.map(|items| items.iter().filter_map(|item| text(Some(item))).collect())
				.unwrap_or_default(),
		})
	}
}

pub struct FilterSettings {
	pub stop_words: HashSet<String>,
	pub presentation_terms: HashSet<String>,
	pub placeholder_brands: HashSet<String>,
	pub brand_label_prefixes: Vec<String>,
	pub hallucination_patterns: HashSet<String>,
	pub min_span_score: f32,
	pub min_value_chars: usize,
	pub short_query_tokens: usize,
	pub short_query_product_cap: usize,
	pub product_cap: usize,
	pub history_limit: usize,
	pub open_weight_max: f32,
}
impl FilterSettings {
	pub fn from_config(cfg: &FilterConfig, open_weight_max: f32) -> Self {
		Self {
			stop_words: normalized_set(&cfg.stop_words),
			presentation_terms: normalized_set(&cfg.presentation_terms),
			placeholder_brands: normalized_set(&cfg.placeholder_brands),
			brand_label_prefixes: cfg
				.brand_label_prefixes
				.iter()
				.map(|prefix| prefix.to_lowercase())
				.filter(|prefix| !prefix.trim().is_empty())
				.collect(),
			hallucination_patterns: cfg
				.hallucination_patterns
				.iter()
				.map(|pattern| pattern.trim().to_lowercase())
				.collect(),
			min_span_score: cfg.min_span_score,
			min_value_chars: cfg.min_value_chars,
			short_query_tokens: cfg.short_query_tokens,
			short_query_product_cap: cfg.short_query_product_cap,
			product_cap: cfg.product_cap,
			history_limit: cfg.history_limit,
			open_weight_max,
		}
	}
}

impl Default for FilterSettings {
	fn default() -> Self {
		Self::from_config(&FilterConfig::default(), 999.0)
	}
}

pub struct FilterBuilder {
	settings: FilterSettings,
}
impl FilterBuilder {
	pub fn new(settings: FilterSettings) -> Self {
		Self { settings }
	}

	pub fn settings(&self) -> &FilterSettings {
		&self.settings
	}

	/// Filters noisy spans, asks the oracle for a draft, and validates it. Never fails: oracle
	/// errors degrade to [`FilterSet::fallback`].
	pub async fn build(
		&self,
		oracle: &dyn OracleProvider,
		cfg: &LlmProviderConfig,
		intent: &QueryIntent,
		history: &[SearchSummary],
	) -> FilterOutcome {
		let spans = self.filter_noise(&intent.query, &intent.entities);
		let messages = self.messages(intent, &spans, history);
		let draft = match oracle.complete(cfg, &messages).await {
			Ok(value) => FilterDraft::from_value(&value),
			Err(err) => Err(OracleFailure::Unavailable { message: err.to_string() }),
		};

		match draft {
			Ok(draft) => {
				let (filters, repairs) = self.repair(draft, intent, &spans);

				FilterOutcome { filters, source: FilterSource::Oracle, repairs }
			},
			Err(err) => {
				tracing::warn!(error = %err, "Oracle draft unusable. Falling back to the raw query.");

				FilterOutcome {
					filters: FilterSet::fallback(&intent.query),
					source: FilterSource::Fallback,
					repairs: Vec::new(),
				}
			},
		}
	}

	/// Drops stop words, low scores and repeated values, relabels packaging terms, and caps
	/// product spans by query length.
	pub fn filter_noise(&self, query: &str, spans: &[EntitySpan]) -> Vec<EntitySpan> {
		let product_cap = if query.split_whitespace().count() < self.settings.short_query_tokens {
			self.settings.short_query_product_cap
		} else {
			self.settings.product_cap
		};
		let mut seen = HashSet::new();
		let mut products = 0;
		let mut out = Vec::new();

		for span in spans {
			let value = normalize::normalize_text(&span.value);

			if self.settings.stop_words.contains(&value) {
				continue;
			}

			let mut span = span.clone();

			if span.entity_type == EntityType::Species
				&& self.settings.presentation_terms.contains(&value)
			{
				span.entity_type = EntityType::Concept;
			}
			if span.entity_type == EntityType::Product {
				products += 1;

				if products > product_cap {
					continue;
				}
			}
			if !seen.insert(value) || span.match_score < self.settings.min_span_score {
				continue;
			}

			out.push(span);
		}

		out
	}

	pub fn messages(
		&self,
		intent: &QueryIntent,
		spans: &[EntitySpan],
		history: &[SearchSummary],
	) -> Vec<Value> {
		let mut by_type: BTreeMap<&str, Vec<Value>> = BTreeMap::new();

		for span in spans {
			by_type
				.entry(span.entity_type.as_str())
				.or_default()
				.push(serde_json::json!({ "value": span.value, "score": span.match_score }));
		}

		let recent = &history[history.len().saturating_sub(self.settings.history_limit)..];
		let schema = serde_json::json!({
			"search_input": "string",
			"search_filters": {
				"brand": "string|null",
				"category": "string|null",
				"species": "string|null",
				"presentation": "string|null",
				"drug": "string|null",
				"weight_min": "number|null",
				"weight_max": "number|null",
				"is_offer": "boolean",
				"is_transfer": "boolean",
				"exclude_brands": ["string"]
			}
		});
		let system_prompt = "You are a query optimizer for a veterinary product search system. \
Queries are in Spanish. Output must be valid JSON only and must match the provided schema exactly. \
Do not add explanations, markdown, or extra fields. \
Only use values that are explicitly mentioned in the query or listed in the detected entities. \
Presentations such as pipeta, gotas or comprimidos go in presentation, never in drug or species. \
species must be a single string. Use null for unknown values.";
		let user_prompt = format!(
			"Return JSON matching this exact schema:\n{schema}\nQuery:\n{query}\nDetected entities:\n{entities}\nNumeric modifiers:\n{modifiers}\nRecent searches:\n{history}\nHints:\n{hints}",
			schema = pretty(&schema),
			query = intent.query,
			entities = pretty(&serde_json::json!(by_type)),
			modifiers = pretty(&serde_json::json!(intent.modifiers)),
			history = pretty(&serde_json::json!(recent)),
			hints = self.hints(intent, spans).join("\n"),
		);

		vec![
			serde_json::json!({ "role": "system", "content": system_prompt }),
			serde_json::json!({ "role": "user", "content": user_prompt }),
		]
	}

	/// Validates a draft against the query. Every surviving value is traceable to a span or a
	/// literal substring of the query.
	pub fn repair(
		&self,
		draft: FilterDraft,
		intent: &QueryIntent,
		spans: &[EntitySpan],
	) -> (FilterSet, Vec<FilterRepair>) {
		let mut repairs = Repairs::default();
		let query = intent.normalized_query.as_str();
		let search_term = draft
			.search_input
			.as_deref()
			.map(str::trim)
			.filter(|term| !term.is_empty())
			.unwrap_or(intent.query.trim())
			.to_string();
		let mut presentation = draft.presentation;
		let brand = self.repair_brand(draft.brand, query, spans, &mut repairs);
		let category = self.traceable("category", draft.category, query, spans, &mut repairs);
		let species = match draft.species {
			Some(species) if self.is_presentation(&species) => {
				repairs.push("species", RepairAction::MovedToPresentation, &species);

				presentation.get_or_insert(species);

				None
			},
			Some(species) if !literal_in_query(query, &species) => {
				repairs.push("species", RepairAction::NotInQuery, &species);

				None
			},
			species => species,
		};
		let drug = match draft.drug {
			Some(drug) if self.is_presentation(&drug) => {
				repairs.push("drug", RepairAction::MovedToPresentation, &drug);

				presentation.get_or_insert(drug);

				None
			},
			drug => self.traceable("drug", drug, query, spans, &mut repairs),
		};
		let presentation = presentation.filter(|value| {
			let keep = literal_in_query(query, value);

			if !keep {
				repairs.push("presentation", RepairAction::NotInQuery, value);
			}

			keep
		});
		let (weight_min, weight_max) =
			self.repair_weights(draft.weight_min, draft.weight_max, intent, &mut repairs);
		let modifiers = &intent.modifiers;

		if draft.is_offer.is_some_and(|flag| flag != modifiers.is_offer) {
			repairs.push("is_offer", RepairAction::ReplacedFromQuery, modifiers.is_offer);
		}
		if draft.is_transfer.is_some_and(|flag| flag != modifiers.is_transfer) {
			repairs.push("is_transfer", RepairAction::ReplacedFromQuery, modifiers.is_transfer);
		}

		let exclude_brands = self.repair_exclusions(draft.exclude_brands, &mut repairs);
		let mut target_products = Vec::new();

		for span in spans.iter().filter(|span| span.entity_type == EntityType::Product) {
			if !target_products.contains(&span.value) {
				target_products.push(span.value.clone());
			}
		}

		let mut filters = FilterSet {
			search_term,
			brand,
			category,
			species,
			presentation,
			drug,
			weight_min,
			weight_max,
			exclude_brands,
			is_offer: modifiers.is_offer,
			is_transfer: modifiers.is_transfer,
			dosage_value: modifiers.dosage.as_ref().map(|dosage| dosage.value),
			target_products,
		};

		filters.enforce_invariants();

		(filters, repairs.into_inner())
	}

	fn repair_brand(
		&self,
		brand: Option<String>,
		query: &str,
		spans: &[EntitySpan],
		repairs: &mut Repairs,
	) -> Option<String> {
		let raw = brand?;
		let mut brand = raw.trim().to_string();

		if self.settings.placeholder_brands.contains(&normalize::normalize_text(&brand))
			|| brand.chars().count() < self.settings.min_value_chars
		{
			repairs.push("brand", RepairAction::Rejected, &raw);

			return None;
		}

		let lowered = brand.to_lowercase();

		if let Some(prefix) =
			self.settings.brand_label_prefixes.iter().find(|prefix| lowered.starts_with(*prefix))
			&& let Some(rest) = brand.get(prefix.len()..)
		{
			brand = rest.trim().to_string();

			repairs.push("brand", RepairAction::StrippedPrefix, &raw);

			if brand.chars().count() < self.settings.min_value_chars {
				return None;
			}
		}

		self.traceable("brand", Some(brand), query, spans, repairs)
	}

	fn traceable(
		&self,
		field: &str,
		value: Option<String>,
		query: &str,
		spans: &[EntitySpan],
		repairs: &mut Repairs,
	) -> Option<String> {
		let value = value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())?;
		let key = normalize::normalize_text(&value);
		let traced = spans.iter().any(|span| {
			normalize::normalize_text(&span.value) == key || span.source_text == key
		}) || !normalize::find_bounded(query, &key).is_empty();

		if traced {
			Some(value)
		} else {
			repairs.push(field, RepairAction::NotInQuery, &value);

			None
		}
	}

	fn repair_weights(
		&self,
		draft_min: Option<f32>,
		draft_max: Option<f32>,
		intent: &QueryIntent,
		repairs: &mut Repairs,
	) -> (Option<f32>, Option<f32>) {
		if let Some(range) = intent.modifiers.weight {
			let min = Some(range.min);
			let max = (range.max < self.settings.open_weight_max).then_some(range.max);

			if (draft_min, draft_max) != (min, max) {
				repairs.push("weight", RepairAction::ReplacedFromQuery, format_range(range));
			}

			return (min, max);
		}

		let numbers = query_numbers(&intent.normalized_query);
		let mut keep = |field: &str, value: Option<f32>| {
			let value = value.filter(|value| value.is_finite())?;

			if numbers.iter().any(|number| (number - value).abs() < 0.01) {
				Some(value)
			} else {
				repairs.push(field, RepairAction::NotInQuery, value);

				None
			}
		};
		let min = keep("weight_min", draft_min);
		let max = keep("weight_max", draft_max);

		match (min, max) {
			(Some(lower), Some(upper)) if lower > upper => {
				repairs.push("weight", RepairAction::Swapped, format!("{lower}-{upper}"));

				(Some(upper), Some(lower))
			},
			bounds => bounds,
		}
	}

	fn repair_exclusions(&self, brands: Vec<String>, repairs: &mut Repairs) -> Vec<String> {
		let mut seen = HashSet::new();
		let mut out = Vec::new();

		for raw in brands {
			let brand = raw.trim();
			let key = brand.to_lowercase();

			if self.settings.hallucination_patterns.contains(&key)
				|| brand.chars().count() < self.settings.min_value_chars
			{
				repairs.push("exclude_brands", RepairAction::Rejected, &raw);

				continue;
			}
			if seen.insert(key) {
				out.push(brand.to_string());
			}
		}

		out
	}

	fn is_presentation(&self, value: &str) -> bool {
		self.settings.presentation_terms.contains(&normalize::normalize_text(value))
	}

	fn hints(&self, intent: &QueryIntent, spans: &[EntitySpan]) -> Vec<String> {
		let mut hints = Vec::new();

		if let Some(brand) = spans.iter().find(|span| span.entity_type == EntityType::Brand) {
			hints.push(format!(
				"- Brand detected: '{}'. Use this exact value in brand, without a laboratory prefix.",
				brand.value
			));
		}
		if intent.normalized_query.chars().any(|ch| ch.is_ascii_digit()) {
			hints.push(
				"- A single weight such as '20kg' usually denotes the standard range ending at that \
weight, e.g. 10-20kg."
					.to_string(),
			);
		}
		if intent.modifiers.is_offer || intent.modifiers.is_transfer {
			hints.push(
				"- Do not put promotion words in search_input. Use is_offer or is_transfer instead."
					.to_string(),
			);
		}
		if EXCLUSION_CUES
			.iter()
			.any(|cue| !normalize::find_bounded(&intent.normalized_query, cue).is_empty())
		{
			hints.push(
				"- Only add exclude_brands for a specific brand the user names, e.g. 'que no sea \
Bravecto' gives [\"Bravecto\"]. Never add placeholders."
					.to_string(),
			);
		}
		if hints.is_empty() {
			hints.push("- None.".to_string());
		}

		hints
	}
}

#[derive(Default)]
struct Repairs(Vec<FilterRepair>);
impl Repairs {
	fn push(&mut self, field: &str, action: RepairAction, value: impl ToString) {
		let value = value.to_string();

		tracing::debug!(field, action = ?action, value = %value, "Filter draft repaired.");

		self.0.push(FilterRepair { field: field.to_string(), action, value });
	}

	fn into_inner(self) -> Vec<FilterRepair> {
		self.0
	}
}

/// Whether `value` occurs in the normalized query on word boundaries, allowing a plural or
/// singular variant.
fn literal_in_query(query: &str, value: &str) -> bool {
	let key = normalize::normalize_text(value);

	if key.is_empty() {
		return false;
	}

	let mut variants = vec![format!("{key}s"), format!("{key}es")];

	if let Some(stem) = key.strip_suffix("es") {
		variants.push(stem.to_string());
	}
	if let Some(stem) = key.strip_suffix('s') {
		variants.push(stem.to_string());
	}

	variants.insert(0, key);

	variants
		.iter()
		.filter(|variant| variant.len() >= 2)
		.any(|variant| !normalize::find_bounded(query, variant).is_empty())
}

fn query_numbers(text: &str) -> Vec<f32> {
	let Some(regex) = NUMBER.as_ref() else { return Vec::new() };

	regex.find_iter(text).filter_map(|m| m.as_str().replace(',', ".").parse().ok()).collect()
}

fn format_range(range: WeightRange) -> String {
	format!("{}-{}", range.min, range.max)
}

fn text(value: Option<&Value>) -> Option<String> {
	let raw = match value? {
		Value::String(raw) => raw.as_str(),
		Value::Array(items) => items.first()?.as_str()?,
		_ => return None,
	};
	let trimmed = raw.trim();

	if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
		None
	} else {
		Some(trimmed.to_string())
	}
}

fn number(value: Option<&Value>) -> Option<f32> {
	match value? {
		Value::Number(number) => number.as_f64().map(|n| n as f32),
		Value::String(raw) => raw.trim().replace(',', ".").parse().ok(),
		_ => None,
	}
}

fn normalized_set(terms: &[String]) -> HashSet<String> {
	terms
		.iter()
		.map(|term| normalize::normalize_text(term))
		.filter(|term| !term.is_empty())
		.collect()
}

fn pretty(value: &Value) -> String {
	serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use vetq_domain::{Intent, NumericModifiers};

	fn builder() -> FilterBuilder {
		FilterBuilder::new(FilterSettings::default())
	}

	#[test]
	fn number_pattern_compiles() {
		assert!(NUMBER.is_some());
	}

	fn intent(query: &str, modifiers: NumericModifiers) -> QueryIntent {
		QueryIntent {
			query: query.to_string(),
			normalized_query: normalize::normalize_text(query),
			intent: Intent::Search,
			entities: Vec::new(),
			modifiers,
			confidence: 0.5,
		}
	}

	fn span(ty: EntityType, value: &str, position: usize, score: f32) -> EntitySpan {
		EntitySpan::new(ty, value, position, value.len(), value.to_lowercase(), score)
			.expect("Failed to build span.")
	}

	#[test]
	fn noise_filter_relabels_and_caps() {
		let spans = vec![
			span(EntityType::Species, "GOTAS", 0, 1.0),
			span(EntityType::Concept, "CON", 6, 1.0),
			span(EntityType::Product, "A1", 0, 0.9),
			span(EntityType::Product, "A2", 0, 0.9),
			span(EntityType::Product, "A3", 0, 0.9),
			span(EntityType::Product, "A4", 0, 0.9),
			span(EntityType::Product, "A5", 0, 0.9),
			span(EntityType::Product, "A6", 0, 0.9),
			span(EntityType::Drug, "gotas", 0, 1.0),
			span(EntityType::Brand, "HOLLIDAY", 0, 0.4),
		];
		let filtered = builder().filter_noise("gotas con algo", &spans);

		assert_eq!(filtered[0].entity_type, EntityType::Concept);
		assert_eq!(filtered.iter().filter(|s| s.entity_type == EntityType::Product).count(), 5);
		assert!(filtered.iter().all(|s| s.value != "CON" && s.value != "HOLLIDAY"));
		assert_eq!(filtered.iter().filter(|s| s.value.eq_ignore_ascii_case("gotas")).count(), 1);
	}

	#[test]
	fn draft_parsing_is_lenient() {
		let draft = FilterDraft::from_value(&json!({
			"search_input": "pipeta",
			"search_filters": {
				"species": ["PERRO", "GATO"],
				"brand": "null",
				"weight_max": "20",
				"exclude_brands": ["Bravecto", 3]
			}
		}))
		.expect("Failed to parse draft.");

		assert_eq!(draft.species.as_deref(), Some("PERRO"));
		assert_eq!(draft.brand, None);
		assert_eq!(draft.weight_max, Some(20.0));
		assert_eq!(draft.exclude_brands, vec!["Bravecto".to_string()]);
		assert!(FilterDraft::from_value(&json!(["x"])).is_err());
		assert!(FilterDraft::from_value(&json!({ "search_filters": "none" })).is_err());
	}

	#[test]
	fn species_that_is_a_presentation_moves() {
		let draft = FilterDraft { species: Some("gotas".to_string()), ..Default::default() };
		let (filters, repairs) =
			builder().repair(draft, &intent("gotas para perro", NumericModifiers::default()), &[]);

		assert_eq!(filters.species, None);
		assert_eq!(filters.presentation.as_deref(), Some("gotas"));
		assert_eq!(repairs[0].action, RepairAction::MovedToPresentation);
	}

	#[test]
	fn hallucinated_exclusions_are_dropped() {
		let draft = FilterDraft {
			exclude_brands: vec!["x".to_string(), "marca".to_string()],
			..Default::default()
		};
		let (filters, _) = builder().repair(
			draft,
			&intent("antiparasitario que no sea x", NumericModifiers::default()),
			&[],
		);

		assert!(filters.exclude_brands.is_empty());
	}

	#[test]
	fn inferred_values_are_dropped() {
		let draft = FilterDraft {
			search_input: Some("Power Gold".to_string()),
			species: Some("PERRO".to_string()),
			presentation: Some("pipeta".to_string()),
			brand: Some("Brouwer".to_string()),
			weight_min: Some(10.0),
			weight_max: Some(20.0),
			is_offer: Some(true),
			..Default::default()
		};
		let (filters, repairs) =
			builder().repair(draft, &intent("Power Gold", NumericModifiers::default()), &[]);

		assert_eq!(filters.search_term, "Power Gold");
		assert_eq!(filters.species, None);
		assert_eq!(filters.presentation, None);
		assert_eq!(filters.brand, None);
		assert_eq!((filters.weight_min, filters.weight_max), (None, None));
		assert!(!filters.is_offer);
		assert!(repairs.iter().any(|r| r.field == "is_offer"));
	}

	#[test]
	fn species_tolerates_plurals() {
		let draft = FilterDraft { species: Some("PERRO".to_string()), ..Default::default() };
		let (filters, _) =
			builder().repair(draft, &intent("pipetas para perros", NumericModifiers::default()), &[]);

		assert_eq!(filters.species.as_deref(), Some("PERRO"));
	}

	#[test]
	fn brand_prefix_is_stripped_and_traced() {
		let spans = [span(EntityType::Brand, "HOLLIDAY", 0, 1.0)];
		let draft = FilterDraft {
			brand: Some("Laboratorio Holliday".to_string()),
			exclude_brands: vec!["holliday".to_string(), "Brouwer".to_string(), "BROUWER".to_string()],
			..Default::default()
		};
		let (filters, repairs) = builder().repair(
			draft,
			&intent("holliday que no sea brouwer", NumericModifiers::default()),
			&spans,
		);

		assert_eq!(filters.brand.as_deref(), Some("Holliday"));
		assert_eq!(filters.exclude_brands, vec!["Brouwer".to_string()]);
		assert!(repairs.iter().any(|r| r.action == RepairAction::StrippedPrefix));
	}

	#[test]
	fn query_weights_win_and_literal_weights_survive() {
		let modifiers = NumericModifiers {
			weight: WeightRange::new(4.0, 10.0),
			..Default::default()
		};
		let draft = FilterDraft {
			weight_min: Some(10.0),
			weight_max: Some(20.0),
			..Default::default()
		};
		let (filters, _) =
			builder().repair(draft, &intent("power gold de 10kg", modifiers), &[]);

		assert_eq!((filters.weight_min, filters.weight_max), (Some(4.0), Some(10.0)));

		let draft = FilterDraft {
			weight_min: Some(25.0),
			weight_max: Some(15.0),
			..Default::default()
		};
		let (filters, _) =
			builder().repair(draft, &intent("perro entre 15 y 25", NumericModifiers::default()), &[]);

		assert_eq!((filters.weight_min, filters.weight_max), (Some(15.0), Some(25.0)));
	}

	#[test]
	fn history_is_limited_in_prompt() {
		let history: Vec<SearchSummary> = ["uno", "dos", "tres"]
			.iter()
			.map(|query| SearchSummary {
				query: query.to_string(),
				intent: Intent::Search,
				entities: Vec::new(),
			})
			.collect();
		let messages =
			builder().messages(&intent("collar", NumericModifiers::default()), &[], &history);
		let user = messages[1]["content"].as_str().expect("Failed to read user prompt.");

		assert!(!user.contains("\"uno\""));
		assert!(user.contains("\"dos\"") && user.contains("\"tres\""));
	}
}
