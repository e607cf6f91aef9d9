use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

pub const ENTITY_TYPES: [&str; 7] =
	["PRODUCT", "BRAND", "CATEGORY", "DRUG", "ACTION", "CONCEPT", "SPECIES"];

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub lexicon: Lexicon,
	#[serde(default)]
	pub extractor: Extractor,
	#[serde(default)]
	pub query: Query,
	#[serde(default)]
	pub filter: Filter,
	#[serde(default)]
	pub scoring: Scoring,
	pub providers: Providers,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Lexicon {
	/// Generic catalog words that never become vocabulary entries.
	pub stop_terms: Vec<String>,
	pub min_value_chars: usize,
	pub min_token_chars: usize,
	pub species_synonyms: Vec<String>,
	pub pluralize_species: bool,
	pub sources: Vec<LexiconSource>,
}
impl Default for Lexicon {
	fn default() -> Self {
		Self {
			stop_terms: strings(&[
				"para",
				"con",
				"sin",
				"los",
				"las",
				"una",
				"unos",
				"del",
				"por",
				"uso",
				"veterinario",
				"envase",
				"caja",
				"peso",
				"vivo",
				"kpv",
				"kilos",
				"comprimido",
				"comprimidos",
				"accion",
				"terapeutica",
				"tratamiento",
				"enfermedades",
				"amplio",
				"espectro",
				"via",
				"oral",
				"producto",
				"productos",
				"lista",
				"precio",
				"venta",
			]),
			min_value_chars: 3,
			min_token_chars: 4,
			species_synonyms: strings(&[
				"canino", "felino", "cachorro", "gatito", "equino", "bovino", "perro", "gato",
				"pulga", "garrapata",
			]),
			pluralize_species: true,
			sources: Vec::new(),
		}
	}
}

/// One reference column feeding one entity type. A source without `path` only contributes
/// `extra_values`.
#[derive(Debug, Clone, Deserialize)]
pub struct LexiconSource {
	pub entity_type: String,
	pub path: Option<PathBuf>,
	pub column: Option<String>,
	#[serde(default)]
	pub delimiters: Vec<String>,
	#[serde(default)]
	pub tokenize: bool,
	#[serde(default)]
	pub extra_values: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Extractor {
	pub fuzzy_cutoff: f32,
	pub fuzzy_min_token_chars: usize,
	pub coverage_min: f32,
	pub coverage_max_products: usize,
	/// Spans scoring above this survive partial overlaps with stronger spans.
	pub overlap_keep_score: f32,
	pub type_priority: Vec<String>,
	pub stop_words: Vec<String>,
}
impl Default for Extractor {
	fn default() -> Self {
		Self {
			fuzzy_cutoff: 0.85,
			fuzzy_min_token_chars: 4,
			coverage_min: 0.3,
			coverage_max_products: 40,
			overlap_keep_score: 0.9,
			type_priority: strings(&ENTITY_TYPES),
			stop_words: strings(&[
				"de", "la", "el", "los", "las", "un", "una", "unos", "unas", "y", "o", "a", "en",
				"con", "sin", "para", "por", "del", "al", "que", "mi", "me", "tu", "su", "lo", "le",
				"se", "es", "hay", "busco", "necesito", "quiero", "tenes", "tienen", "precio",
			]),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Query {
	pub offer_keywords: Vec<String>,
	pub transfer_keywords: Vec<String>,
	pub smalltalk_keywords: Vec<String>,
	pub recommend_keywords: Vec<String>,
	/// Standard package size brackets, in kilograms, ascending.
	pub weight_brackets: Vec<[f32; 2]>,
	/// Upper bound used when a query only states a minimum weight.
	pub open_weight_max: f32,
}
impl Default for Query {
	fn default() -> Self {
		Self {
			offer_keywords: strings(&[
				"oferta",
				"off",
				"desc",
				"promo",
				"descuento",
				"rebaja",
				"liquidacion",
			]),
			transfer_keywords: strings(&[
				"transfer", "bonif", "regalo", "regla", "combo", "pack", "bm",
			]),
			smalltalk_keywords: strings(&[
				"hola", "hey", "buenos", "buenas", "dias", "tardes", "noches", "como", "andas",
				"estas", "gracias", "chau", "adios",
			]),
			recommend_keywords: strings(&[
				"recomiend",
				"sugier",
				"que usar",
				"que darle",
				"que le doy",
				"ayuda con",
				"necesito para",
				"tiene para",
				"sirve para",
			]),
			weight_brackets: vec![
				[0.0, 4.0],
				[4.0, 10.0],
				[10.0, 20.0],
				[20.0, 40.0],
				[40.0, 60.0],
				[60.0, 100.0],
			],
			open_weight_max: 999.0,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Filter {
	pub stop_words: Vec<String>,
	pub presentation_terms: Vec<String>,
	pub placeholder_brands: Vec<String>,
	/// Generic prefixes stripped from brand values, e.g. "laboratorio ".
	pub brand_label_prefixes: Vec<String>,
	pub hallucination_patterns: Vec<String>,
	pub min_span_score: f32,
	pub min_value_chars: usize,
	pub short_query_tokens: usize,
	pub short_query_product_cap: usize,
	pub product_cap: usize,
	pub history_limit: usize,
}
impl Default for Filter {
	fn default() -> Self {
		Self {
			stop_words: strings(&[
				"pero", "aunque", "sin", "embargo", "con", "que", "para", "de", "en", "y", "o", "a",
				"la", "el", "los", "las", "un", "una", "unos", "unas", "al", "del",
			]),
			presentation_terms: strings(&[
				"gotas",
				"pipeta",
				"pipetas",
				"comprimidos",
				"comprimido",
				"tabletas",
				"inyectable",
				"shampoo",
				"spray",
				"collar",
				"difusor",
				"crema",
				"gel",
				"pomada",
				"solucion",
				"suspension",
				"jarabe",
			]),
			placeholder_brands: strings(&[
				"no detected",
				"not detected",
				"none",
				"null",
				"n/a",
				"no brand",
				"unknown",
				"not specified",
				"not found",
				"no laboratorio",
				"sin laboratorio",
				"no lab",
			]),
			brand_label_prefixes: strings(&["laboratorio ", "lab. ", "lab "]),
			hallucination_patterns: strings(&[
				"que no sea x",
				"menos x",
				"x",
				"y",
				"specific brand",
				"brand name",
				"excluded brand",
				"[brand]",
				"<brand>",
				"marca",
				"lab",
				"laboratorio",
			]),
			min_span_score: 0.5,
			min_value_chars: 3,
			short_query_tokens: 5,
			short_query_product_cap: 5,
			product_cap: 20,
			history_limit: 2,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Scoring {
	pub candidate_multiplier: u32,
	pub adaptive_k_cap: u32,
	pub min_results: usize,
	pub intent_top_k: IntentTopK,
	pub weights: ScoringWeights,
	pub threshold: ScoringThreshold,
	pub diversity: ScoringDiversity,
}
impl Default for Scoring {
	fn default() -> Self {
		Self {
			candidate_multiplier: 10,
			adaptive_k_cap: 15,
			min_results: 3,
			intent_top_k: IntentTopK::default(),
			weights: ScoringWeights::default(),
			threshold: ScoringThreshold::default(),
			diversity: ScoringDiversity::default(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntentTopK {
	pub search: u32,
	pub recommend: u32,
	pub smalltalk: u32,
	pub out_of_scope: u32,
}
impl Default for IntentTopK {
	fn default() -> Self {
		Self { search: 8, recommend: 4, smalltalk: 3, out_of_scope: 3 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
	pub semantic: f32,
	pub keyword: f32,
	pub exact_attribute: f32,
	pub brand: f32,
	pub name: f32,
	pub weight_fit: f32,
	pub commercial: f32,
	pub dosage: f32,
}
impl Default for ScoringWeights {
	fn default() -> Self {
		Self {
			semantic: 1.0,
			keyword: 2.0,
			exact_attribute: 1.0,
			brand: 1.0,
			name: 1.0,
			weight_fit: 1.0,
			commercial: 1.0,
			dosage: 0.5,
		}
	}
}

/// Score floors per filter specificity. The effective threshold is the larger of the floor and
/// `top_score * dropoff_ratio`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScoringThreshold {
	pub dropoff_ratio: f32,
	pub product_floor: f32,
	pub brand_floor: f32,
	pub attribute_floor: f32,
	pub open_floor: f32,
	pub category_floor: f32,
}
impl Default for ScoringThreshold {
	fn default() -> Self {
		Self {
			dropoff_ratio: 0.65,
			product_floor: 4.0,
			brand_floor: 3.0,
			attribute_floor: 2.0,
			open_floor: 1.0,
			category_floor: 0.5,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScoringDiversity {
	pub enabled: bool,
	pub max_promotional_ratio: f32,
	pub min_ordinary: usize,
	pub min_promotional: usize,
}
impl Default for ScoringDiversity {
	fn default() -> Self {
		Self { enabled: true, max_promotional_ratio: 0.3, min_ordinary: 2, min_promotional: 1 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub oracle: LlmProviderConfig,
	pub retrieval: ProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn strings(values: &[&str]) -> Vec<String> {
	values.iter().map(|value| value.to_string()).collect()
}
