use std::{
	collections::{BTreeMap, HashMap, HashSet},
	fs::File,
	io::Read,
	path::Path,
	sync::LazyLock,
};

use regex::Regex;

use crate::error::LexiconLoadError;
use vetq_config::{Lexicon as LexiconConfig, LexiconSource};
use vetq_domain::{EntityType, normalize};

const WRAPPING_PUNCTUATION: &[char] = &['.', ':', ';', ',', '"', '\''];
const PLACEHOLDER_CELLS: [&str; 5] = ["0", "n/a", "na", "none", "nan"];

static PARENTHESIZED: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\([^)]*\)").ok());
static MEASUREMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"^\d+(?:[.,]\d+)?\s*(?:kgs?|kilos?|mg|ml|gr?|cc|l|lts?|mcg)$").ok()
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexiconEntry {
	/// Spelling as first seen in the reference data.
	pub value: String,
	/// Normalized form used for matching.
	pub key: String,
}

#[derive(Debug, Default)]
struct Vocabulary {
	entries: Vec<LexiconEntry>,
	by_key: HashMap<String, usize>,
}
impl Vocabulary {
	fn insert(&mut self, value: String, key: String) -> bool {
		if self.by_key.contains_key(&key) {
			return false;
		}

		self.by_key.insert(key.clone(), self.entries.len());
		self.entries.push(LexiconEntry { value, key });

		true
	}

	fn retain(&mut self, mut keep: impl FnMut(&LexiconEntry) -> bool) {
		self.entries.retain(|entry| keep(entry));
		self.by_key =
			self.entries.iter().enumerate().map(|(idx, entry)| (entry.key.clone(), idx)).collect();
	}
}

/// Per-type vocabularies plus the product indices used for coverage and root matching.
///
/// Built once and shared read-only.
#[derive(Debug, Default)]
pub struct EntityLexicon {
	vocab: HashMap<EntityType, Vocabulary>,
	product_tokens: Vec<HashSet<String>>,
	roots: BTreeMap<String, Vec<usize>>,
	stop_terms: HashSet<String>,
}
impl EntityLexicon {
	/// Loads every configured source. Failed sources are logged, reported, and skipped.
	pub fn load(cfg: &LexiconConfig, stop_words: &[String]) -> (Self, Vec<LexiconLoadError>) {
		let mut builder = LexiconBuilder::new(cfg, stop_words);
		let mut errors = Vec::new();

		for source in &cfg.sources {
			match builder.load_source(source) {
				Ok(count) => {
					tracing::debug!(
						entity_type = %source.entity_type,
						path = ?source.path,
						count,
						"Lexicon source loaded."
					);
				},
				Err(err) => {
					tracing::warn!(
						error = %err,
						entity_type = %source.entity_type,
						path = ?source.path,
						"Lexicon source failed to load."
					);

					errors.push(err);
				},
			}
		}

		let lexicon = builder.build();

		tracing::info!(
			products = lexicon.entries(EntityType::Product).len(),
			entries = lexicon.len(),
			roots = lexicon.roots.len(),
			"Entity lexicon ready."
		);

		(lexicon, errors)
	}

	pub fn entries(&self, ty: EntityType) -> &[LexiconEntry] {
		self.vocab.get(&ty).map(|vocab| vocab.entries.as_slice()).unwrap_or(&[])
	}

	pub fn len(&self) -> usize {
		self.vocab.values().map(|vocab| vocab.entries.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains(&self, ty: EntityType, value: &str) -> bool {
		self.lookup(ty, &normalize::normalize_text(value)).is_some()
	}

	/// Entry for an already-normalized key.
	pub fn lookup(&self, ty: EntityType, key: &str) -> Option<&LexiconEntry> {
		let vocab = self.vocab.get(&ty)?;

		vocab.by_key.get(key).map(|idx| &vocab.entries[*idx])
	}

	pub fn product_tokens(&self, product_idx: usize) -> Option<&HashSet<String>> {
		self.product_tokens.get(product_idx)
	}

	/// Product roots in lexical order with the indices of the products sharing them.
	pub fn roots(&self) -> impl Iterator<Item = (&str, &[usize])> {
		self.roots.iter().map(|(root, products)| (root.as_str(), products.as_slice()))
	}

	pub fn products_for_root(&self, root: &str) -> &[usize] {
		self.roots.get(root).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn is_stop_term(&self, token: &str) -> bool {
		self.stop_terms.contains(token)
	}
}

pub struct LexiconBuilder {
	vocab: HashMap<EntityType, Vocabulary>,
	stop_terms: HashSet<String>,
	token_stop_words: HashSet<String>,
	min_value_chars: usize,
	min_token_chars: usize,
	species_synonyms: Vec<String>,
	pluralize_species: bool,
}
impl LexiconBuilder {
	/// `stop_words` are dropped from product token sets in addition to the lexicon stop terms.
	pub fn new(cfg: &LexiconConfig, stop_words: &[String]) -> Self {
		let stop_terms: HashSet<String> =
			cfg.stop_terms.iter().map(|term| normalize::normalize_text(term)).collect();
		let mut token_stop_words = stop_terms.clone();

		token_stop_words.extend(stop_words.iter().map(|word| normalize::normalize_text(word)));

		Self {
			vocab: HashMap::new(),
			stop_terms,
			token_stop_words,
			min_value_chars: cfg.min_value_chars,
			min_token_chars: cfg.min_token_chars,
			species_synonyms: cfg.species_synonyms.clone(),
			pluralize_species: cfg.pluralize_species,
		}
	}

	pub fn load_source(&mut self, source: &LexiconSource) -> Result<usize, LexiconLoadError> {
		let ty = EntityType::parse(&source.entity_type).ok_or_else(|| {
			LexiconLoadError::UnknownType { entity_type: source.entity_type.clone() }
		})?;
		let mut added = 0;

		if let (Some(path), Some(column)) = (source.path.as_ref(), source.column.as_ref()) {
			let file = File::open(path)
				.map_err(|err| LexiconLoadError::Open { path: path.clone(), source: err })?;

			added +=
				self.load_csv(ty, file, path, column, &source.delimiters, source.tokenize)?;
		}

		for value in &source.extra_values {
			if self.add_value(ty, value) {
				added += 1;
			}
		}

		Ok(added)
	}

	/// Reads one column of a headed CSV stream. Nothing is added when any record fails.
	pub fn load_csv<R>(
		&mut self,
		ty: EntityType,
		reader: R,
		origin: &Path,
		column: &str,
		delimiters: &[String],
		tokenize: bool,
	) -> Result<usize, LexiconLoadError>
	where
		R: Read,
	{
		let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
		let headers = reader
			.headers()
			.map_err(|err| LexiconLoadError::Record { path: origin.to_path_buf(), source: err })?;
		let Some(column_idx) =
			headers.iter().position(|header| header.trim().eq_ignore_ascii_case(column.trim()))
		else {
			return Err(LexiconLoadError::MissingColumn {
				path: origin.to_path_buf(),
				column: column.to_string(),
			});
		};
		let mut cells = Vec::new();

		for record in reader.records() {
			let record = record
				.map_err(|err| LexiconLoadError::Record { path: origin.to_path_buf(), source: err })?;

			if let Some(cell) = record.get(column_idx) {
				cells.push(cell.to_string());
			}
		}

		Ok(cells.iter().map(|cell| self.add_field_values(ty, cell, delimiters, tokenize)).sum())
	}

	/// Splits a multi-valued cell and registers each cleaned fragment, plus its long words when
	/// `tokenize` is set.
	pub fn add_field_values(
		&mut self,
		ty: EntityType,
		raw: &str,
		delimiters: &[String],
		tokenize: bool,
	) -> usize {
		let mut fragments = vec![strip_parenthesized(raw)];

		for delimiter in delimiters.iter().filter(|delimiter| !delimiter.is_empty()) {
			fragments = fragments
				.iter()
				.flat_map(|fragment| fragment.split(delimiter.as_str()))
				.map(str::to_string)
				.collect();
		}

		let mut added = 0;

		for fragment in fragments {
			let Some(value) = self.clean(&fragment) else { continue };

			if tokenize {
				for word in value.split_whitespace() {
					if let Some(word) = self.clean(word)
						&& word.chars().count() >= self.min_token_chars
						&& self.insert(ty, word)
					{
						added += 1;
					}
				}
			}
			if self.insert(ty, value) {
				added += 1;
			}
		}

		added
	}

	/// Registers a single curated value without splitting.
	pub fn add_value(&mut self, ty: EntityType, raw: &str) -> bool {
		let cleaned = strip_parenthesized(raw);

		match self.clean(&cleaned) {
			Some(value) => self.insert(ty, value),
			None => false,
		}
	}

	pub fn build(mut self) -> EntityLexicon {
		self.enrich_species();
		self.sanitize();

		let mut product_tokens = Vec::new();
		let mut roots: BTreeMap<String, Vec<usize>> = BTreeMap::new();

		for (idx, entry) in self.entries(EntityType::Product).iter().enumerate() {
			let tokens = normalize::tokenize(&entry.key);
			let token_set = tokens
				.iter()
				.filter(|token| {
					!self.token_stop_words.contains(**token)
						&& !normalize::is_measurement_token(token)
				})
				.map(|token| token.to_string())
				.collect();

			product_tokens.push(token_set);

			if let Some(root) = self.product_root(&tokens) {
				roots.entry(root).or_default().push(idx);
			}
		}

		EntityLexicon { vocab: self.vocab, product_tokens, roots, stop_terms: self.stop_terms }
	}

	fn entries(&self, ty: EntityType) -> &[LexiconEntry] {
		self.vocab.get(&ty).map(|vocab| vocab.entries.as_slice()).unwrap_or(&[])
	}

	fn clean(&self, raw: &str) -> Option<String> {
		let trimmed = raw.trim().trim_matches(WRAPPING_PUNCTUATION).trim();
		let value = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");

		if PLACEHOLDER_CELLS.contains(&value.to_lowercase().as_str()) {
			return None;
		}

		let key = normalize::normalize_text(&value);

		if key.chars().count() < self.min_value_chars || self.stop_terms.contains(&key) {
			return None;
		}

		Some(value)
	}

	fn insert(&mut self, ty: EntityType, value: String) -> bool {
		let key = normalize::normalize_text(&value);

		self.vocab.entry(ty).or_default().insert(value, key)
	}

	fn enrich_species(&mut self) {
		for synonym in self.species_synonyms.clone() {
			self.add_value(EntityType::Species, &synonym.to_uppercase());
		}

		if !self.pluralize_species {
			return;
		}

		let plurals: Vec<String> =
			self.entries(EntityType::Species).iter().filter_map(|entry| plural(&entry.value)).collect();

		for value in plurals {
			self.insert(EntityType::Species, value);
		}
	}

	fn sanitize(&mut self) {
		let species: HashSet<String> =
			self.entries(EntityType::Species).iter().map(|entry| entry.key.clone()).collect();
		let stop_terms = &self.stop_terms;

		for (ty, vocab) in self.vocab.iter_mut() {
			let guard_species = matches!(ty, EntityType::Drug | EntityType::Action);

			vocab.retain(|entry| {
				if is_measurement(&entry.key) || !entry.key.chars().any(|ch| ch.is_ascii_alphabetic())
				{
					return false;
				}

				!(guard_species
					&& (species.contains(&entry.key) || stop_terms.contains(&entry.key)))
			});
		}
	}

	fn product_root(&self, tokens: &[&str]) -> Option<String> {
		let first = *tokens.first()?;
		let root = match tokens.get(1) {
			Some(second) if first.len() < self.min_token_chars => format!("{first} {second}"),
			_ => first.to_string(),
		};

		if root.len() < 3
			|| self.token_stop_words.contains(&root)
			|| normalize::is_measurement_token(first)
		{
			return None;
		}

		Some(root)
	}
}

fn strip_parenthesized(raw: &str) -> String {
	match PARENTHESIZED.as_ref() {
		Some(re) => re.replace_all(raw, " ").into_owned(),
		None => raw.to_string(),
	}
}

fn is_measurement(key: &str) -> bool {
	MEASUREMENT.as_ref().map(|re| re.is_match(key)).unwrap_or(false)
}

fn plural(value: &str) -> Option<String> {
	let last = value.chars().last()?;

	if !last.is_alphabetic() || last.eq_ignore_ascii_case(&'s') {
		return None;
	}

	let suffix = if "aeiouAEIOU".contains(last) { "s" } else { "es" };
	let suffix = if last.is_uppercase() { suffix.to_uppercase() } else { suffix.to_string() };

	Some(format!("{value}{suffix}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	const VADEMECUM: &str = "\
PRODUCTO,PRINCIPIO ACTIVO,ESPECIE
SIMPARICA 10 MG,\"SAROLANER (10MG), PERRO\",PERRO
NEXGARD SPECTRA,AFOXOLANER + MILBEMICINA,\"PERRO; GATO\"
";

	fn builder() -> LexiconBuilder {
		LexiconBuilder::new(&LexiconConfig::default(), &["de".to_string()])
	}

	#[test]
	fn patterns_compile() {
		assert!(PARENTHESIZED.is_some());
		assert!(MEASUREMENT.is_some());
	}

	#[test]
	fn splits_cleans_and_tokenizes() {
		let mut builder = builder();
		let delimiters = vec![",".to_string(), "+".to_string(), "/".to_string()];

		builder.add_field_values(
			EntityType::Drug,
			"MELOXICAM (0.5%) + FIPRONIL, N/A, 10 KG.",
			&delimiters,
			true,
		);
		builder.add_field_values(EntityType::Action, "ANTIPARASITARIO EXTERNO", &[], true);

		let lexicon = builder.build();
		let drugs: Vec<&str> =
			lexicon.entries(EntityType::Drug).iter().map(|entry| entry.value.as_str()).collect();

		assert_eq!(drugs, vec!["MELOXICAM", "FIPRONIL"]);
		assert!(lexicon.contains(EntityType::Action, "antiparasitario externo"));
		assert!(lexicon.contains(EntityType::Action, "Externo"));
	}

	#[test]
	fn species_are_enriched_and_kept_out_of_drugs() {
		let mut builder = builder();

		builder.add_value(EntityType::Drug, "PERRO");
		builder.add_value(EntityType::Drug, "PARA");
		builder.add_value(EntityType::Drug, "FLURALANER");

		let lexicon = builder.build();

		assert!(lexicon.contains(EntityType::Species, "perros"));
		assert!(lexicon.contains(EntityType::Species, "gatos"));
		assert!(lexicon.contains(EntityType::Species, "cachorros"));
		assert!(!lexicon.contains(EntityType::Species, "perroses"));
		assert!(!lexicon.contains(EntityType::Drug, "perro"));
		assert!(!lexicon.contains(EntityType::Drug, "para"));
		assert!(lexicon.contains(EntityType::Drug, "fluralaner"));
	}

	#[test]
	fn measurement_values_are_dropped() {
		let mut builder = builder();

		builder.add_value(EntityType::Concept, "10 KG");
		builder.add_value(EntityType::Concept, "250ml");
		builder.add_value(EntityType::Concept, "PIPETA");

		let lexicon = builder.build();

		assert_eq!(lexicon.entries(EntityType::Concept).len(), 1);
	}

	#[test]
	fn csv_column_feeds_products_and_roots() {
		let mut builder = builder();
		let added = builder
			.load_csv(
				EntityType::Product,
				VADEMECUM.as_bytes(),
				Path::new("vademecum.csv"),
				"producto",
				&[],
				false,
			)
			.expect("Failed to load CSV.");

		assert_eq!(added, 2);

		let lexicon = builder.build();
		let roots: Vec<&str> = lexicon.roots().map(|(root, _)| root).collect();

		assert_eq!(roots, vec!["nexgard", "simparica"]);

		let tokens = lexicon.product_tokens(0).expect("Missing product tokens.");

		assert!(tokens.contains("simparica"));
		assert!(!tokens.contains("10"));
	}

	#[test]
	fn missing_column_is_reported() {
		let mut builder = builder();
		let err = builder
			.load_csv(EntityType::Brand, VADEMECUM.as_bytes(), Path::new("v.csv"), "MARCA", &[], false)
			.expect_err("Expected a missing column error.");

		assert!(matches!(err, LexiconLoadError::MissingColumn { .. }));
	}

	#[test]
	fn missing_file_degrades_to_empty_vocabulary() {
		let cfg = LexiconConfig {
			sources: vec![LexiconSource {
				entity_type: "BRAND".to_string(),
				path: Some(std::env::temp_dir().join("vetq_missing_enterprises.csv")),
				column: Some("title".to_string()),
				delimiters: Vec::new(),
				tokenize: true,
				extra_values: Vec::new(),
			}],
			..Default::default()
		};
		let (lexicon, errors) = EntityLexicon::load(&cfg, &[]);

		assert_eq!(errors.len(), 1);
		assert!(lexicon.entries(EntityType::Brand).is_empty());
		assert!(!lexicon.entries(EntityType::Species).is_empty());
	}
}
