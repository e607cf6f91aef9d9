use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Value};

/// One retrieved item as returned by the retrieval backend.
///
/// Only the id is mandatory. Every other field tolerates nulls and wrong types: scores read as
/// zero, text as absent, and metadata as empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
	#[serde(deserialize_with = "hit_id")]
	pub id: String,
	#[serde(rename = "type", default, deserialize_with = "lenient_text")]
	pub item_type: String,
	#[serde(default, deserialize_with = "lenient_title")]
	pub title: Option<String>,
	#[serde(default, deserialize_with = "lenient_score")]
	pub semantic_score: f32,
	#[serde(default, deserialize_with = "lenient_score")]
	pub keyword_score: f32,
	#[serde(default, deserialize_with = "lenient_metadata")]
	pub metadata: Map<String, Value>,
}
impl RawHit {
	/// Explicit title, else the `title` metadata key.
	pub fn display_title(&self) -> &str {
		self.title.as_deref().or_else(|| self.meta_str(&["title"])).unwrap_or_default()
	}

	/// First non-empty string among `keys`.
	pub fn meta_str(&self, keys: &[&str]) -> Option<&str> {
		keys.iter()
			.filter_map(|key| self.metadata.get(*key))
			.filter_map(Value::as_str)
			.map(str::trim)
			.find(|value| !value.is_empty())
	}

	/// Booleans stored either natively or as `"true"`/`"false"` strings. Anything else reads as
	/// absent.
	pub fn meta_bool(&self, keys: &[&str]) -> Option<bool> {
		keys.iter().filter_map(|key| self.metadata.get(*key)).find_map(|value| match value {
			Value::Bool(flag) => Some(*flag),
			Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
				"true" | "1" | "yes" | "si" => Some(true),
				"false" | "0" | "no" => Some(false),
				_ => None,
			},
			_ => None,
		})
	}

	pub fn meta_f32(&self, keys: &[&str]) -> Option<f32> {
		keys.iter().filter_map(|key| self.metadata.get(*key)).find_map(value_f32)
	}

	pub fn is_offer(&self) -> bool {
		self.meta_bool(&["is_offer"]).unwrap_or(false)
	}

	pub fn is_transfer(&self) -> bool {
		self.meta_bool(&["is_transfer", "has_transfer"]).unwrap_or(false)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
	pub semantic: f32,
	pub keyword: f32,
	pub exact_attribute: f32,
	pub brand: f32,
	pub name: f32,
	pub weight_fit: f32,
	pub commercial: f32,
	pub dosage: f32,
}

/// A hit after scoring. Lives for one query only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	pub id: String,
	#[serde(rename = "type")]
	pub item_type: String,
	pub title: String,
	pub metadata: Map<String, Value>,
	pub sub_scores: SubScores,
	pub total_score: f32,
	pub is_promotional: bool,
}

fn hit_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::String(id) if !id.trim().is_empty() => Ok(id),
		Value::Number(id) => Ok(id.to_string()),
		other => Err(D::Error::custom(format!(
			"Hit id must be a non-empty string or a number, got {other}."
		))),
	}
}

fn lenient_score<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(value_f32(&Value::deserialize(deserializer)?).unwrap_or(0.0))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(lenient_title(deserializer)?.unwrap_or_default())
}

fn lenient_title<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::String(text) => Ok(Some(text)),
		_ => Ok(None),
	}
}

fn lenient_metadata<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::Object(map) => Ok(map),
		_ => Ok(Map::new()),
	}
}

/// Numbers stored natively or as numeric strings with either decimal separator.
fn value_f32(value: &Value) -> Option<f32> {
	match value {
		Value::Number(number) => number.as_f64().map(|n| n as f32),
		Value::String(raw) => raw.trim().replace(',', ".").parse().ok(),
		_ => None,
	}
	.filter(|value: &f32| value.is_finite())
}

/// Descending order for scores with NaN sorted last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
