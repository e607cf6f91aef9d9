use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
	Product,
	Brand,
	Category,
	Drug,
	Action,
	Concept,
	Species,
}
impl EntityType {
	pub const ALL: [Self; 7] = [
		Self::Product,
		Self::Brand,
		Self::Category,
		Self::Drug,
		Self::Action,
		Self::Concept,
		Self::Species,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Product => "PRODUCT",
			Self::Brand => "BRAND",
			Self::Category => "CATEGORY",
			Self::Drug => "DRUG",
			Self::Action => "ACTION",
			Self::Concept => "CONCEPT",
			Self::Species => "SPECIES",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|ty| ty.as_str().eq_ignore_ascii_case(raw))
	}

	fn index(self) -> usize {
		self as usize
	}
}

impl Display for EntityType {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Tie-break order between entity types. Lower rank sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypePriority {
	ranks: [u8; 7],
}
impl TypePriority {
	/// Builds an order from type names. Unknown names are ignored and missing types keep their
	/// default relative order after the listed ones.
	pub fn from_names<S>(names: &[S]) -> Self
	where
		S: AsRef<str>,
	{
		let mut ordered = Vec::with_capacity(EntityType::ALL.len());

		for name in names {
			if let Some(ty) = EntityType::parse(name.as_ref())
				&& !ordered.contains(&ty)
			{
				ordered.push(ty);
			}
		}
		for ty in EntityType::ALL {
			if !ordered.contains(&ty) {
				ordered.push(ty);
			}
		}

		let mut ranks = [0; 7];

		for (rank, ty) in ordered.into_iter().enumerate() {
			ranks[ty.index()] = rank as u8;
		}

		Self { ranks }
	}

	pub fn rank(&self, ty: EntityType) -> u8 {
		self.ranks[ty.index()]
	}
}

impl Default for TypePriority {
	fn default() -> Self {
		Self::from_names(&EntityType::ALL.map(EntityType::as_str))
	}
}

/// A typed, positioned match of a vocabulary value inside the normalized query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
	pub entity_type: EntityType,
	/// Canonical vocabulary spelling.
	pub value: String,
	pub position: usize,
	pub length: usize,
	/// The query slice the span covers.
	pub source_text: String,
	pub match_score: f32,
}
impl EntitySpan {
	/// Returns `None` for an empty range.
	pub fn new(
		entity_type: EntityType,
		value: impl Into<String>,
		position: usize,
		length: usize,
		source_text: impl Into<String>,
		match_score: f32,
	) -> Option<Self> {
		if length == 0 {
			return None;
		}

		let match_score = if match_score.is_finite() { match_score.clamp(0.0, 1.0) } else { 0.0 };

		Some(Self {
			entity_type,
			value: value.into(),
			position,
			length,
			source_text: source_text.into(),
			match_score,
		})
	}

	pub fn end(&self) -> usize {
		self.position + self.length
	}

	pub fn same_range(&self, other: &Self) -> bool {
		self.position == other.position && self.length == other.length
	}

	pub fn overlaps(&self, other: &Self) -> bool {
		self.position < other.end() && other.position < self.end()
	}

	pub fn is_exact(&self) -> bool {
		self.match_score >= 1.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_length_span_is_rejected() {
		assert!(EntitySpan::new(EntityType::Brand, "HOLLIDAY", 0, 0, "", 1.0).is_none());
	}

	#[test]
	fn priority_follows_listed_order() {
		let default = TypePriority::default();

		assert!(default.rank(EntityType::Product) < default.rank(EntityType::Brand));
		assert!(default.rank(EntityType::Concept) < default.rank(EntityType::Species));

		let custom = TypePriority::from_names(&["species", "BRAND"]);

		assert_eq!(custom.rank(EntityType::Species), 0);
		assert_eq!(custom.rank(EntityType::Brand), 1);
		assert_eq!(custom.rank(EntityType::Product), 2);
	}

	#[test]
	fn entity_type_serializes_screaming_snake() {
		let json = serde_json::to_string(&EntityType::Concept).expect("Failed to serialize.");

		assert_eq!(json, "\"CONCEPT\"");
		assert_eq!(EntityType::parse(" drug "), Some(EntityType::Drug));
	}
}
