use serde::{Deserialize, Serialize};

use crate::{
	entity::{EntitySpan, EntityType},
	weight::WeightRange,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
	Search,
	Recommend,
	Smalltalk,
	OutOfScope,
}
impl Intent {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Search => "SEARCH",
			Self::Recommend => "RECOMMEND",
			Self::Smalltalk => "SMALLTALK",
			Self::OutOfScope => "OUT_OF_SCOPE",
		}
	}

	/// Whether the pipeline should retrieve candidates for this intent.
	pub fn wants_products(self) -> bool {
		matches!(self, Self::Search | Self::Recommend)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dosage {
	pub value: f32,
	pub unit: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericModifiers {
	pub dosage: Option<Dosage>,
	pub weight: Option<WeightRange>,
	pub is_offer: bool,
	pub is_transfer: bool,
}
impl NumericModifiers {
	pub fn is_empty(&self) -> bool {
		self.dosage.is_none() && self.weight.is_none() && !self.is_offer && !self.is_transfer
	}
}

/// Everything the extraction stage learned about one query. Built once, read-only afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
	pub query: String,
	pub normalized_query: String,
	pub intent: Intent,
	pub entities: Vec<EntitySpan>,
	pub modifiers: NumericModifiers,
	pub confidence: f32,
}
impl QueryIntent {
	pub fn entities_of(&self, ty: EntityType) -> impl Iterator<Item = &EntitySpan> {
		self.entities.iter().filter(move |span| span.entity_type == ty)
	}

	pub fn summary(&self) -> SearchSummary {
		SearchSummary {
			query: self.query.clone(),
			intent: self.intent,
			entities: self
				.entities
				.iter()
				.map(|span| SummaryEntity {
					entity_type: span.entity_type,
					value: span.value.clone(),
				})
				.collect(),
		}
	}
}

/// A prior turn, kept by the caller and replayed as context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
	pub query: String,
	pub intent: Intent,
	#[serde(default)]
	pub entities: Vec<SummaryEntity>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntity {
	pub entity_type: EntityType,
	pub value: String,
}
