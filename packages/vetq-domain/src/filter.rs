use serde::{Deserialize, Serialize};

use crate::weight::WeightRange;

/// Validated retrieval intent for one query.
///
/// `exclude_brands` never contains `brand`, and `weight_min <= weight_max` when both are set.
/// Use [`FilterSet::enforce_invariants`] after mutating fields directly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
	pub search_term: String,
	pub brand: Option<String>,
	pub category: Option<String>,
	pub species: Option<String>,
	pub presentation: Option<String>,
	pub drug: Option<String>,
	pub weight_min: Option<f32>,
	pub weight_max: Option<f32>,
	#[serde(default)]
	pub exclude_brands: Vec<String>,
	#[serde(default)]
	pub is_offer: bool,
	#[serde(default)]
	pub is_transfer: bool,
	pub dosage_value: Option<f32>,
	#[serde(default)]
	pub target_products: Vec<String>,
}
impl FilterSet {
	/// Raw query as the search term and nothing else.
	pub fn fallback(query: &str) -> Self {
		Self { search_term: query.trim().to_string(), ..Default::default() }
	}

	/// Requested range with open bounds filled in.
	pub fn weight_range(&self, open_max: f32) -> Option<WeightRange> {
		if self.weight_min.is_none() && self.weight_max.is_none() {
			return None;
		}

		WeightRange::new(self.weight_min.unwrap_or(0.0), self.weight_max.unwrap_or(open_max))
	}

	pub fn has_specific_constraint(&self) -> bool {
		self.weight_min.is_some()
			|| self.weight_max.is_some()
			|| self.brand.is_some()
			|| self.drug.is_some()
			|| !self.exclude_brands.is_empty()
			|| self.presentation.is_some()
			|| self.species.is_some()
	}

	pub fn requests_promotions(&self) -> bool {
		self.is_offer || self.is_transfer
	}

	pub fn specificity(&self) -> Specificity {
		if !self.target_products.is_empty() {
			Specificity::Product
		} else if self.brand.is_some() {
			Specificity::Brand
		} else if self.has_specific_constraint() {
			Specificity::Attribute
		} else if self.category.is_some() {
			Specificity::Category
		} else {
			Specificity::Open
		}
	}

	pub fn enforce_invariants(&mut self) {
		if let Some(brand) = self.brand.as_deref() {
			let brand = brand.to_lowercase();

			self.exclude_brands.retain(|excluded| excluded.to_lowercase() != brand);
		}
		if let (Some(min), Some(max)) = (self.weight_min, self.weight_max)
			&& min > max
		{
			self.weight_min = Some(max);
			self.weight_max = Some(min);
		}
	}
}

/// How narrowly a filter set pins its target, from tightest to loosest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
	Product,
	Brand,
	Attribute,
	Open,
	Category,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fallback_carries_only_the_query() {
		let filters = FilterSet::fallback("  pipeta para perro ");

		assert_eq!(filters.search_term, "pipeta para perro");
		assert!(!filters.has_specific_constraint());
		assert_eq!(filters.specificity(), Specificity::Open);
	}

	#[test]
	fn invariants_are_restored() {
		let mut filters = FilterSet {
			brand: Some("Holliday".to_string()),
			exclude_brands: vec!["HOLLIDAY".to_string(), "Brouwer".to_string()],
			weight_min: Some(20.0),
			weight_max: Some(10.0),
			..Default::default()
		};

		filters.enforce_invariants();

		assert_eq!(filters.exclude_brands, vec!["Brouwer".to_string()]);
		assert_eq!((filters.weight_min, filters.weight_max), (Some(10.0), Some(20.0)));
	}

	#[test]
	fn specificity_levels() {
		let category = FilterSet { category: Some("ALIMENTO".to_string()), ..Default::default() };
		let attribute = FilterSet { weight_max: Some(10.0), ..category.clone() };
		let brand = FilterSet { brand: Some("Holliday".to_string()), ..attribute.clone() };
		let product = FilterSet { target_products: vec!["Power Gold".to_string()], ..brand.clone() };

		assert_eq!(category.specificity(), Specificity::Category);
		assert_eq!(attribute.specificity(), Specificity::Attribute);
		assert_eq!(brand.specificity(), Specificity::Brand);
		assert_eq!(product.specificity(), Specificity::Product);
	}
}
