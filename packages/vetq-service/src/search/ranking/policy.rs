use vetq_config::{IntentTopK, ScoringThreshold};
use vetq_domain::{FilterSet, Intent, Specificity};

/// Doubles the requested size for constrained filter sets, up to `cap`. Never shrinks it.
pub fn adaptive_k(requested: u32, filters: &FilterSet, cap: u32) -> u32 {
	if filters.has_specific_constraint() {
		requested.saturating_mul(2).min(cap).max(requested)
	} else {
		requested
	}
}

pub fn intent_top_k(cfg: &IntentTopK, intent: Intent) -> u32 {
	match intent {
		Intent::Search => cfg.search,
		Intent::Recommend => cfg.recommend,
		Intent::Smalltalk => cfg.smalltalk,
		Intent::OutOfScope => cfg.out_of_scope,
	}
}

pub fn specificity_floor(cfg: &ScoringThreshold, specificity: Specificity) -> f32 {
	match specificity {
		Specificity::Product => cfg.product_floor,
		Specificity::Brand => cfg.brand_floor,
		Specificity::Attribute => cfg.attribute_floor,
		Specificity::Open => cfg.open_floor,
		Specificity::Category => cfg.category_floor,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn adaptive_k_doubles_only_when_constrained() {
		let open = FilterSet::fallback("alimento");
		let constrained = FilterSet { species: Some("PERRO".to_string()), ..open.clone() };

		assert_eq!(adaptive_k(8, &open, 15), 8);
		assert_eq!(adaptive_k(4, &constrained, 15), 8);
		assert_eq!(adaptive_k(8, &constrained, 15), 15);
		assert_eq!(adaptive_k(20, &constrained, 15), 20);
	}

	#[test]
	fn floors_tighten_with_specificity() {
		let cfg = ScoringThreshold::default();
		let product = specificity_floor(&cfg, Specificity::Product);
		let brand = specificity_floor(&cfg, Specificity::Brand);
		let category = specificity_floor(&cfg, Specificity::Category);

		assert!(product >= brand && brand > category);
	}
}
