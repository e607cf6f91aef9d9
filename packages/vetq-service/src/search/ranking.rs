mod diversity;
mod policy;
mod signals;
mod threshold;

pub(super) use diversity::diversify;
pub(super) use policy::{adaptive_k, intent_top_k, specificity_floor};
pub(super) use signals::{
	attribute_score, brand_similarity, commercial_boost, dosage_proximity, name_similarity,
	weight_fit,
};
pub(super) use threshold::apply_threshold;
