pub mod candidate;
pub mod entity;
pub mod filter;
pub mod intent;
pub mod normalize;
pub mod weight;

pub use candidate::{Candidate, RawHit, SubScores, cmp_f32_desc};
pub use entity::{EntitySpan, EntityType, TypePriority};
pub use filter::{FilterSet, Specificity};
pub use intent::{Dosage, Intent, NumericModifiers, QueryIntent, SearchSummary, SummaryEntity};
pub use weight::WeightRange;
