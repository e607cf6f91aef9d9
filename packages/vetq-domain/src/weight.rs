//! Body-weight ranges, in kilograms, as written in queries and catalog titles.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::normalize;

const NUMBER: &str = r"(\d+(?:[.,]\d+)?)";
const UNIT: &str = r"(?:kgs?|kilos?)\b";

static EXPLICIT_RANGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(&format!(r"{NUMBER}\s*(?:kgs?)?\s*(?:-|\s+a\s+)\s*{NUMBER}\s*{UNIT}")).ok()
});
static UPPER_KEYWORD: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(&format!(
		r"(?:\b(?:hasta|maximo|max|menor a|menor que|menos de|no mas de)\s+|\bh/\s*){NUMBER}\s*{UNIT}"
	))
	.ok()
});
static LOWER_KEYWORD: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(&format!(
		r"\b(?:desde|minimo|min|apartir de|a partir de|mayor a|mayor que|mas de)\s+{NUMBER}\s*{UNIT}"
	))
	.ok()
});
static SINGLE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(&format!(r"{NUMBER}\s*{UNIT}")).ok());
static LABEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(&format!(r"(?i)^\s*{NUMBER}\s*(?:kgs?)?\s*[-–]\s*{NUMBER}\s*(?:kgs?)?\s*$")).ok()
});

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightRange {
	pub min: f32,
	pub max: f32,
}
impl WeightRange {
	/// Orders the bounds. Rejects negative or non-finite input.
	pub fn new(a: f32, b: f32) -> Option<Self> {
		if !a.is_finite() || !b.is_finite() || a < 0.0 || b < 0.0 {
			return None;
		}

		Some(Self { min: a.min(b), max: a.max(b) })
	}

	pub fn span(&self) -> f32 {
		self.max - self.min
	}

	pub fn contains_range(&self, other: &Self) -> bool {
		other.min >= self.min && other.max <= self.max
	}

	/// Length of the shared interval, zero when disjoint or touching.
	pub fn overlap(&self, other: &Self) -> f32 {
		(self.max.min(other.max) - self.min.max(other.min)).max(0.0)
	}

	/// Distance between the intervals, zero when they touch or overlap.
	pub fn gap(&self, other: &Self) -> f32 {
		(self.min.max(other.min) - self.max.min(other.max)).max(0.0)
	}
}

/// Parses a stored range label such as `4-10`, `4.0-10.0`, or `4 - 10 kg`.
pub fn parse_range_label(raw: &str) -> Option<WeightRange> {
	let re = LABEL.as_ref()?;
	let caps = re.captures(raw.trim())?;

	WeightRange::new(number(&caps, 1)?, number(&caps, 2)?)
}

/// Reads a weight hint from free text.
///
/// Explicit ranges win, then `hasta`/`desde` style bounds, then a lone weight mapped onto the
/// standard package brackets.
pub fn from_text(text: &str, brackets: &[[f32; 2]], open_max: f32) -> Option<WeightRange> {
	let text = normalize::normalize_text(text);

	if let Some(range) = explicit_range(&text) {
		return Some(range);
	}
	if let Some(range) = keyword_range(&text, open_max) {
		return Some(range);
	}

	let caps = SINGLE.as_ref()?.captures(&text)?;

	bracket_for(number(&caps, 1)?, brackets)
}

/// Maps a single weight onto a standard bracket, reading it as the bracket's upper bound.
pub fn bracket_for(weight: f32, brackets: &[[f32; 2]]) -> Option<WeightRange> {
	if !weight.is_finite() || weight <= 0.0 {
		return None;
	}

	for [lower, upper] in brackets {
		if (weight - upper).abs() < 0.1 {
			return WeightRange::new(*lower, *upper);
		}
	}
	for [lower, upper] in brackets {
		if *lower < weight && weight <= *upper {
			return WeightRange::new(*lower, *upper);
		}
	}

	match brackets.last() {
		Some([lower, upper]) if weight > *upper => WeightRange::new(*lower, weight),
		_ => None,
	}
}

fn explicit_range(text: &str) -> Option<WeightRange> {
	let caps = EXPLICIT_RANGE.as_ref()?.captures(text)?;

	WeightRange::new(number(&caps, 1)?, number(&caps, 2)?)
}

fn keyword_range(text: &str, open_max: f32) -> Option<WeightRange> {
	let upper = UPPER_KEYWORD.as_ref()?.captures(text).and_then(|caps| number(&caps, 1));
	let lower = LOWER_KEYWORD.as_ref()?.captures_iter(text).find_map(|caps| {
		let start = caps.get(0)?.start();

		// "no mas de 10kg" is an upper bound.
		if text[..start].ends_with("no ") {
			return None;
		}

		number(&caps, 1)
	});

	match (lower, upper) {
		(None, None) => None,
		(lower, upper) => WeightRange::new(lower.unwrap_or(0.0), upper.unwrap_or(open_max)),
	}
}

fn number(caps: &Captures<'_>, group: usize) -> Option<f32> {
	caps.get(group)?.as_str().replace(',', ".").parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	const BRACKETS: [[f32; 2]; 6] =
		[[0.0, 4.0], [4.0, 10.0], [10.0, 20.0], [20.0, 40.0], [40.0, 60.0], [60.0, 100.0]];

	fn parse(text: &str) -> Option<(f32, f32)> {
		from_text(text, &BRACKETS, 999.0).map(|range| (range.min, range.max))
	}

	#[test]
	fn patterns_compile() {
		for pattern in [&EXPLICIT_RANGE, &UPPER_KEYWORD, &LOWER_KEYWORD, &SINGLE, &LABEL] {
			assert!(pattern.is_some());
		}
	}

	#[test]
	fn explicit_ranges() {
		assert_eq!(parse("POWER GOLD 10-20KG PIPETA"), Some((10.0, 20.0)));
		assert_eq!(parse("SIMPARICA 5KG-10KG"), Some((5.0, 10.0)));
		assert_eq!(parse("NEXGARD 10 A 20 KG"), Some((10.0, 20.0)));
		assert_eq!(parse("ADVOCATE 40-20KG"), Some((20.0, 40.0)));
		assert_eq!(parse("BRAVECTO 4,5-10 KG"), Some((4.5, 10.0)));
		assert_eq!(parse("PIPETA 10–20 KG"), Some((10.0, 20.0)));
		assert_eq!(parse("comprimido 5 — 12 kilos"), Some((5.0, 12.0)));
	}

	#[test]
	fn keyword_bounds() {
		assert_eq!(parse("HASTA 20KG"), Some((0.0, 20.0)));
		assert_eq!(parse("ANTIPULGAS H/8 KG"), Some((0.0, 8.0)));
		assert_eq!(parse("para perros desde 10 kilos"), Some((10.0, 999.0)));
		assert_eq!(parse("desde 10kg hasta 25 kg"), Some((10.0, 25.0)));
		assert_eq!(parse("no más de 10kg"), Some((0.0, 10.0)));
	}

	#[test]
	fn single_weight_maps_to_bracket() {
		assert_eq!(parse("BRAVECTO 10KG"), Some((4.0, 10.0)));
		assert_eq!(parse("power gold de 10kg"), Some((4.0, 10.0)));
		assert_eq!(parse("PRODUCTO 15KG"), Some((10.0, 20.0)));
		assert_eq!(parse("alimento 120 kg"), Some((60.0, 120.0)));
	}

	#[test]
	fn non_weight_measurements_are_ignored() {
		assert_eq!(parse("SHAMPOO 250 ML"), None);
		assert_eq!(parse("HOLLIDAY"), None);
	}

	#[test]
	fn range_labels() {
		assert_eq!(parse_range_label("4-10"), WeightRange::new(4.0, 10.0));
		assert_eq!(parse_range_label("4.0-10.0"), WeightRange::new(4.0, 10.0));
		assert_eq!(parse_range_label(" 20 - 40 kg"), WeightRange::new(20.0, 40.0));
		assert_eq!(parse_range_label("10–20"), WeightRange::new(10.0, 20.0));
		assert_eq!(parse_range_label("grande"), None);
	}

	#[test]
	fn interval_arithmetic() {
		let requested = WeightRange { min: 10.0, max: 20.0 };
		let lower = WeightRange { min: 5.0, max: 12.0 };
		let far = WeightRange { min: 30.0, max: 40.0 };

		assert_eq!(requested.overlap(&lower), 2.0);
		assert_eq!(requested.gap(&lower), 0.0);
		assert_eq!(requested.overlap(&far), 0.0);
		assert_eq!(requested.gap(&far), 10.0);
		assert!(requested.contains_range(&WeightRange { min: 12.0, max: 18.0 }));
	}
}
