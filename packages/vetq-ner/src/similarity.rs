/// Edit-distance similarity in `[0, 1]`; 1.0 for identical strings.
pub fn ratio(a: &str, b: &str) -> f32 {
	strsim::normalized_levenshtein(a, b) as f32
}

/// Highest-scoring candidate at or above `cutoff`. Earlier candidates win ties.
pub fn best_match<'a, I>(token: &str, candidates: I, cutoff: f32) -> Option<(&'a str, f32)>
where
	I: IntoIterator<Item = &'a str>,
{
	let mut best: Option<(&'a str, f32)> = None;

	for candidate in candidates {
		let score = ratio(token, candidate);

		if score >= cutoff && best.map(|(_, current)| score > current).unwrap_or(true) {
			best = Some((candidate, score));
		}
	}

	best
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tolerates_single_typos() {
		let score = ratio("sinparica", "simparica");

		assert!(score >= 0.85 && score < 1.0, "Unexpected ratio {score}.");
		assert_eq!(ratio("bravecto", "bravecto"), 1.0);
	}

	#[test]
	fn best_match_respects_cutoff() {
		let roots = ["simparica", "nexgard", "bravecto"];

		assert_eq!(best_match("sinparica", roots, 0.85).map(|(root, _)| root), Some("simparica"));
		assert_eq!(best_match("collar", roots, 0.85), None);
	}
}
