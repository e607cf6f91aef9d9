use vetq_domain::Candidate;

/// Keeps candidates at or above `max(floor, top × dropoff_ratio)`. When fewer than `min_results`
/// pass, the best `min_results` are kept instead. Input must be sorted best first.
pub fn apply_threshold(
	candidates: Vec<Candidate>,
	floor: f32,
	dropoff_ratio: f32,
	min_results: usize,
) -> Vec<Candidate> {
	let Some(top) = candidates.first().map(|candidate| candidate.total_score) else {
		return candidates;
	};
	let threshold = floor.max(top * dropoff_ratio);
	let passing = candidates.iter().filter(|candidate| candidate.total_score >= threshold).count();

	if passing >= min_results {
		return candidates
			.into_iter()
			.filter(|candidate| candidate.total_score >= threshold)
			.collect();
	}

	tracing::debug!(threshold, passing, min_results, "Threshold relaxed to keep minimum results.");

	candidates.into_iter().take(min_results).collect()
}

#[cfg(test)]
mod tests {
	use serde_json::Map;

	use super::*;
	use vetq_domain::SubScores;

	fn candidate(id: &str, total_score: f32) -> Candidate {
		Candidate {
			id: id.to_string(),
			item_type: "product".to_string(),
			title: id.to_string(),
			metadata: Map::new(),
			sub_scores: SubScores::default(),
			total_score,
			is_promotional: false,
		}
	}

	#[test]
	fn all_below_threshold_keeps_top_three() {
		let candidates = vec![
			candidate("a", 1.0),
			candidate("b", 0.9),
			candidate("c", 0.8),
			candidate("d", 0.7),
			candidate("e", 0.6),
		];
		let kept = apply_threshold(candidates, 4.0, 0.65, 3);

		assert_eq!(kept.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
	}

	#[test]
	fn drop_off_removes_the_tail() {
		let candidates = vec![
			candidate("a", 10.0),
			candidate("b", 9.0),
			candidate("c", 7.0),
			candidate("d", 6.0),
			candidate("e", 2.0),
		];
		let kept = apply_threshold(candidates, 1.0, 0.65, 3);

		assert_eq!(kept.len(), 3);
	}

	#[test]
	fn empty_input_stays_empty() {
		assert!(apply_threshold(Vec::new(), 1.0, 0.65, 3).is_empty());
	}
}
