use vetq_config::ScoringDiversity;
use vetq_domain::Candidate;

/// Caps promotional items at `max(1, floor(k × max_promotional_ratio))` of the final `k` slots.
/// Input must be sorted best first; relative order is preserved.
pub fn diversify(candidates: Vec<Candidate>, k: usize, cfg: &ScoringDiversity) -> Vec<Candidate> {
	let promotional = candidates.iter().filter(|candidate| candidate.is_promotional).count();
	let ordinary = candidates.len() - promotional;

	if !cfg.enabled || ordinary < cfg.min_ordinary || promotional < cfg.min_promotional {
		return candidates;
	}

	let cap = ((k as f32 * cfg.max_promotional_ratio).floor() as usize).max(1);
	let mut taken = 0;
	let mut out = Vec::with_capacity(k.min(candidates.len()));

	for candidate in candidates {
		if out.len() == k {
			break;
		}
		if candidate.is_promotional {
			if taken == cap {
				continue;
			}

			taken += 1;
		}

		out.push(candidate);
	}

	tracing::debug!(k, cap, promotional = taken, kept = out.len(), "Promotional items capped.");

	out
}
