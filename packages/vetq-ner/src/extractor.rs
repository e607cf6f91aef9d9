use std::{collections::HashSet, sync::Arc};

use crate::{lexicon::EntityLexicon, similarity};
use vetq_config::Extractor as ExtractorConfig;
use vetq_domain::{EntitySpan, EntityType, TypePriority, cmp_f32_desc, normalize};

#[derive(Clone, Debug)]
pub struct ExtractorSettings {
	pub fuzzy_cutoff: f32,
	pub fuzzy_min_token_chars: usize,
	pub coverage_min: f32,
	pub coverage_max_products: usize,
	pub overlap_keep_score: f32,
	pub priority: TypePriority,
	pub stop_words: HashSet<String>,
}
impl ExtractorSettings {
	pub fn from_config(cfg: &ExtractorConfig) -> Self {
		Self {
			fuzzy_cutoff: cfg.fuzzy_cutoff,
			fuzzy_min_token_chars: cfg.fuzzy_min_token_chars,
			coverage_min: cfg.coverage_min,
			coverage_max_products: cfg.coverage_max_products,
			overlap_keep_score: cfg.overlap_keep_score,
			priority: TypePriority::from_names(&cfg.type_priority),
			stop_words: cfg.stop_words.iter().map(|word| normalize::normalize_text(word)).collect(),
		}
	}
}

impl Default for ExtractorSettings {
	fn default() -> Self {
		Self::from_config(&ExtractorConfig::default())
	}
}

/// Byte ranges of the normalized query already claimed by an earlier matching step.
struct Consumed {
	bytes: Vec<bool>,
}
impl Consumed {
	fn new(len: usize) -> Self {
		Self { bytes: vec![false; len] }
	}

	fn mark(&mut self, start: usize, end: usize) {
		for flag in self.bytes.iter_mut().take(end).skip(start) {
			*flag = true;
		}
	}

	fn mark_spans(&mut self, spans: &[EntitySpan]) {
		for span in spans {
			self.mark(span.position, span.end());
		}
	}

	fn covers(&self, start: usize, end: usize) -> bool {
		self.bytes.iter().take(end).skip(start).any(|flag| *flag)
	}
}

struct RootMatch<'a> {
	root: &'a str,
	score: f32,
	start: usize,
	end: usize,
}

pub struct EntityExtractor {
	lexicon: Arc<EntityLexicon>,
	settings: ExtractorSettings,
}
impl EntityExtractor {
	pub fn new(lexicon: Arc<EntityLexicon>, settings: ExtractorSettings) -> Self {
		Self { lexicon, settings }
	}

	pub fn lexicon(&self) -> &EntityLexicon {
		&self.lexicon
	}

	pub fn settings(&self) -> &ExtractorSettings {
		&self.settings
	}

	pub fn extract(&self, query: &str) -> Vec<EntitySpan> {
		self.extract_normalized(&normalize::normalize_text(query))
	}

	/// Runs every matching step over an already-normalized query. Span offsets index into
	/// `text`.
	pub fn extract_normalized(&self, text: &str) -> Vec<EntitySpan> {
		if text.is_empty() {
			return Vec::new();
		}

		let tokens = normalize::token_spans(text);
		let mut spans = self.exact_matches(text);

		spans.extend(self.coverage_matches(text, &tokens));

		let mut consumed = Consumed::new(text.len());

		consumed.mark_spans(&spans);

		let roots = self.root_matches(text, &tokens, &mut consumed);

		spans.extend(roots);
		spans.extend(self.fuzzy_matches(text, &tokens, &mut consumed));

		resolve_spans(spans, self.settings.overlap_keep_score, &self.settings.priority)
	}

	fn exact_matches(&self, text: &str) -> Vec<EntitySpan> {
		let mut out = Vec::new();

		for ty in EntityType::ALL {
			for entry in self.lexicon.entries(ty) {
				for position in normalize::find_bounded(text, &entry.key) {
					let end = position + entry.key.len();

					out.extend(EntitySpan::new(
						ty,
						entry.value.clone(),
						position,
						entry.key.len(),
						&text[position..end],
						1.0,
					));
				}
			}
		}

		out
	}

	fn coverage_matches(&self, text: &str, tokens: &[(usize, &str)]) -> Vec<EntitySpan> {
		let content: Vec<(usize, &str)> =
			tokens.iter().copied().filter(|(_, token)| self.is_content_token(token)).collect();
		let distinct: HashSet<&str> = content.iter().map(|(_, token)| *token).collect();

		if distinct.is_empty() {
			return Vec::new();
		}

		let products = self.lexicon.entries(EntityType::Product);
		let mut scored = Vec::new();

		for idx in 0..products.len() {
			let Some(product_tokens) = self.lexicon.product_tokens(idx) else { continue };
			let matched = distinct.iter().filter(|token| product_tokens.contains(**token)).count();

			if matched == 0 {
				continue;
			}

			let coverage = matched as f32 / distinct.len() as f32;

			if coverage > self.settings.coverage_min {
				scored.push((idx, coverage, product_tokens.len()));
			}
		}

		// Tighter product names win coverage ties.
		scored.sort_by(|a, b| {
			cmp_f32_desc(a.1, b.1).then_with(|| a.2.cmp(&b.2)).then_with(|| a.0.cmp(&b.0))
		});
		scored.truncate(self.settings.coverage_max_products);

		let mut out = Vec::new();

		for (idx, coverage, _) in scored {
			let Some(product_tokens) = self.lexicon.product_tokens(idx) else { continue };
			let mut matched =
				content.iter().filter(|(_, token)| product_tokens.contains(*token));
			let Some(first) = matched.next() else { continue };
			let last = matched.last().unwrap_or(first);
			let start = first.0;
			let end = last.0 + last.1.len();

			out.extend(EntitySpan::new(
				EntityType::Product,
				products[idx].value.clone(),
				start,
				end - start,
				&text[start..end],
				coverage,
			));
		}

		out
	}

	fn root_matches(
		&self,
		text: &str,
		tokens: &[(usize, &str)],
		consumed: &mut Consumed,
	) -> Vec<EntitySpan> {
		let products = self.lexicon.entries(EntityType::Product);
		let mut out = Vec::new();

		for (idx, (position, token)) in tokens.iter().enumerate() {
			let end = position + token.len();

			if consumed.covers(*position, end) || !self.is_fuzzy_candidate(token) {
				continue;
			}

			let next = tokens
				.get(idx + 1)
				.filter(|(next_pos, next_token)| {
					!consumed.covers(*next_pos, next_pos + next_token.len())
						&& self.is_content_token(next_token)
				})
				.map(|(next_pos, next_token)| {
					(format!("{token} {next_token}"), next_pos + next_token.len())
				});
			let Some(found) = self.best_root(token, end, next.as_ref(), *position) else {
				continue;
			};

			for product_idx in self.lexicon.products_for_root(found.root).iter().copied() {
				out.extend(EntitySpan::new(
					EntityType::Product,
					products[product_idx].value.clone(),
					found.start,
					found.end - found.start,
					&text[found.start..found.end],
					found.score,
				));
			}

			tracing::debug!(
				token = *token,
				root = found.root,
				score = found.score,
				"Corrected product root."
			);

			consumed.mark(found.start, found.end);
		}

		out
	}

	fn best_root(
		&self,
		token: &str,
		token_end: usize,
		pair: Option<&(String, usize)>,
		start: usize,
	) -> Option<RootMatch<'_>> {
		let mut best: Option<RootMatch<'_>> = None;

		for (root, _) in self.lexicon.roots() {
			let (score, end) = match pair {
				Some((probe, pair_end)) if root.contains(' ') => {
					let single = similarity::ratio(token, root);
					let double = similarity::ratio(probe, root);

					if double >= single { (double, *pair_end) } else { (single, token_end) }
				},
				_ => (similarity::ratio(token, root), token_end),
			};

			if score >= self.settings.fuzzy_cutoff
				&& best.as_ref().map(|current| score > current.score).unwrap_or(true)
			{
				best = Some(RootMatch { root, score, start, end });
			}
		}

		best
	}

	fn fuzzy_matches(
		&self,
		text: &str,
		tokens: &[(usize, &str)],
		consumed: &mut Consumed,
	) -> Vec<EntitySpan> {
		let mut out = Vec::new();

		for (position, token) in tokens {
			let end = position + token.len();

			if consumed.covers(*position, end) || !self.is_fuzzy_candidate(token) {
				continue;
			}

			let mut best: Option<(EntityType, &str, f32)> = None;

			for ty in EntityType::ALL.into_iter().filter(|ty| *ty != EntityType::Product) {
				for entry in self.lexicon.entries(ty) {
					if entry.key.contains(' ') {
						continue;
					}

					let score = similarity::ratio(token, &entry.key);

					if score < self.settings.fuzzy_cutoff {
						continue;
					}

					let better = match best {
						None => true,
						Some((best_ty, _, best_score)) =>
							score > best_score
								|| (score == best_score
									&& self.settings.priority.rank(ty)
										< self.settings.priority.rank(best_ty)),
					};

					if better {
						best = Some((ty, entry.value.as_str(), score));
					}
				}
			}

			if let Some((ty, value, score)) = best {
				out.extend(EntitySpan::new(ty, value, *position, token.len(), *token, score));
				consumed.mark(*position, end);
			}
		}

		out
	}

	/// Query tokens that carry meaning for coverage scoring.
	fn is_content_token(&self, token: &str) -> bool {
		!self.settings.stop_words.contains(token)
			&& !self.lexicon.is_stop_term(token)
			&& !normalize::is_measurement_token(token)
	}

	fn is_fuzzy_candidate(&self, token: &str) -> bool {
		token.len() >= self.settings.fuzzy_min_token_chars && self.is_content_token(token)
	}
}

/// Orders spans by score, type priority, then position, and keeps the first span per
/// `(type, value)`.
///
/// Spans sharing an identical range coexist. A span scoring at most `overlap_keep_score` is
/// dropped when it partially overlaps an accepted span with a strictly higher score.
pub fn resolve_spans(
	mut spans: Vec<EntitySpan>,
	overlap_keep_score: f32,
	priority: &TypePriority,
) -> Vec<EntitySpan> {
	spans.sort_by(|a, b| {
		cmp_f32_desc(a.match_score, b.match_score)
			.then_with(|| priority.rank(a.entity_type).cmp(&priority.rank(b.entity_type)))
			.then_with(|| a.position.cmp(&b.position))
	});

	let mut accepted: Vec<EntitySpan> = Vec::new();
	let mut seen: HashSet<(EntityType, String)> = HashSet::new();

	for span in spans {
		if seen.contains(&(span.entity_type, span.value.clone())) {
			continue;
		}

		let shadowed = span.match_score <= overlap_keep_score
			&& accepted.iter().any(|kept| {
				kept.overlaps(&span) && !kept.same_range(&span) && kept.match_score > span.match_score
			});

		if shadowed {
			continue;
		}

		seen.insert((span.entity_type, span.value.clone()));
		accepted.push(span);
	}

	accepted
}
