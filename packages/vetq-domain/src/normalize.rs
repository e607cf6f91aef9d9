use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Folds case, strips diacritics and collapses whitespace. Unicode dashes become `-`, other
/// non-ASCII punctuation and symbols become spaces, and non-ASCII letters are dropped.
///
/// The output is pure ASCII, so byte offsets into it are character offsets.
pub fn normalize_text(input: &str) -> String {
	let mut out = String::with_capacity(input.len());
	let mut pending_space = false;

	for ch in input.nfd() {
		if is_combining_mark(ch) {
			continue;
		}

		let ch = if is_dash(ch) { '-' } else { ch };

		if ch.is_whitespace() || (!ch.is_ascii() && !ch.is_alphanumeric()) {
			if !out.is_empty() {
				pending_space = true;
			}

			continue;
		}
		if !ch.is_ascii() || ch.is_ascii_control() {
			continue;
		}
		if pending_space {
			out.push(' ');

			pending_space = false;
		}

		out.push(ch.to_ascii_lowercase());
	}

	out
}

fn is_dash(ch: char) -> bool {
	matches!(ch, '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{FE58}' | '\u{FE63}' | '\u{FF0D}')
}

/// Maximal runs of ASCII alphanumerics with their byte offsets.
pub fn token_spans(text: &str) -> Vec<(usize, &str)> {
	let mut out = Vec::new();
	let mut start = None;

	for (idx, byte) in text.bytes().enumerate() {
		if byte.is_ascii_alphanumeric() {
			if start.is_none() {
				start = Some(idx);
			}
		} else if let Some(begin) = start.take() {
			out.push((begin, &text[begin..idx]));
		}
	}

	if let Some(begin) = start {
		out.push((begin, &text[begin..]));
	}

	out
}

pub fn tokenize(text: &str) -> Vec<&str> {
	token_spans(text).into_iter().map(|(_, token)| token).collect()
}

/// True when `text[start..end]` is not glued to an alphanumeric character on either side.
pub fn is_bounded(text: &str, start: usize, end: usize) -> bool {
	let bytes = text.as_bytes();
	let left = start == 0 || !bytes.get(start - 1).is_some_and(u8::is_ascii_alphanumeric);
	let right = !bytes.get(end).is_some_and(u8::is_ascii_alphanumeric);

	left && right
}

/// Non-overlapping, boundary-respecting occurrences of `needle` in `haystack`.
pub fn find_bounded(haystack: &str, needle: &str) -> Vec<usize> {
	let mut out = Vec::new();

	if needle.is_empty() {
		return out;
	}

	let step = needle.chars().next().map(char::len_utf8).unwrap_or(1);
	let mut from = 0;

	while let Some(offset) = haystack.get(from..).and_then(|rest| rest.find(needle)) {
		let start = from + offset;
		let end = start + needle.len();

		if is_bounded(haystack, start, end) {
			out.push(start);

			from = end;
		} else {
			from = start + step;
		}
	}

	out
}

/// Numeric and measurement tokens such as `20`, `10kg`, or `2.5ml`.
pub fn is_measurement_token(token: &str) -> bool {
	let digits = token.bytes().take_while(u8::is_ascii_digit).count();

	if digits == 0 {
		return false;
	}

	matches!(
		&token[digits..],
		"" | "kg" | "kgs" | "kilo" | "kilos" | "mg" | "ml" | "g" | "gr" | "cc" | "l" | "lt" | "mcg"
	)
}
