//! Removal of wiki and plain-text markup ahead of n-gram extraction.
//!
//! All passes work on a `Vec<char>` buffer and are single forward scans:
//! a marker is located, its matching close is searched from there, and the
//! span is skipped while everything else is copied through. When a marker has
//! no matching close, removal for that marker stops and the remainder is
//! copied untouched.

use super::alphabet::Alphabet;

/// Upper bound on full thorough passes over one text.
const MAX_PASSES: usize = 32;

/// Formatting sequences collapsed before any span is removed.
const SUBSTITUTIONS: &[(&str, &str)] = &[
	(":{{", "{{"),
	("======", "=="),
	("=====", "=="),
	("====", "=="),
	("===", "=="),
	("'''", ""),
	("''", ""),
];

/// Spans removed by first-open / first-close matching.
const SHALLOW_SPANS: &[(&str, &str)] = &[
	("<ref>", "</ref>"),
	("==", "=="),
	("[[Image:", "]]"),
	("[[wikt:", "]]"),
];

/// Spans removed by balanced matching: `(open, nested open, close)`.
const NESTED_SPANS: &[(&str, &str, &str)] = &[
	("[[File:", "[[", "]]"),
	("{{", "{{", "}}"),
	("{|", "{|", "|}"),
	("(", "(", ")"),
];

/// How much markup removal happens before the alphabet filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StripMode {
	/// Substitutions, shallow spans, nested spans, links, citations, then the
	/// alphabet filter.
	#[default]
	Thorough,
	/// Alphabet filter only.
	Fast,
}

/// An opening marker that had no matching close.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedMarkup {
	pub marker: &'static str,
	/// Character offset of the marker in the buffer being scanned.
	pub position: usize,
}

/// Output of a stripping run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stripped {
	pub text: Vec<char>,
	pub malformed: Vec<MalformedMarkup>,
}

impl Stripped {
	/// Length of the stripped text, in chars.
	pub fn len(&self) -> usize {
		self.text.len()
	}

	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}

	/// Collects the stripped chars into a `String`.
	pub fn to_text(&self) -> String {
		self.text.iter().collect()
	}
}

/// Turns raw article bodies into near-plain prose for one alphabet.
#[derive(Clone, Debug)]
pub struct MarkupStripper {
	alphabet: Alphabet,
	mode: StripMode,
}

impl MarkupStripper {
	/// Creates a stripper filtering against `alphabet`.
	///
	/// # Parameters
	/// - `alphabet`: letters and punctuation that survive the final filter
	/// - `mode`: how much markup removal runs before the filter
	pub fn new(alphabet: Alphabet, mode: StripMode) -> Self {
		Self { alphabet, mode }
	}

	pub fn alphabet(&self) -> &Alphabet {
		&self.alphabet
	}

	pub fn mode(&self) -> StripMode {
		self.mode
	}

	/// Strips wiki markup from an article body according to the configured
	/// mode.
	///
	/// In thorough mode the removal passes repeat until the text stops
	/// changing, so a second call on the output removes nothing more. Only
	/// the malformed markers of the final pass are reported.
	pub fn strip(&self, text: &str) -> Stripped {
		let mut buf: Vec<char> = text.chars().collect();
		let mut malformed = Vec::new();

		if self.mode == StripMode::Thorough {
			for _ in 0..MAX_PASSES {
				malformed.clear();
				let before = buf.len();
				buf = Self::thorough_pass(buf, &mut malformed);
				// Every pass only deletes, so an unchanged length means a fixpoint.
				if buf.len() == before {
					break;
				}
			}
		}

		self.filter_alphabet(&mut buf);
		Stripped { text: buf, malformed }
	}

	/// Strips plain-text article markup: `[...]` and `<...>` spans with simple
	/// matching, then bare `==` markers, then the alphabet filter.
	pub fn strip_plain_text(&self, text: &str) -> Stripped {
		let mut malformed = Vec::new();
		let buf: Vec<char> = text.chars().collect();
		let buf = remove_shallow(&buf, "[", "]", &mut malformed);
		let buf = remove_shallow(&buf, "<", ">", &mut malformed);
		let mut buf = replace_all(&buf, "==", "");
		self.filter_alphabet(&mut buf);
		Stripped { text: buf, malformed }
	}

	fn thorough_pass(mut buf: Vec<char>, malformed: &mut Vec<MalformedMarkup>) -> Vec<char> {
		for (from, to) in SUBSTITUTIONS {
			buf = replace_all(&buf, from, to);
		}
		for (open, close) in SHALLOW_SPANS {
			buf = remove_shallow(&buf, open, close, malformed);
		}
		for (open, nested, close) in NESTED_SPANS {
			buf = remove_nested(&buf, open, nested, close, malformed);
		}
		buf = unwrap_links(&buf, malformed);
		remove_shallow(&buf, "[", "]", malformed)
	}

	/// Replaces every character outside the alphabet with a single space.
	fn filter_alphabet(&self, buf: &mut [char]) {
		for c in buf.iter_mut() {
			if !self.alphabet.contains(*c) {
				*c = ' ';
			}
		}
	}
}

#[inline]
fn starts_with(buf: &[char], at: usize, pattern: &str) -> bool {
	let mut i = at;
	for p in pattern.chars() {
		match buf.get(i) {
			Some(&c) if c == p => i += 1,
			_ => return false,
		}
	}
	true
}

fn find(buf: &[char], pattern: &str, from: usize) -> Option<usize> {
	(from..buf.len()).find(|&i| starts_with(buf, i, pattern))
}

fn char_len(s: &str) -> usize {
	s.chars().count()
}

fn replace_all(buf: &[char], from: &str, to: &str) -> Vec<char> {
	let from_len = char_len(from);
	let mut out = Vec::with_capacity(buf.len());
	let mut i = 0;
	while i < buf.len() {
		if starts_with(buf, i, from) {
			out.extend(to.chars());
			i += from_len;
		} else {
			out.push(buf[i]);
			i += 1;
		}
	}
	out
}

/// Removes `open ... close` spans, matching each open with the first close
/// that follows it.
fn remove_shallow(buf: &[char], open: &'static str, close: &str, malformed: &mut Vec<MalformedMarkup>) -> Vec<char> {
	let (open_len, close_len) = (char_len(open), char_len(close));
	let mut out = Vec::with_capacity(buf.len());
	let mut i = 0;
	while i < buf.len() {
		if !starts_with(buf, i, open) {
			out.push(buf[i]);
			i += 1;
			continue;
		}
		match find(buf, close, i + open_len) {
			Some(end) => i = end + close_len,
			None => {
				malformed.push(MalformedMarkup { marker: open, position: i });
				out.extend_from_slice(&buf[i..]);
				break;
			}
		}
	}
	out
}

/// Finds the end (exclusive) of a balanced span whose opener ends at `from`.
///
/// Every `nested` marker met before the candidate close pushes the close
/// search past that marker's own close.
fn balanced_end(buf: &[char], from: usize, nested: &str, close: &str) -> Option<usize> {
	let (nested_len, close_len) = (char_len(nested), char_len(close));
	let mut depth = 1usize;
	let mut i = from;
	while i < buf.len() {
		if starts_with(buf, i, close) {
			depth -= 1;
			i += close_len;
			if depth == 0 {
				return Some(i);
			}
		} else if starts_with(buf, i, nested) {
			depth += 1;
			i += nested_len;
		} else {
			i += 1;
		}
	}
	None
}

fn remove_nested(
	buf: &[char],
	open: &'static str,
	nested: &str,
	close: &str,
	malformed: &mut Vec<MalformedMarkup>,
) -> Vec<char> {
	let open_len = char_len(open);
	let mut out = Vec::with_capacity(buf.len());
	let mut i = 0;
	while i < buf.len() {
		if !starts_with(buf, i, open) {
			out.push(buf[i]);
			i += 1;
			continue;
		}
		match balanced_end(buf, i + open_len, nested, close) {
			Some(end) => i = end,
			None => {
				malformed.push(MalformedMarkup { marker: open, position: i });
				out.extend_from_slice(&buf[i..]);
				break;
			}
		}
	}
	out
}

/// Replaces `[[target|display]]` by `display` and drops links without a
/// display part.
fn unwrap_links(buf: &[char], malformed: &mut Vec<MalformedMarkup>) -> Vec<char> {
	let mut out = Vec::with_capacity(buf.len());
	let mut i = 0;
	while i < buf.len() {
		if !starts_with(buf, i, "[[") {
			out.push(buf[i]);
			i += 1;
			continue;
		}
		let Some(end) = find(buf, "]]", i + 2) else {
			malformed.push(MalformedMarkup { marker: "[[", position: i });
			out.extend_from_slice(&buf[i..]);
			break;
		};
		let inner = &buf[i + 2..end];
		if let Some(divider) = inner.iter().rposition(|&c| c == '|') {
			out.extend_from_slice(&inner[divider + 1..]);
		}
		i = end + 2;
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::rngs::StdRng;
	use rand::{Rng, SeedableRng};

	fn thorough() -> MarkupStripper {
		MarkupStripper::new(Alphabet::for_language("en").unwrap(), StripMode::Thorough)
	}

	fn strip(text: &str) -> String {
		thorough().strip(text).to_text()
	}

	#[test]
	fn nested_templates_are_removed_entirely() {
		assert_eq!(strip("{{a{{b}}c}}"), "");
		assert_eq!(strip("x {{a{{b}}c}} y"), "x  y");
	}

	#[test]
	fn triple_brace_parameters_are_balanced() {
		assert_eq!(strip("a{{{1}}}b"), "a b");
		assert_eq!(strip("a{{x{{y}}}}b"), "ab");
	}

	#[test]
	fn links_keep_display_text() {
		assert_eq!(strip("see [[Target page|the page]] now"), "see the page now");
		assert_eq!(strip("see [[Target]] now"), "see  now");
	}

	#[test]
	fn file_links_with_nested_links_are_removed() {
		assert_eq!(strip("a[[File:x.png|thumb|a [[cat]] here]]b"), "ab");
	}

	#[test]
	fn references_headings_and_citations_are_removed() {
		assert_eq!(strip("fact<ref>source</ref>."), "fact.");
		assert_eq!(strip("==History==\nold"), " old");
		assert_eq!(strip("=== Sub ===x"), "x");
		assert_eq!(strip("word[1] more"), "word more");
		assert_eq!(strip("it is (very (much)) big"), "it is  big");
	}

	#[test]
	fn tables_are_removed() {
		assert_eq!(strip("a{|\n| cell {| inner |} \n|}b"), "ab");
	}

	#[test]
	fn bold_and_italic_marks_are_flattened() {
		assert_eq!(strip("'''bold''' and ''it''"), "bold and it");
	}

	#[test]
	fn unbalanced_markup_is_left_in_place() {
		let stripped = thorough().strip("ok {{never closed and (x) more");
		assert_eq!(
			stripped.malformed,
			vec![MalformedMarkup { marker: "{{", position: 3 }]
		);
		// Other marker types are still removed behind the unclosed template.
		assert_eq!(stripped.to_text(), "ok   never closed and  more");
	}

	#[test]
	fn filter_replaces_foreign_characters_with_spaces() {
		assert_eq!(strip("Привет, world!"), "      , world!");
		assert_eq!(strip("a1b"), "a b");
	}

	#[test]
	fn fast_mode_only_filters() {
		let fast = MarkupStripper::new(Alphabet::for_language("en").unwrap(), StripMode::Fast);
		assert_eq!(fast.strip("{{a}} [[b|c]]").to_text(), "  a     b c  ");
	}

	#[test]
	fn plain_text_variant() {
		let stripper = thorough();
		let out = stripper.strip_plain_text("== Title ==\nText [edit] <b>bold</b> (kept)");
		assert_eq!(out.to_text(), " Title  Text  bold (kept)");
		let out = stripper.strip_plain_text("open [ never");
		assert_eq!(out.malformed, vec![MalformedMarkup { marker: "[", position: 5 }]);
	}

	#[test]
	fn stripping_is_idempotent() {
		const PIECES: &[&str] = &[
			"{{", "}}", "[[", "]]", "|", "(", ")", "[", "]", "==", "=", "<ref>", "</ref>",
			"{|", "|}", "[[File:", "'", "''", "word", " ", "Été", "x", ".",
		];
		let stripper = thorough();
		let mut rng = StdRng::seed_from_u64(42);
		for _ in 0..2000 {
			let len = rng.random_range(0..24);
			let text: String = (0..len).map(|_| PIECES[rng.random_range(0..PIECES.len())]).collect();
			let once = stripper.strip(&text).to_text();
			let twice = stripper.strip(&once).to_text();
			assert_eq!(once, twice, "input: {text:?}");
		}
	}

	#[test]
	fn plain_text_stripping_is_idempotent() {
		let stripper = thorough();
		let once = stripper.strip_plain_text("a [b] <c> == d [e").to_text();
		assert_eq!(stripper.strip_plain_text(&once).to_text(), once);
	}
}
