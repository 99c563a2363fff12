use super::alphabet::{Alphabet, fold};

/// Marker substituted for a non-letter at either edge of an n-gram.
pub const WILDCARD: char = '*';

/// Canonicalizes a raw window of characters into an n-gram key.
///
/// Returns `None` when the window carries no signal:
/// - length 1: the character is not an in-alphabet letter
/// - length 2: neither end is an in-alphabet letter
/// - length 3+: any interior character is not an in-alphabet letter
///
/// Non-letters at the first or last position are replaced by `WILDCARD`,
/// which keeps word-boundary information without keeping the punctuation.
pub fn normalize(window: &[char], alphabet: &Alphabet) -> Option<String> {
	let edge = |c: char| {
		let c = fold(c);
		if alphabet.is_letter(c) { c } else { WILDCARD }
	};

	match window {
		[] => None,
		[only] => {
			let c = fold(*only);
			alphabet.is_letter(c).then(|| c.to_string())
		}
		[first, last] => {
			let (first, last) = (edge(*first), edge(*last));
			if first == WILDCARD && last == WILDCARD {
				return None;
			}
			Some([first, last].iter().collect())
		}
		[first, center @ .., last] => {
			let mut key = String::with_capacity(window.len() * 2);
			key.push(edge(*first));
			for &c in center {
				let c = fold(c);
				if !alphabet.is_letter(c) {
					return None;
				}
				key.push(c);
			}
			key.push(edge(*last));
			Some(key)
		}
	}
}

/// Slides a window of `length` characters over `text` and calls `callback`
/// with every accepted key.
///
/// Does nothing when `length` is 0 or longer than the text.
pub fn for_each_ngram<F>(text: &[char], length: usize, alphabet: &Alphabet, mut callback: F)
where
	F: FnMut(String),
{
	if length == 0 || text.len() < length {
		return;
	}
	for window in text.windows(length) {
		if let Some(key) = normalize(window, alphabet) {
			callback(key);
		}
	}
}
