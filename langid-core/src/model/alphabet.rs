use std::collections::BTreeSet;

use crate::error::{Error, Result};

const LATIN: &[char] = &[
	'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
	'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

const GERMAN_EXTRA: &[char] = &['ä', 'ö', 'ü', 'ß'];

const FRENCH_EXTRA: &[char] = &[
	'à', 'â', 'æ', 'ç', 'é', 'è', 'ê', 'ë', 'î', 'ï', 'ô', 'œ', 'ù', 'û', 'ü', 'ÿ',
];

const CYRILLIC: &[char] = &[
	'а', 'б', 'в', 'г', 'д', 'е', 'ж', 'з', 'и', 'й', 'к', 'л', 'м', 'н', 'о', 'п',
	'р', 'с', 'т', 'у', 'ф', 'х', 'ц', 'ч', 'ш', 'щ', 'ь', 'ю', 'я',
];

const RUSSIAN_EXTRA: &[char] = &['ё', 'ъ', 'ы', 'э'];
const UKRAINIAN_EXTRA: &[char] = &['ґ', 'є', 'і', 'ї'];
const BULGARIAN_EXTRA: &[char] = &['ъ'];

/// Punctuation kept by the markup stripper for every language.
pub const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', '\'', '"', '(', ')'];

/// Language codes with a configured alphabet.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "de", "fr", "ru", "uk", "bg"];

/// Lowercases a single character without changing the character count.
///
/// Characters whose lowercase mapping expands to several chars keep only the
/// first one, so a window of `n` input chars always folds to `n` chars.
#[inline]
pub fn fold(c: char) -> char {
	c.to_lowercase().next().unwrap_or(c)
}

/// Reduces a language tag such as `en-US` or `EN_gb` to its primary subtag.
pub fn primary_subtag(code: &str) -> String {
	code.split(['-', '_'])
		.next()
		.unwrap_or_default()
		.trim()
		.to_lowercase()
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Letters {
	Set(BTreeSet<char>),
	Any,
}

/// The set of characters a language "owns".
///
/// Letters decide which characters may take part in an n-gram, letters and
/// punctuation together decide which characters survive markup stripping.
///
/// # Invariants
/// - Letters are stored lowercase and are all alphabetic
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
	letters: Letters,
	punctuation: BTreeSet<char>,
}

impl Alphabet {
	/// Returns the alphabet configured for a language code.
	///
	/// # Errors
	/// Returns `Error::UnsupportedLanguage` if the primary subtag is not one of
	/// `SUPPORTED_LANGUAGES`.
	pub fn for_language(code: &str) -> Result<Self> {
		let extra: &[char] = match primary_subtag(code).as_str() {
			"en" => &[],
			"de" => GERMAN_EXTRA,
			"fr" => FRENCH_EXTRA,
			"ru" => RUSSIAN_EXTRA,
			"uk" => UKRAINIAN_EXTRA,
			"bg" => BULGARIAN_EXTRA,
			_ => return Err(Error::UnsupportedLanguage(code.to_owned())),
		};
		let base = if Self::is_cyrillic(code) { CYRILLIC } else { LATIN };
		Ok(Self::from_letters(base.iter().chain(extra).copied()))
	}

	/// Builds an alphabet from an arbitrary letter list plus the standard
	/// punctuation. Letters are folded to lowercase; non-alphabetic chars are
	/// dropped.
	pub fn from_letters<I: IntoIterator<Item = char>>(letters: I) -> Self {
		Self {
			letters: Letters::Set(
				letters
					.into_iter()
					.map(fold)
					.filter(|c| c.is_alphabetic())
					.collect(),
			),
			punctuation: PUNCTUATION.iter().copied().collect(),
		}
	}

	/// An alphabet accepting every alphabetic character.
	///
	/// Used at scoring time so every profile is probed with identical keys.
	pub fn unrestricted() -> Self {
		Self {
			letters: Letters::Any,
			punctuation: PUNCTUATION.iter().copied().collect(),
		}
	}

	fn is_cyrillic(code: &str) -> bool {
		matches!(primary_subtag(code).as_str(), "ru" | "uk" | "bg")
	}

	/// Returns `true` if `c` (already lowercase) is an in-alphabet letter.
	#[inline]
	pub fn is_letter(&self, c: char) -> bool {
		match &self.letters {
			Letters::Set(set) => set.contains(&c),
			Letters::Any => c.is_alphabetic(),
		}
	}

	/// Returns `true` if `c` survives the alphabet-filtering pass, i.e. its
	/// lowercase form is a letter or it is accepted punctuation.
	#[inline]
	pub fn contains(&self, c: char) -> bool {
		let lower = fold(c);
		self.is_letter(lower) || self.punctuation.contains(&lower)
	}

	/// Ordered letters of the alphabet, or `None` for the unrestricted policy.
	pub fn letters(&self) -> Option<impl Iterator<Item = char> + '_> {
		match &self.letters {
			Letters::Set(set) => Some(set.iter().copied()),
			Letters::Any => None,
		}
	}

	pub fn punctuation(&self) -> impl Iterator<Item = char> + '_ {
		self.punctuation.iter().copied()
	}
}
