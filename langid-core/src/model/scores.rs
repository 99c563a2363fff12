use std::collections::BTreeMap;

use serde::Serialize;

/// One language's share of the total score.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LanguageShare {
	pub language: String,
	/// Fraction of the summed score, in `0.0..=1.0`.
	pub share: f64,
}

impl LanguageShare {
	/// The share as a percentage, in `0.0..=100.0`.
	pub fn percent(&self) -> f64 {
		self.share * 100.0
	}
}

/// Normalized view of a set of raw scores.
#[derive(Clone, Debug, PartialEq)]
pub enum Distribution {
	/// The scores sum to (practically) zero: nothing matched.
	NoConfidentLanguage,
	/// Shares sorted by descending value; they sum to 1.
	Confident(Vec<LanguageShare>),
}

impl Distribution {
	/// The language with the largest share, if any.
	pub fn best(&self) -> Option<&LanguageShare> {
		match self {
			Distribution::NoConfidentLanguage => None,
			Distribution::Confident(shares) => shares.first(),
		}
	}

	pub fn is_confident(&self) -> bool {
		matches!(self, Distribution::Confident(_))
	}

	/// Shares in descending order; empty when no language is confident.
	pub fn shares(&self) -> &[LanguageShare] {
		match self {
			Distribution::NoConfidentLanguage => &[],
			Distribution::Confident(shares) => shares,
		}
	}
}

/// Raw per-language scores produced by the scorer.
///
/// # Invariants
/// - Every language of the scored profile set is present
/// - Scores are finite and non-negative
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Scores {
	scores: BTreeMap<String, f64>,
}

impl Scores {
	pub(crate) fn new(scores: BTreeMap<String, f64>) -> Self {
		Self { scores }
	}

	/// Raw score of `language`, `None` if it was not part of the profile set.
	pub fn get(&self, language: &str) -> Option<f64> {
		self.scores.get(language).copied()
	}

	/// Iterates over `(language, raw score)` in language order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
		self.scores.iter().map(|(k, v)| (k.as_str(), *v))
	}

	pub fn as_map(&self) -> &BTreeMap<String, f64> {
		&self.scores
	}

	/// Sum of all raw scores.
	pub fn sum(&self) -> f64 {
		self.scores.values().sum()
	}

	/// Normalizes the scores into a distribution.
	///
	/// - If the sum is at most `zero_threshold`, there is no confident language.
	/// - Otherwise each share is the language's score divided by the sum.
	pub fn distribution(&self, zero_threshold: f64) -> Distribution {
		let sum = self.sum();
		if !sum.is_finite() || sum <= zero_threshold {
			return Distribution::NoConfidentLanguage;
		}

		let mut shares: Vec<LanguageShare> = self
			.scores
			.iter()
			.map(|(language, score)| LanguageShare { language: language.clone(), share: score / sum })
			.collect();
		shares.sort_by(|a, b| b.share.total_cmp(&a.share).then_with(|| a.language.cmp(&b.language)));

		Distribution::Confident(shares)
	}
}
