use std::collections::BTreeMap;

use super::alphabet::Alphabet;
use super::ngram::for_each_ngram;
use super::profile::Profile;
use super::profile_set::ProfileSet;
use super::scores::{Distribution, Scores};
use crate::error::{Error, Result};

/// Multiplier applied to the matched count of each n-gram length.
///
/// All variants are computed in `f64`, so long n-grams cannot overflow.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LengthWeighting {
	/// Every length weighs 1.
	Uniform,
	/// `base^(n-1)`; strictly increasing for `base > 1`.
	Exponential { base: f64 },
	/// `n!`.
	Factorial,
}

impl Default for LengthWeighting {
	fn default() -> Self {
		LengthWeighting::Exponential { base: 10.0 }
	}
}

impl LengthWeighting {
	/// Multiplier for matches of `length` chars.
	pub fn weight(&self, length: usize) -> f64 {
		match *self {
			LengthWeighting::Uniform => 1.0,
			LengthWeighting::Exponential { base } => {
				base.powi(length.saturating_sub(1).min(i32::MAX as usize) as i32)
			}
			LengthWeighting::Factorial => (2..=length).map(|k| k as f64).product(),
		}
	}
}

/// Divisor correcting for profiles built from corpora of different sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorpusNormalization {
	/// `score / total_text_length`.
	#[default]
	TextLength,
	/// `score / total_text_length * smallest total_text_length in the set`.
	RelativeToSmallest,
	/// Raw weighted counts.
	None,
}

/// Scorer settings.
#[derive(Clone, Debug)]
pub struct ScorerConfig {
	pub weighting: LengthWeighting,
	pub normalization: CorpusNormalization,
	/// Starting n-gram length used by `Scorer::detect`.
	pub start_length: usize,
	/// Score sums at or below this value mean "no confident language".
	pub zero_threshold: f64,
	/// Letters accepted when normalizing input windows.
	pub alphabet: Alphabet,
}

impl Default for ScorerConfig {
	fn default() -> Self {
		Self {
			weighting: LengthWeighting::default(),
			normalization: CorpusNormalization::default(),
			start_length: 2,
			zero_threshold: 1e-12,
			alphabet: Alphabet::unrestricted(),
		}
	}
}

/// A scoring query: the text and the shortest n-gram length to probe.
#[derive(Clone, Copy, Debug)]
pub struct ScoreRequest<'a> {
	pub text: &'a str,
	pub start_length: usize,
}

impl<'a> ScoreRequest<'a> {
	pub fn new(text: &'a str, start_length: usize) -> Self {
		Self { text, start_length }
	}
}

/// Computes per-language scores for an input text.
///
/// Scoring is a pure function of the profile set, the configuration and the
/// request. The scorer holds no mutable state and may be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct Scorer {
	profiles: ProfileSet,
	config: ScorerConfig,
}

impl Scorer {
	/// Wraps a loaded profile set. The set is never modified afterwards.
	pub fn new(profiles: ProfileSet, config: ScorerConfig) -> Self {
		Self { profiles, config }
	}

	pub fn profiles(&self) -> &ProfileSet {
		&self.profiles
	}

	pub fn config(&self) -> &ScorerConfig {
		&self.config
	}

	/// Scores `request.text` against every profile.
	///
	/// For each length `n` from `request.start_length` to the set's maximum,
	/// every window of `n` chars is normalized and its count looked up in each
	/// profile. Per-length subtotals are multiplied by the length weight, then
	/// each language's total is divided according to the corpus
	/// normalization.
	///
	/// When every profile is empty and declares no maximum, the usable range is
	/// empty and every language scores 0.
	///
	/// # Errors
	/// Returns `Error::InvalidRange` if the start length is 0, or greater than a
	/// non-zero `ProfileSet::max_ngram_length`.
	pub fn score(&self, request: &ScoreRequest) -> Result<Scores> {
		let max = self.profiles.max_ngram_length();
		if request.start_length == 0 || (max > 0 && request.start_length > max) {
			return Err(Error::InvalidRange { start: request.start_length, max });
		}

		let text: Vec<char> = request.text.chars().collect();
		let profiles: Vec<&Profile> = self.profiles.profiles().collect();
		let mut totals = vec![0.0f64; profiles.len()];
		let mut subtotals = vec![0u64; profiles.len()];

		for length in request.start_length..=max {
			subtotals.iter_mut().for_each(|s| *s = 0);
			for_each_ngram(&text, length, &self.config.alphabet, |key| {
				for (subtotal, profile) in subtotals.iter_mut().zip(&profiles) {
					*subtotal = subtotal.saturating_add(profile.count(&key));
				}
			});

			let weight = self.config.weighting.weight(length);
			for (total, subtotal) in totals.iter_mut().zip(&subtotals) {
				*total += *subtotal as f64 * weight;
			}
		}

		let smallest = self.profiles.min_total_text_length() as f64;
		let scores: BTreeMap<String, f64> = profiles
			.iter()
			.zip(totals)
			.map(|(profile, total)| {
				let length = profile.total_text_length() as f64;
				let score = match self.config.normalization {
					CorpusNormalization::None => total,
					_ if length == 0.0 => 0.0,
					CorpusNormalization::TextLength => total / length,
					CorpusNormalization::RelativeToSmallest => total / length * smallest,
				};
				(profile.language().to_owned(), score)
			})
			.collect();

		Ok(Scores::new(scores))
	}

	/// Scores `text` with the configured start length and normalizes the
	/// result.
	pub fn detect(&self, text: &str) -> Result<(Scores, Distribution)> {
		let scores = self.score(&ScoreRequest::new(text, self.config.start_length))?;
		let distribution = scores.distribution(self.config.zero_threshold);
		Ok((scores, distribution))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn profile(language: &str, keys: &[(&str, u64)], total: u64) -> Profile {
		let counts: HashMap<String, u64> = keys.iter().map(|(k, c)| (k.to_string(), *c)).collect();
		Profile::from_counts(language, counts, total)
	}

	fn build(language: &str, text: &str, max: usize) -> Profile {
		let alphabet = Alphabet::for_language(language).unwrap();
		let mut p = Profile::with_max_ngram_length(language, max);
		let chars: Vec<char> = text.chars().collect();
		p.add_text(&chars, max, &alphabet);
		p
	}

	fn scorer(profiles: Vec<Profile>) -> Scorer {
		Scorer::new(ProfileSet::from_profiles(profiles).unwrap(), ScorerConfig::default())
	}

	#[test]
	fn weights_increase_with_length_and_do_not_overflow() {
		let weighting = LengthWeighting::default();
		for n in 1..40 {
			assert!(weighting.weight(n + 1) > weighting.weight(n));
		}
		assert!(LengthWeighting::Factorial.weight(30).is_finite());
		assert_eq!(LengthWeighting::Factorial.weight(4), 24.0);
		assert_eq!(LengthWeighting::Uniform.weight(9), 1.0);
	}

	#[test]
	fn hello_world_scenario() {
		let scorer = scorer(vec![
			profile("en", &[("he", 50)], 10_000),
			profile("fr", &[], 0),
			profile("ru", &[], 500),
		]);
		assert_eq!(scorer.profiles().max_ngram_length(), 2);

		let scores = scorer.score(&ScoreRequest::new("hello world", 2)).unwrap();
		assert!(scores.get("en").unwrap() > 0.0);
		assert_eq!(scores.get("fr"), Some(0.0));
		assert_eq!(scores.get("ru"), Some(0.0));

		let distribution = scores.distribution(1e-12);
		let best = distribution.best().unwrap();
		assert_eq!(best.language, "en");
		assert_eq!(best.percent(), 100.0);
	}

	#[test]
	fn empty_text_has_no_confident_language() {
		let scorer = scorer(vec![build("en", "the quick brown fox", 3), build("ru", "быстрая лиса", 3)]);
		let (scores, distribution) = scorer.detect("").unwrap();
		assert!(scores.iter().all(|(_, s)| s == 0.0));
		assert_eq!(distribution, Distribution::NoConfidentLanguage);
	}

	#[test]
	fn empty_profiles_score_zero_instead_of_failing() {
		let scorer = scorer(vec![profile("en", &[], 0), profile("fr", &[], 10)]);
		assert_eq!(scorer.profiles().max_ngram_length(), 0);

		let (scores, distribution) = scorer.detect("").unwrap();
		assert_eq!(scores.get("en"), Some(0.0));
		assert_eq!(scores.get("fr"), Some(0.0));
		assert_eq!(distribution, Distribution::NoConfidentLanguage);

		let (scores, _) = scorer.detect("hello").unwrap();
		assert_eq!(scores.sum(), 0.0);
	}

	#[test]
	fn start_length_out_of_range_is_rejected() {
		let scorer = scorer(vec![build("en", "some text here", 3)]);
		assert!(matches!(
			scorer.score(&ScoreRequest::new("text", 4)),
			Err(Error::InvalidRange { start: 4, max: 3 })
		));
		assert!(matches!(
			scorer.score(&ScoreRequest::new("text", 0)),
			Err(Error::InvalidRange { start: 0, .. })
		));
	}

	#[test]
	fn text_from_one_alphabet_scores_that_language_highest() {
		let scorer = scorer(vec![
			build("en", "the weather is nice today and the sun is shining", 3),
			build("ru", "сегодня хорошая погода и светит солнце", 3),
			build("de", "das wetter ist heute schön und die sonne scheint", 3),
		]);

		let (scores, distribution) = scorer.detect("погода хорошая").unwrap();
		let ru = scores.get("ru").unwrap();
		assert!(ru > 0.0);
		for (language, score) in scores.iter() {
			if language != "ru" {
				assert!(score < ru, "{language} scored {score} >= {ru}");
			}
		}
		assert_eq!(distribution.best().unwrap().language, "ru");
	}

	#[test]
	fn longer_matches_dominate() {
		// Same unigram mass, but only "en" knows the trigram.
		let scorer = scorer(vec![
			profile("en", &[("a", 10), ("b", 10), ("c", 10), ("abc", 1)], 100),
			profile("xx", &[("a", 10), ("b", 10), ("c", 10), ("zzz", 1)], 100),
		]);
		let scores = scorer.score(&ScoreRequest::new("abc", 1)).unwrap();
		assert!(scores.get("en").unwrap() > scores.get("xx").unwrap());
	}

	#[test]
	fn corpus_size_is_normalized() {
		let mut config = ScorerConfig::default();
		let set = ProfileSet::from_profiles(vec![
			profile("en", &[("ab", 10)], 100),
			profile("de", &[("ab", 100)], 1_000),
		])
		.unwrap();

		let scores = Scorer::new(set.clone(), config.clone()).score(&ScoreRequest::new("ab", 1)).unwrap();
		assert_eq!(scores.get("en"), scores.get("de"));

		config.normalization = CorpusNormalization::RelativeToSmallest;
		let scores = Scorer::new(set.clone(), config.clone()).score(&ScoreRequest::new("ab", 1)).unwrap();
		assert_eq!(scores.get("en"), Some(100.0));

		config.normalization = CorpusNormalization::None;
		let scores = Scorer::new(set, config).score(&ScoreRequest::new("ab", 1)).unwrap();
		assert_eq!(scores.get("de"), Some(1000.0));
	}

	#[test]
	fn scoring_is_deterministic() {
		let scorer = scorer(vec![build("en", "repeatable results", 3), build("fr", "résultats répétables", 3)]);
		let a = scorer.score(&ScoreRequest::new("results", 1)).unwrap();
		let b = scorer.score(&ScoreRequest::new("results", 1)).unwrap();
		assert_eq!(a, b);
	}
}
