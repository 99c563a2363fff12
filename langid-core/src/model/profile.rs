use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::alphabet::Alphabet;
use super::ngram::for_each_ngram;
use crate::error::{Error, ProfileLoadError, Result};
use crate::io;

/// A language's n-gram frequency table.
///
/// The `Profile` maps canonical n-gram keys (see `ngram::normalize`) to the
/// number of times they were observed, together with the number of characters
/// that were processed to collect them.
///
/// # Responsibilities
/// - Accumulate n-gram counts from stripped article text
/// - Merge with a partial profile of the same language (parallel building)
/// - Persist to and load from the UTF-16 JSON profile format
///
/// # Invariants
/// - Counts only grow while building; a loaded profile is never mutated
/// - `total_text_length` and the counts are updated by the same call
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
	/// Language code, taken from the file stem when loaded.
	#[serde(skip)]
	language: String,

	#[serde(rename = "NGramsDict", alias = "NgramsDict")]
	ngrams: HashMap<String, u64>,

	/// Number of characters processed to build the counts.
	#[serde(rename = "FullTextLength")]
	total_text_length: u64,

	/// Longest n-gram length extracted at build time, when recorded.
	#[serde(rename = "MaxNGramLength", default, skip_serializing_if = "Option::is_none")]
	max_ngram_length: Option<usize>,
}

/// Compact form stored in the binary cache next to a JSON profile.
#[derive(Serialize, Deserialize)]
struct CacheRecord {
	ngrams: HashMap<String, u64>,
	total_text_length: u64,
	max_ngram_length: Option<usize>,
}

impl Profile {
	/// Creates an empty profile for `language`.
	pub fn new(language: &str) -> Self {
		Self { language: language.to_owned(), ..Self::default() }
	}

	/// Creates an empty profile that records the build-time maximum n-gram
	/// length.
	pub fn with_max_ngram_length(language: &str, max_ngram_length: usize) -> Self {
		Self { max_ngram_length: Some(max_ngram_length), ..Self::new(language) }
	}

	/// Creates a profile from existing counts.
	pub fn from_counts(language: &str, ngrams: HashMap<String, u64>, total_text_length: u64) -> Self {
		Self { language: language.to_owned(), ngrams, total_text_length, max_ngram_length: None }
	}

	/// Language code of the profile (file stem when loaded from disk).
	pub fn language(&self) -> &str {
		&self.language
	}

	/// All counted n-grams and their occurrences.
	pub fn ngram_counts(&self) -> &HashMap<String, u64> {
		&self.ngrams
	}

	/// Returns the count of `key`, 0 when absent.
	#[inline]
	pub fn count(&self, key: &str) -> u64 {
		self.ngrams.get(key).copied().unwrap_or(0)
	}

	/// Number of chars processed to build the counts.
	pub fn total_text_length(&self) -> u64 {
		self.total_text_length
	}

	/// Number of distinct n-grams.
	pub fn len(&self) -> usize {
		self.ngrams.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ngrams.is_empty()
	}

	/// Build-time maximum n-gram length, if the profile recorded one.
	pub fn declared_max_ngram_length(&self) -> Option<usize> {
		self.max_ngram_length
	}

	/// Length in characters of the longest key present (0 when empty).
	pub fn longest_key_length(&self) -> usize {
		self.ngrams.keys().map(|k| k.chars().count()).max().unwrap_or(0)
	}

	/// The longest n-gram length this profile can be probed with: the
	/// declared build-time maximum, or the longest key when none is declared.
	///
	/// Returns `None` for an empty profile without a declared maximum.
	pub fn usable_max_ngram_length(&self) -> Option<usize> {
		match self.max_ngram_length {
			Some(max) => Some(max),
			None if self.ngrams.is_empty() => None,
			None => Some(self.longest_key_length()),
		}
	}

	/// Records one occurrence of `key`.
	pub fn add(&mut self, key: String) {
		*self.ngrams.entry(key).or_insert(0) += 1;
	}

	/// Adds a stripped text: every n-gram of length `1..=max_ngram_length`
	/// is counted and the text length is added to the total.
	pub fn add_text(&mut self, text: &[char], max_ngram_length: usize, alphabet: &Alphabet) {
		self.total_text_length += text.len() as u64;
		for length in 1..=max_ngram_length {
			for_each_ngram(text, length, alphabet, |key| self.add(key));
		}
	}

	/// Merges another profile of the same language into this one.
	///
	/// # Notes
	/// - Counts and text lengths are summed.
	/// - The declared maximum is kept when both sides agree.
	///
	/// # Errors
	/// Returns an error if the languages or the declared maxima differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.language != other.language {
			return Err(Error::InvalidConfig(format!(
				"cannot merge profile '{}' into '{}'",
				other.language, self.language
			)));
		}
		if self.max_ngram_length != other.max_ngram_length {
			return Err(Error::InvalidConfig("n-gram length mismatch between profiles".to_owned()));
		}

		for (key, count) in &other.ngrams {
			*self.ngrams.entry(key.clone()).or_insert(0) += *count;
		}
		self.total_text_length += other.total_text_length;
		Ok(())
	}

	/// Serializes the profile to its JSON wire form (UTF-16LE with BOM) and
	/// writes it atomically.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let path = path.as_ref();
		let wrap = |source: ProfileLoadError| Error::ProfileWrite { path: path.to_path_buf(), source };

		let json = serde_json::to_string(self).map_err(|e| wrap(e.into()))?;
		io::write_atomic(path, &io::encode_utf16le(&json)).map_err(|e| wrap(e.into()))
	}

	/// Loads a JSON profile; the language code is the file stem.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		Self::read_json(path).map_err(|source| Error::ProfileLoad { path: path.to_path_buf(), source })
	}

	fn read_json(path: &Path) -> std::result::Result<Self, ProfileLoadError> {
		let bytes = fs::read(path)?;
		let mut profile: Profile = serde_json::from_str(&io::decode_profile_bytes(&bytes))?;
		profile.language = io::language_code(path)?;
		Ok(profile)
	}

	/// Loads a JSON profile through its binary cache.
	///
	/// - Uses `<stem>.bin` when it exists and is not older than the JSON file.
	/// - Otherwise parses the JSON and (re)writes the cache with `postcard`.
	/// - A broken or unwritable cache only costs a JSON parse.
	pub fn load_cached<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let cache_path = match io::sibling_path(path, "bin") {
			Ok(p) => p,
			Err(_) => return Self::load(path),
		};

		if Self::cache_is_fresh(path, &cache_path) {
			match Self::read_cache(&cache_path, path) {
				Ok(profile) => return Ok(profile),
				Err(e) => log::warn!("ignoring profile cache {}: {e}", cache_path.display()),
			}
		}

		let profile = Self::load(path)?;
		if let Err(e) = profile.write_cache(&cache_path) {
			log::warn!("could not write profile cache {}: {e}", cache_path.display());
		}
		Ok(profile)
	}

	fn cache_is_fresh(json_path: &Path, cache_path: &Path) -> bool {
		let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
		match (modified(json_path), modified(cache_path)) {
			(Some(json), Some(cache)) => cache >= json,
			_ => false,
		}
	}

	fn read_cache(cache_path: &Path, json_path: &Path) -> std::result::Result<Self, ProfileLoadError> {
		let bytes = fs::read(cache_path)?;
		let record: CacheRecord = postcard::from_bytes(&bytes)?;
		Ok(Self {
			language: io::language_code(json_path)?,
			ngrams: record.ngrams,
			total_text_length: record.total_text_length,
			max_ngram_length: record.max_ngram_length,
		})
	}

	fn write_cache(&self, cache_path: &Path) -> std::result::Result<(), ProfileLoadError> {
		let record = CacheRecord {
			ngrams: self.ngrams.clone(),
			total_text_length: self.total_text_length,
			max_ngram_length: self.max_ngram_length,
		};
		let bytes = postcard::to_stdvec(&record)?;
		io::write_atomic(cache_path, &bytes)?;
		Ok(())
	}
}
