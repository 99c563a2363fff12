use std::collections::BTreeMap;
use std::path::Path;

use super::profile::Profile;
use crate::error::{Error, Result};
use crate::io;

/// Options controlling how profiles are read from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoadOptions {
	/// Read and maintain a `postcard` cache (`<code>.bin`) next to each JSON
	/// profile.
	pub binary_cache: bool,
}

/// All language profiles available for scoring.
///
/// # Responsibilities
/// - Load every profile of a directory, skipping the ones that fail
/// - Expose profiles by language code in a stable order
/// - Derive the n-gram length every profile can be probed with
///
/// # Invariants
/// - Never empty
/// - Read-only once built; can be shared between threads without locking
#[derive(Debug, Clone)]
pub struct ProfileSet {
	profiles: BTreeMap<String, Profile>,
	max_ngram_length: usize,
}

impl ProfileSet {
	/// Builds a set from already loaded profiles.
	///
	/// A later profile with the same language replaces an earlier one.
	///
	/// # Errors
	/// Returns `Error::NoProfiles` if `profiles` is empty.
	pub fn from_profiles<I: IntoIterator<Item = Profile>>(profiles: I) -> Result<Self> {
		let profiles: BTreeMap<String, Profile> = profiles
			.into_iter()
			.map(|p| (p.language().to_owned(), p))
			.collect();

		if profiles.is_empty() {
			return Err(Error::NoProfiles { dir: Default::default() });
		}

		let max_ngram_length = profiles
			.values()
			.filter_map(Profile::usable_max_ngram_length)
			.min()
			.unwrap_or(0);

		Ok(Self { profiles, max_ngram_length })
	}

	/// Loads all `.json` profiles directly inside `dir`.
	///
	/// # Behavior
	/// - The language code of each profile is its file stem.
	/// - A profile that fails to load is logged and skipped.
	/// - Subdirectories are ignored.
	///
	/// # Errors
	/// - `Error::NoProfiles` if the directory cannot be listed or no profile
	///   could be loaded.
	pub fn load_dir<P: AsRef<Path>>(dir: P, options: LoadOptions) -> Result<Self> {
		let folder = io::normalize_folder(dir);

		let files = match io::list_files(&folder, Some("json")) {
			Ok(files) => files,
			Err(e) => {
				log::error!("cannot list profiles in {}: {e}", folder.display());
				return Err(Error::NoProfiles { dir: folder });
			}
		};

		let mut profiles = Vec::with_capacity(files.len());
		for file in files {
			let loaded = if options.binary_cache {
				Profile::load_cached(&file)
			} else {
				Profile::load(&file)
			};
			match loaded {
				Ok(profile) => {
					log::info!(
						"loaded profile '{}' ({} n-grams, {} chars)",
						profile.language(),
						profile.len(),
						profile.total_text_length()
					);
					profiles.push(profile);
				}
				Err(e) => log::warn!("skipping profile: {e}"),
			}
		}

		Self::from_profiles(profiles).map_err(|_| Error::NoProfiles { dir: folder })
	}

	/// Minimum, across profiles, of the longest n-gram length each supports.
	///
	/// Empty profiles without a declared build-time maximum do not take part.
	/// Returns 0 when no profile qualifies; the scorer then reports zero scores.
	pub fn max_ngram_length(&self) -> usize {
		self.max_ngram_length
	}

	/// Profile of `language`, if loaded.
	pub fn get(&self, language: &str) -> Option<&Profile> {
		self.profiles.get(language)
	}

	/// Loaded language codes, in sorted order.
	pub fn languages(&self) -> impl Iterator<Item = &str> {
		self.profiles.keys().map(String::as_str)
	}

	pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
		self.profiles.values()
	}

	pub fn len(&self) -> usize {
		self.profiles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.profiles.is_empty()
	}

	/// Smallest total text length among profiles (used for magnitude-preserving
	/// normalization).
	pub fn min_total_text_length(&self) -> u64 {
		self.profiles.values().map(Profile::total_text_length).min().unwrap_or(0)
	}
}
