use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the profiling and scoring engine.
///
/// Expected "no match" outcomes are not errors: an input that matches nothing
/// yields a `Distribution::NoConfidentLanguage`, and unbalanced markup is
/// reported as `MalformedMarkup` values next to the stripped text.
#[derive(Debug, Error)]
pub enum Error {
	/// A single profile file could not be read or parsed.
	#[error("failed to load profile {}: {source}", path.display())]
	ProfileLoad {
		path: PathBuf,
		#[source]
		source: ProfileLoadError,
	},

	/// No profile at all could be loaded from a directory.
	#[error("no language profiles could be loaded from {}", dir.display())]
	NoProfiles { dir: PathBuf },

	#[error("language is not supported: {0}")]
	UnsupportedLanguage(String),

	/// The requested starting n-gram length is outside `1..=max`.
	#[error("n-gram start length {start} is outside the usable range 1..={max}")]
	InvalidRange { start: usize, max: usize },

	/// A corpus file or directory could not be read.
	#[error("corpus I/O error on {}: {source}", path.display())]
	CorpusIo {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("failed to write profile {}: {source}", path.display())]
	ProfileWrite {
		path: PathBuf,
		#[source]
		source: ProfileLoadError,
	},

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
}

/// Underlying cause of a profile read/write failure.
#[derive(Debug, Error)]
pub enum ProfileLoadError {
	#[error(transparent)]
	Io(#[from] io::Error),

	#[error("malformed profile JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("malformed binary profile cache: {0}")]
	Cache(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
