//! N-gram language identification library.
//!
//! This crate provides the building blocks of a character n-gram language
//! detector:
//! - Per-language alphabets and canonical n-gram keys
//! - Markup stripping for wiki dumps and plain-text article trees
//! - Profile building from large corpora, with checkpoints and cancellation
//! - Profile loading and length-weighted scoring of input text
//!
//! Scoring is read-only: a loaded `Scorer` can be shared between threads.

/// Profiles, builder and scorer.
pub mod model;

/// Corpus readers (XML dump records, shard trees) and page filters.
pub mod corpus;

/// Crate-level error types.
pub mod error;

/// Cooperative cancellation of build runs.
pub mod cancel;

/// I/O utilities (profile encoding, atomic writes, directory listing).
///
/// Not exposed
pub(crate) mod io;

pub use cancel::CancellationToken;
pub use error::{Error, ProfileLoadError, Result};
pub use model::alphabet::Alphabet;
pub use model::markup::{MarkupStripper, StripMode};
pub use model::profile::Profile;
pub use model::profile_builder::{BuildOutcome, BuildStats, BuilderConfig, CorpusFormat, ProfileBuilder};
pub use model::profile_set::{LoadOptions, ProfileSet};
pub use model::scorer::{CorpusNormalization, LengthWeighting, ScoreRequest, Scorer, ScorerConfig};
pub use model::scores::{Distribution, LanguageShare, Scores};
