//! Language profiling and scoring.
//!
//! - Alphabet policy and letter folding (`Alphabet`)
//! - Canonical n-gram keys (`ngram`)
//! - Markup removal (`MarkupStripper`)
//! - Per-language frequency tables (`Profile`, `ProfileSet`)
//! - Corpus-to-profile accumulation (`ProfileBuilder`)
//! - Scoring and normalization (`Scorer`, `Scores`, `Distribution`)

/// Per-language letter sets and case folding.
pub mod alphabet;

/// Window normalization into n-gram keys.
///
/// Shared by the builder and the scorer so both produce identical keys.
pub mod ngram;

/// Wiki and plain-text markup stripper.
pub mod markup;

/// N-gram frequency table of one language, with JSON and binary persistence.
pub mod profile;

/// Read-only collection of loaded profiles.
pub mod profile_set;

/// Streams a corpus into a profile with periodic checkpoints.
pub mod profile_builder;

/// Raw scores and their normalized distribution.
pub mod scores;

/// Length-weighted n-gram matching against a profile set.
pub mod scorer;
