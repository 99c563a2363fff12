//! Corpus readers feeding the profile builder.
//!
//! - `dump`: line-oriented XML dumps with `<page>` records
//! - `tree`: a directory of shards, one article per file

pub mod dump;
pub mod tree;

/// Title or file-name fragments of pages that are not article prose.
///
/// Matching is case-sensitive substring containment.
pub const DISALLOWED_NAMES: &[&str] = &[
	"User",
	"Talk",
	"Help",
	"MediaWiki",
	"Wikipedia",
	"Portail",
	"Wikipédia",
	"Шаблон",
	"Википедия",
];

/// Separates a namespace from a page name (`Category:Foo`).
pub const NAMESPACE_SEPARATOR: char = ':';

/// First character of a redirect stub body (`#REDIRECT [[...]]`).
pub const REDIRECT_MARKER: char = '#';

/// Why a record was not counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
	DisallowedName,
	Namespaced,
	Redirect,
	TooShort,
}

/// Returns `true` if `name` contains one of the `DISALLOWED_NAMES`.
pub fn has_disallowed_name(name: &str) -> bool {
	DISALLOWED_NAMES.iter().any(|n| name.contains(n))
}

/// Checks a dump page title.
pub fn title_rejection(title: &str) -> Option<RejectReason> {
	if has_disallowed_name(title) {
		Some(RejectReason::DisallowedName)
	} else if title.contains(NAMESPACE_SEPARATOR) {
		Some(RejectReason::Namespaced)
	} else {
		None
	}
}

/// Checks a dump page body.
pub fn body_rejection(body: &str, min_body_length: usize) -> Option<RejectReason> {
	if body.starts_with(REDIRECT_MARKER) {
		Some(RejectReason::Redirect)
	} else if body.chars().take(min_body_length).count() < min_body_length {
		Some(RejectReason::TooShort)
	} else {
		None
	}
}
