use std::path::{Path, PathBuf};

use super::has_disallowed_name;
use crate::error::{Error, Result};
use crate::io;

/// Article files found under a corpus tree.
#[derive(Debug, Default)]
pub struct TreeListing {
	/// Accepted article files, shard by shard, each shard sorted by name.
	pub articles: Vec<PathBuf>,
	/// Files skipped because their name contains a disallowed fragment.
	pub rejected: usize,
}

/// Lists the articles of a directory tree corpus.
///
/// The root holds one level of shard directories; every regular file inside a
/// shard is one article named after its page title. Files directly in the root
/// are ignored.
///
/// # Errors
/// Returns `Error::CorpusIo` if the root cannot be listed. An unreadable shard
/// is logged and skipped.
pub fn list_articles<P: AsRef<Path>>(root: P) -> Result<TreeListing> {
	let root = io::normalize_folder(root);
	let shards = io::list_dirs(&root).map_err(|source| Error::CorpusIo { path: root.clone(), source })?;

	let mut listing = TreeListing::default();
	for shard in shards {
		let files = match io::list_files(&shard, None) {
			Ok(files) => files,
			Err(e) => {
				log::warn!("skipping shard {}: {e}", shard.display());
				continue;
			}
		};

		for file in files {
			let name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
			if has_disallowed_name(&name) {
				log::debug!("rejected {}", file.display());
				listing.rejected += 1;
			} else {
				listing.articles.push(file);
			}
		}
	}

	Ok(listing)
}
