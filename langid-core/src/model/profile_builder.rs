use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use super::alphabet::Alphabet;
use super::markup::{MarkupStripper, StripMode, Stripped};
use super::profile::Profile;
use crate::cancel::CancellationToken;
use crate::corpus::dump::{DumpReader, Page};
use crate::corpus::{RejectReason, tree};
use crate::error::{Error, Result};
use crate::io;

/// Layout of the corpus fed to the builder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorpusFormat {
	/// Line-oriented XML dump with `<page>` records.
	#[default]
	Xml,
	/// Directory of shards, one plain-text article per file.
	PlainText,
}

/// Profile builder settings.
#[derive(Clone, Debug)]
pub struct BuilderConfig {
	pub language: String,
	/// Every n-gram length from 1 to this value is counted.
	pub max_ngram_length: usize,
	pub strip_mode: StripMode,
	/// Accepted records between two checkpoints; also the tree-mode batch size.
	pub checkpoint_interval: usize,
	/// Where checkpoints are written. `None` disables checkpointing.
	pub checkpoint_path: Option<PathBuf>,
	/// Worker threads used in tree mode.
	pub workers: usize,
	/// Dump bodies shorter than this many chars are rejected.
	pub min_body_length: usize,
}

impl BuilderConfig {
	/// Default settings for `language`.
	///
	/// # Notes
	/// - n-grams up to length 3, thorough stripping
	/// - checkpoint every 5000 accepted records, no checkpoint path
	/// - one worker per CPU, bodies of at least 2 chars
	pub fn new(language: &str) -> Self {
		Self {
			language: language.to_owned(),
			max_ngram_length: 3,
			strip_mode: StripMode::default(),
			checkpoint_interval: 5000,
			checkpoint_path: None,
			workers: num_cpus::get(),
			min_body_length: 2,
		}
	}

	fn validate(&self) -> Result<()> {
		if self.max_ngram_length == 0 {
			return Err(Error::InvalidConfig("max n-gram length must be at least 1".to_owned()));
		}
		if self.checkpoint_interval == 0 {
			return Err(Error::InvalidConfig("checkpoint interval must be at least 1".to_owned()));
		}
		if self.workers == 0 {
			return Err(Error::InvalidConfig("at least one worker is required".to_owned()));
		}
		Ok(())
	}
}

/// Counters describing a build run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
	pub accepted: usize,
	pub rejected_name: usize,
	pub rejected_namespace: usize,
	pub rejected_redirect: usize,
	pub rejected_short: usize,
	/// Dump records whose XML could not be parsed.
	pub malformed_records: usize,
	/// Tree files that could not be read.
	pub unreadable_files: usize,
	/// Unbalanced markup spans reported by the stripper.
	pub malformed_markup: usize,
	pub checkpoints: usize,
	pub cancelled: bool,
}

impl BuildStats {
	/// Records rejected for any reason.
	pub fn rejected(&self) -> usize {
		self.rejected_name + self.rejected_namespace + self.rejected_redirect + self.rejected_short
	}

	fn reject(&mut self, reason: RejectReason) {
		match reason {
			RejectReason::DisallowedName => self.rejected_name += 1,
			RejectReason::Namespaced => self.rejected_namespace += 1,
			RejectReason::Redirect => self.rejected_redirect += 1,
			RejectReason::TooShort => self.rejected_short += 1,
		}
	}

	fn absorb(&mut self, worker: &BuildStats) {
		self.accepted += worker.accepted;
		self.unreadable_files += worker.unreadable_files;
		self.malformed_markup += worker.malformed_markup;
		self.cancelled |= worker.cancelled;
	}
}

/// Result of a build run: the accumulated profile and its statistics.
#[derive(Clone, Debug)]
pub struct BuildOutcome {
	pub profile: Profile,
	pub stats: BuildStats,
}

/// Accumulates a language profile from a corpus.
///
/// # Responsibilities
/// - Read dump records or tree files and skip the ones that are not article prose
/// - Strip markup and count every n-gram of length `1..=max_ngram_length`
/// - Write cumulative checkpoints every `checkpoint_interval` accepted records
/// - Stop at a record boundary when the cancellation token fires
///
/// # Invariants
/// - Counts and the total text length of the profile change together, one
///   article (or one merged batch) at a time
/// - Every checkpoint is a complete snapshot of the records accepted so far
///
/// # Errors
/// - Dump mode aborts on an I/O error; tree mode skips unreadable files but
///   aborts when the corpus root cannot be listed
/// - A checkpoint that cannot be written aborts the run
pub struct ProfileBuilder {
	config: BuilderConfig,
	stripper: MarkupStripper,
	profile: Profile,
	stats: BuildStats,
	since_checkpoint: usize,
}

impl ProfileBuilder {
	/// # Errors
	/// - `Error::UnsupportedLanguage` if the language has no alphabet
	/// - `Error::InvalidConfig` for a zero length, interval or worker count
	pub fn new(config: BuilderConfig) -> Result<Self> {
		config.validate()?;
		let alphabet = Alphabet::for_language(&config.language)?;
		let profile = Profile::with_max_ngram_length(&config.language, config.max_ngram_length);

		Ok(Self {
			stripper: MarkupStripper::new(alphabet, config.strip_mode),
			profile,
			stats: BuildStats::default(),
			since_checkpoint: 0,
			config,
		})
	}

	pub fn config(&self) -> &BuilderConfig {
		&self.config
	}

	/// Profile accumulated so far.
	pub fn profile(&self) -> &Profile {
		&self.profile
	}

	/// Counters of the run so far.
	pub fn stats(&self) -> &BuildStats {
		&self.stats
	}

	/// Builds from `path` in the given format.
	pub fn build<P: AsRef<Path>>(
		self,
		format: CorpusFormat,
		path: P,
		cancel: &CancellationToken,
	) -> Result<BuildOutcome> {
		match format {
			CorpusFormat::Xml => self.build_from_dump_file(path, cancel),
			CorpusFormat::PlainText => self.build_from_tree(path, cancel),
		}
	}

	/// Opens an XML dump file and builds from it.
	pub fn build_from_dump_file<P: AsRef<Path>>(self, path: P, cancel: &CancellationToken) -> Result<BuildOutcome> {
		let path = path.as_ref();
		let file = File::open(path).map_err(|source| Error::CorpusIo { path: path.to_path_buf(), source })?;
		self.build_from_dump(BufReader::new(file), path, cancel)
	}

	/// Streams `<page>` records from `reader`.
	///
	/// `source` only names the corpus in logs and errors.
	pub fn build_from_dump<R: BufRead>(
		mut self,
		reader: R,
		source: &Path,
		cancel: &CancellationToken,
	) -> Result<BuildOutcome> {
		log::info!("building '{}' profile from dump {}", self.config.language, source.display());

		for block in DumpReader::new(reader) {
			if cancel.is_cancelled() {
				self.stats.cancelled = true;
				break;
			}

			let block = block.map_err(|e| Error::CorpusIo { path: source.to_path_buf(), source: e })?;
			let page = match Page::parse(&block) {
				Ok(page) => page,
				Err(e) => {
					log::warn!("skipping record: {e}");
					self.stats.malformed_records += 1;
					continue;
				}
			};

			if let Some(reason) = page.rejection(self.config.min_body_length) {
				log::trace!("rejected '{}': {reason:?}", page.title);
				self.stats.reject(reason);
				continue;
			}

			log::debug!("accepted '{}'", page.title);
			let stripped = self.stripper.strip(&page.text);
			self.add_stripped(&stripped);
			self.stats.accepted += 1;
			self.since_checkpoint += 1;
			if self.since_checkpoint >= self.config.checkpoint_interval {
				self.checkpoint()?;
			}
		}

		Ok(self.finish())
	}

	/// Reads every article of a shard tree.
	///
	/// Files are taken in batches of `checkpoint_interval`. Each batch is split
	/// across `workers` threads building partial profiles, which are merged
	/// here before the checkpoint is written.
	pub fn build_from_tree<P: AsRef<Path>>(mut self, root: P, cancel: &CancellationToken) -> Result<BuildOutcome> {
		let root = root.as_ref();
		log::info!("building '{}' profile from tree {}", self.config.language, root.display());

		let listing = tree::list_articles(root)?;
		self.stats.rejected_name += listing.rejected;

		for batch in listing.articles.chunks(self.config.checkpoint_interval) {
			if cancel.is_cancelled() {
				self.stats.cancelled = true;
				break;
			}

			self.process_batch(batch, cancel)?;
			if self.stats.cancelled {
				break;
			}
			self.checkpoint()?;
		}

		Ok(self.finish())
	}

	fn process_batch(&mut self, batch: &[PathBuf], cancel: &CancellationToken) -> Result<()> {
		let chunk_size = batch.len().div_ceil(self.config.workers).max(1);
		let stripper = &self.stripper;
		let language = self.config.language.as_str();
		let max = self.config.max_ngram_length;

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for chunk in batch.chunks(chunk_size) {
				let tx = tx.clone();
				scope.spawn(move || {
					let mut partial = Profile::with_max_ngram_length(language, max);
					let mut stats = BuildStats::default();
					for file in chunk {
						if cancel.is_cancelled() {
							stats.cancelled = true;
							break;
						}
						match io::read_text_lossy(file) {
							Ok(text) => {
								log::debug!("accepted {}", file.display());
								let stripped = Self::strip_article(stripper, &text);
								stats.malformed_markup += stripped.malformed.len();
								partial.add_text(&stripped.text, max, stripper.alphabet());
								stats.accepted += 1;
							}
							Err(e) => {
								log::warn!("skipping unreadable file {}: {e}", file.display());
								stats.unreadable_files += 1;
							}
						}
					}
					// The receiver outlives the scope.
					let _ = tx.send((partial, stats));
				});
			}
		});
		drop(tx);

		for (partial, stats) in rx.iter() {
			self.profile.merge(&partial)?;
			self.stats.absorb(&stats);
		}
		Ok(())
	}

	fn strip_article(stripper: &MarkupStripper, text: &str) -> Stripped {
		match stripper.mode() {
			StripMode::Thorough => stripper.strip_plain_text(text),
			StripMode::Fast => stripper.strip(text),
		}
	}

	fn add_stripped(&mut self, stripped: &Stripped) {
		if !stripped.malformed.is_empty() {
			log::trace!("{} unbalanced markup spans", stripped.malformed.len());
			self.stats.malformed_markup += stripped.malformed.len();
		}
		self.profile.add_text(&stripped.text, self.config.max_ngram_length, self.stripper.alphabet());
	}

	/// Writes the current profile to the checkpoint path, if one is configured.
	pub fn checkpoint(&mut self) -> Result<()> {
		self.since_checkpoint = 0;
		let Some(path) = &self.config.checkpoint_path else {
			return Ok(());
		};

		self.profile.save(path)?;
		self.stats.checkpoints += 1;
		log::info!(
			"checkpoint {} written to {} ({} articles, {} n-grams)",
			self.stats.checkpoints,
			path.display(),
			self.stats.accepted,
			self.profile.len()
		);
		Ok(())
	}

	fn finish(self) -> BuildOutcome {
		log::info!(
			"'{}' profile done: {} accepted, {} rejected, {} malformed records{}",
			self.config.language,
			self.stats.accepted,
			self.stats.rejected(),
			self.stats.malformed_records,
			if self.stats.cancelled { " (cancelled)" } else { "" }
		);
		BuildOutcome { profile: self.profile, stats: self.stats }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::io::Cursor;

	fn page(title: &str, text: &str) -> String {
		format!("  <page>\n    <title>{title}</title>\n    <revision>\n      <text>{text}</text>\n    </revision>\n  </page>\n")
	}

	fn dump(pages: &[String]) -> String {
		format!("<mediawiki>\n{}</mediawiki>\n", pages.concat())
	}

	fn build_dump(config: BuilderConfig, input: &str) -> BuildOutcome {
		ProfileBuilder::new(config)
			.unwrap()
			.build_from_dump(Cursor::new(input.to_owned()), Path::new("test.xml"), &CancellationToken::new())
			.unwrap()
	}

	#[test]
	fn rejects_bad_config() {
		assert!(matches!(ProfileBuilder::new(BuilderConfig::new("xx")), Err(Error::UnsupportedLanguage(_))));

		let mut config = BuilderConfig::new("en");
		config.max_ngram_length = 0;
		assert!(matches!(ProfileBuilder::new(config), Err(Error::InvalidConfig(_))));

		let mut config = BuilderConfig::new("en");
		config.checkpoint_interval = 0;
		assert!(matches!(ProfileBuilder::new(config), Err(Error::InvalidConfig(_))));
	}

	#[test]
	fn disallowed_pages_contribute_nothing() {
		let outcome = build_dump(
			BuilderConfig::new("en"),
			&dump(&[
				page("User:Example", "Hello world"),
				page("Paris", "#REDIRECT [[France]]"),
				page("Category:Cities", "Some text"),
				page("Empty", "a"),
			]),
		);
		assert!(outcome.profile.is_empty());
		assert_eq!(outcome.profile.total_text_length(), 0);
		assert_eq!(outcome.stats.accepted, 0);
		assert_eq!(outcome.stats.rejected_name, 1);
		assert_eq!(outcome.stats.rejected_redirect, 1);
		assert_eq!(outcome.stats.rejected_namespace, 1);
		assert_eq!(outcome.stats.rejected_short, 1);
	}

	#[test]
	fn accepted_pages_are_stripped_and_counted() {
		let outcome = build_dump(
			BuilderConfig::new("en"),
			&dump(&[page("Cat", "The cat {{infobox}} sat."), page("Broken", "<b>unclosed")]),
		);
		assert_eq!(outcome.stats.accepted, 1);
		assert_eq!(outcome.stats.malformed_records, 1);

		let profile = outcome.profile;
		assert_eq!(profile.language(), "en");
		assert_eq!(profile.declared_max_ngram_length(), Some(3));
		assert!(profile.count("cat") > 0);
		assert_eq!(profile.count("inf"), 0);
		assert!(profile.total_text_length() > 0);
	}

	#[test]
	fn checkpoints_are_cumulative() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("en.json");
		let mut config = BuilderConfig::new("en");
		config.checkpoint_interval = 2;
		config.checkpoint_path = Some(path.clone());

		let pages: Vec<String> = ["one", "two", "three"].iter().map(|t| page(t, "abc abc")).collect();
		let outcome = build_dump(config, &dump(&pages));

		assert_eq!(outcome.stats.accepted, 3);
		assert_eq!(outcome.stats.checkpoints, 1);
		let snapshot = Profile::load(&path).unwrap();
		assert_eq!(snapshot.count("abc"), 4);
		assert_eq!(outcome.profile.count("abc"), 6);
	}

	#[test]
	fn cancelled_dump_stops_before_the_next_record() {
		let cancel = CancellationToken::new();
		cancel.cancel();
		let outcome = ProfileBuilder::new(BuilderConfig::new("en"))
			.unwrap()
			.build_from_dump(Cursor::new(dump(&[page("A", "text")])), Path::new("test.xml"), &cancel)
			.unwrap();
		assert!(outcome.stats.cancelled);
		assert_eq!(outcome.stats.accepted, 0);
	}

	#[test]
	fn missing_dump_is_a_corpus_error() {
		let dir = tempfile::tempdir().unwrap();
		let result = ProfileBuilder::new(BuilderConfig::new("en"))
			.unwrap()
			.build_from_dump_file(dir.path().join("missing.xml"), &CancellationToken::new());
		assert!(matches!(result, Err(Error::CorpusIo { .. })));
	}

	fn write_tree(root: &Path, shards: usize, per_shard: usize) {
		for s in 0..shards {
			let shard = root.join(format!("shard{s}"));
			fs::create_dir_all(&shard).unwrap();
			for f in 0..per_shard {
				fs::write(shard.join(format!("Article {f}")), "мир [1] дом").unwrap();
			}
		}
		fs::write(root.join("shard0").join("Шаблон Карточка"), "шаблон").unwrap();
	}

	#[test]
	fn tree_mode_merges_worker_profiles() {
		let dir = tempfile::tempdir().unwrap();
		write_tree(dir.path(), 3, 4);
		let out = tempfile::tempdir().unwrap();
		let checkpoint = out.path().join("profiles").join("ru.json");

		let mut config = BuilderConfig::new("ru");
		config.checkpoint_interval = 5;
		config.workers = 3;
		config.checkpoint_path = Some(checkpoint.clone());

		let outcome = ProfileBuilder::new(config)
			.unwrap()
			.build(CorpusFormat::PlainText, dir.path(), &CancellationToken::new())
			.unwrap();

		assert_eq!(outcome.stats.accepted, 12);
		assert_eq!(outcome.stats.rejected_name, 1);
		assert_eq!(outcome.stats.checkpoints, 3);
		assert_eq!(outcome.profile.count("мир"), 12);
		assert_eq!(outcome.profile.count("шаб"), 0);

		// Same result as a single worker.
		let mut single = BuilderConfig::new("ru");
		single.workers = 1;
		let sequential = ProfileBuilder::new(single)
			.unwrap()
			.build_from_tree(dir.path(), &CancellationToken::new())
			.unwrap();
		assert_eq!(sequential.profile.ngram_counts(), outcome.profile.ngram_counts());
		assert_eq!(sequential.profile.total_text_length(), outcome.profile.total_text_length());
		assert_eq!(Profile::load(&checkpoint).unwrap().ngram_counts(), outcome.profile.ngram_counts());
	}

	#[test]
	fn unreadable_tree_root_aborts() {
		let dir = tempfile::tempdir().unwrap();
		let result = ProfileBuilder::new(BuilderConfig::new("ru"))
			.unwrap()
			.build_from_tree(dir.path().join("missing"), &CancellationToken::new());
		assert!(matches!(result, Err(Error::CorpusIo { .. })));
	}

	/// Serves one line per `read` call and cancels the token when line
	/// `cancel_at` (0-based) is requested.
	struct CancelAtLine {
		lines: Vec<Vec<u8>>,
		next: usize,
		offset: usize,
		cancel_at: usize,
		token: CancellationToken,
	}

	impl std::io::Read for CancelAtLine {
		fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
			let Some(line) = self.lines.get(self.next) else {
				return Ok(0);
			};
			if self.next == self.cancel_at && self.offset == 0 {
				self.token.cancel();
			}
			let n = buf.len().min(line.len() - self.offset);
			buf[..n].copy_from_slice(&line[self.offset..self.offset + n]);
			self.offset += n;
			if self.offset == line.len() {
				self.next += 1;
				self.offset = 0;
			}
			Ok(n)
		}
	}

	#[test]
	fn cancellation_mid_run_keeps_the_last_checkpoint() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("en.json");
		let mut config = BuilderConfig::new("en");
		config.checkpoint_interval = 2;
		config.checkpoint_path = Some(path.clone());

		let token = CancellationToken::new();
		let reader = CancelAtLine {
			lines: ["one", "two", "three", "four"]
				.iter()
				.map(|t| format!("<page><title>{t}</title><revision><text>abc abc</text></revision></page>\n").into_bytes())
				.collect(),
			next: 0,
			offset: 0,
			cancel_at: 2,
			token: token.clone(),
		};

		let outcome = ProfileBuilder::new(config)
			.unwrap()
			.build_from_dump(BufReader::new(reader), Path::new("test.xml"), &token)
			.unwrap();

		assert!(outcome.stats.cancelled);
		assert_eq!(outcome.stats.accepted, 2);
		assert_eq!(outcome.stats.checkpoints, 1);
		let snapshot = Profile::load(&path).unwrap();
		assert_eq!(snapshot, outcome.profile);
		assert_eq!(snapshot.count("abc"), 4);
	}

	#[test]
	fn invalid_bytes_only_affect_their_record() {
		let mut input = dump(&[page("One", "the cat")]).replace("</mediawiki>\n", "").into_bytes();
		input.extend_from_slice(b"  <page>\n    <title>Two</title>\n    <revision>\n      <text>bad \xFF cat</text>\n    </revision>\n  </page>\n");
		input.extend_from_slice(page("Three", "the cat").as_bytes());
		input.extend_from_slice(b"</mediawiki>\n");

		let outcome = ProfileBuilder::new(BuilderConfig::new("en"))
			.unwrap()
			.build_from_dump(Cursor::new(input), Path::new("test.xml"), &CancellationToken::new())
			.unwrap();

		assert_eq!(outcome.stats.accepted, 3);
		assert_eq!(outcome.profile.count("cat"), 3);
	}

	#[test]
	fn unreadable_tree_files_are_skipped_and_counted() {
		let dir = tempfile::tempdir().unwrap();
		let readable = dir.path().join("Article");
		fs::write(&readable, "мир дом").unwrap();
		// Listed, then gone by the time a worker reads it.
		let vanished = dir.path().join("Vanished");

		let mut config = BuilderConfig::new("ru");
		config.workers = 2;
		let mut builder = ProfileBuilder::new(config).unwrap();
		builder.process_batch(&[vanished, readable], &CancellationToken::new()).unwrap();

		assert_eq!(builder.stats().unreadable_files, 1);
		assert_eq!(builder.stats().accepted, 1);
		assert_eq!(builder.profile().count("мир"), 1);
		assert!(!builder.stats().cancelled);
	}
}
