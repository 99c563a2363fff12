use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use langid_core::{BuilderConfig, CancellationToken, CorpusFormat, ProfileBuilder, StripMode};

/// Builds a language n-gram profile from a wiki dump or an article tree.
#[derive(Parser, Debug)]
#[command(name = "langid-builder", version)]
struct Args {
	/// Language code of the corpus (en, de, fr, ru, uk, bg)
	#[arg(short, long)]
	language: String,

	/// Corpus layout
	#[arg(short, long, value_enum, default_value_t = Format::Xml)]
	format: Format,

	/// Dump file (xml) or shard directory (plain-text)
	#[arg(short = 'i', long = "in")]
	input: PathBuf,

	/// Profile to write; checkpoints overwrite it while the run progresses
	#[arg(short, long = "out")]
	output: PathBuf,

	/// Markup stripping depth
	#[arg(short, long, value_enum, default_value_t = Speed::Normal)]
	speed: Speed,

	/// Longest n-gram length counted
	#[arg(short = 'n', long, default_value_t = 3)]
	max_ngram_length: usize,

	/// Accepted articles between two checkpoints
	#[arg(long, default_value_t = 5000)]
	checkpoint_interval: usize,

	/// Worker threads for the plain-text format (defaults to the CPU count)
	#[arg(long)]
	workers: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
	Xml,
	PlainText,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Speed {
	Normal,
	Fast,
}

impl From<Format> for CorpusFormat {
	fn from(format: Format) -> Self {
		match format {
			Format::Xml => CorpusFormat::Xml,
			Format::PlainText => CorpusFormat::PlainText,
		}
	}
}

impl From<Speed> for StripMode {
	fn from(speed: Speed) -> Self {
		match speed {
			Speed::Normal => StripMode::Thorough,
			Speed::Fast => StripMode::Fast,
		}
	}
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
	let mut config = BuilderConfig::new(&args.language);
	config.max_ngram_length = args.max_ngram_length;
	config.strip_mode = args.speed.into();
	config.checkpoint_interval = args.checkpoint_interval;
	config.checkpoint_path = Some(args.output.clone());
	if let Some(workers) = args.workers {
		config.workers = workers;
	}

	let builder = ProfileBuilder::new(config)?;
	let outcome = builder.build(args.format.into(), &args.input, &CancellationToken::new())?;
	outcome.profile.save(&args.output)?;

	let stats = &outcome.stats;
	println!(
		"{}: {} articles accepted, {} rejected, {} malformed records, {} unreadable files, {} n-grams, {} chars",
		args.output.display(),
		stats.accepted,
		stats.rejected(),
		stats.malformed_records,
		stats.unreadable_files,
		outcome.profile.len(),
		outcome.profile.total_text_length()
	);
	Ok(())
}

fn main() -> ExitCode {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	match run(Args::parse()) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			log::error!("{e}");
			eprintln!("error: {e}");
			ExitCode::FAILURE
		}
	}
}
