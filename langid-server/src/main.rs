use std::collections::BTreeMap;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use clap::Parser;
use serde::{Deserialize, Serialize};

use langid_core::{Error, LanguageShare, LoadOptions, ProfileSet, ScoreRequest, Scorer, ScorerConfig};

/// Serves language detection over a directory of profiles.
#[derive(Parser, Debug)]
#[command(name = "langid-server", version)]
struct Args {
	/// Directory holding `<code>.json` profiles
	#[arg(long, env = "LANGID_PROFILES", default_value = "./profiles")]
	profiles: PathBuf,

	/// Address to listen on
	#[arg(long, env = "LANGID_BIND", default_value = "127.0.0.1:5000")]
	bind: String,

	/// Default starting n-gram length of `/v1/detect`
	#[arg(long, default_value_t = 2)]
	start_length: usize,

	/// Keep a binary cache next to each profile
	#[arg(long)]
	binary_cache: bool,
}

/// Query parameters of `/v1/detect`.
#[derive(Deserialize)]
struct DetectParams {
	text: String,
	start: Option<usize>,
}

#[derive(Serialize)]
struct DetectResponse<'a> {
	scores: &'a BTreeMap<String, f64>,
	/// `None` when no language matched.
	distribution: Option<&'a [LanguageShare]>,
	best: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LanguagesResponse<'a> {
	languages: Vec<&'a str>,
	max_ngram_length: usize,
}

/// HTTP GET endpoint `/v1/detect`
///
/// Scores `text` against every loaded profile. A `start` outside the usable
/// n-gram range is a bad request.
#[get("/v1/detect")]
async fn detect(scorer: web::Data<Scorer>, query: web::Query<DetectParams>) -> impl Responder {
	let start = query.start.unwrap_or(scorer.config().start_length);

	let scores = match scorer.score(&ScoreRequest::new(&query.text, start)) {
		Ok(s) => s,
		Err(e @ Error::InvalidRange { .. }) => return HttpResponse::BadRequest().body(e.to_string()),
		Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
	};

	let distribution = scores.distribution(scorer.config().zero_threshold);
	HttpResponse::Ok().json(DetectResponse {
		scores: scores.as_map(),
		distribution: distribution.is_confident().then(|| distribution.shares()),
		best: distribution.best().map(|b| b.language.as_str()),
	})
}

#[get("/v1/languages")]
async fn languages(scorer: web::Data<Scorer>) -> impl Responder {
	let profiles = scorer.profiles();
	HttpResponse::Ok().json(LanguagesResponse {
		languages: profiles.languages().collect(),
		max_ngram_length: profiles.max_ngram_length(),
	})
}

/// Main entry point for the server.
///
/// Loads every profile once and shares the scorer read-only between workers.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let profiles = ProfileSet::load_dir(&args.profiles, LoadOptions { binary_cache: args.binary_cache })
		.map_err(|e| {
			log::error!("{e}");
			std::io::Error::other(e)
		})?;

	if args.start_length == 0 || args.start_length > profiles.max_ngram_length() {
		log::warn!(
			"default start length {} is outside 1..={}; requests must pass `start`",
			args.start_length,
			profiles.max_ngram_length()
		);
	}

	let config = ScorerConfig { start_length: args.start_length, ..ScorerConfig::default() };
	let scorer = web::Data::new(Scorer::new(profiles, config));
	log::info!("listening on {}", args.bind);

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::default().allow_any_origin().allowed_methods(vec!["GET"]))
			.app_data(scorer.clone())
			.service(detect)
			.service(languages)
	})
		.bind(&args.bind)?
		.run()
		.await
}
