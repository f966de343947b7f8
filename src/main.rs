use std::{error::Error, process::ExitCode};

use clap::{Parser, Subcommand};
use q_analyzer::{
	render::{render_notification, render_result, render_skeleton},
	resolve_api_key, AnalysisRequest, AnalysisState, Analyzer, ClientConfig, HttpCompletionClient,
	KeyStore, ProviderKind, Route,
};
use tracing::{info, warn, Level};
use tracing_subscriber::fmt;

#[derive(Parser, Debug)]
#[command(version, about = "Analyze English sentences and fill-in-the-gaps questions")]
struct Args {
	/// LLM provider wire format.
	#[arg(long, value_enum, default_value_t = ProviderKind::Gemini)]
	provider: ProviderKind,
	/// Model to use instead of the provider's default.
	#[arg(long)]
	model: Option<String>,
	/// Provider API base URL.
	#[arg(long, conflicts_with = "proxy")]
	base_url: Option<String>,
	/// Send requests through the same-origin proxy at this URL instead of the provider.
	#[arg(long)]
	proxy: Option<String>,
	/// Sampling temperature.
	#[arg(long)]
	temperature: Option<f32>,
	/// Log level
	#[arg(long, default_value = "warn")]
	log_level: Level,
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Label every word of a sentence with its part of speech.
	Pos { sentence: String },
	/// Answer a fill-in-the-gaps question.
	Gaps {
		/// The question, with `_` or `-` marking the blank.
		question: String,
		/// Answer option, up to four.
		#[arg(short, long = "option")]
		options: Vec<String>,
		/// Also fetch the extensive explanation.
		#[arg(long)]
		extensive: bool,
	},
	/// Explain the grammar rule behind a sentence.
	Rule { sentence: String },
	/// Manage the stored API key for the selected provider.
	Key {
		#[command(subcommand)]
		action: KeyAction,
	},
}

#[derive(Subcommand, Debug)]
enum KeyAction {
	Set { key: String },
	Show,
	Clear,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
	let args = Args::parse();

	let subscriber = fmt::Subscriber::builder()
		.with_max_level(args.log_level)
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	info!(task = "tracing_setup", result = "success", "tracing successfully set up");

	dotenv::dotenv().ok();

	info!(task = "dotenv_setup", result = "success", "dotenv loaded successfully");

	let store = KeyStore::open_default()
		.map_err(|e| warn!("Key store unavailable: {}", e))
		.ok();

	if let Command::Key { action } = &args.command {
		let store = store.ok_or("no configuration directory for the key store")?;
		return manage_key(&store, args.provider, action)
	}

	let lookup = resolve_api_key(args.provider, store.as_ref(), |name| std::env::var(name).ok());
	info!(provider = args.provider.name(), source = lookup.source.as_str(), "API key resolved");

	let route = match (args.proxy, args.base_url) {
		(Some(base_url), _) => Route::Proxy { base_url },
		(None, Some(base_url)) => Route::Direct { base_url },
		(None, None) =>
			Route::Direct { base_url: args.provider.wire().default_base_url().to_string() },
	};

	let mut config = ClientConfig::new(args.provider)
		.with_route(route)
		.with_api_key(lookup.key)
		.with_temperature(args.temperature);
	if let Some(model) = args.model {
		config = config.with_model(model);
	}

	let generation = config.generation_options();
	let mut analyzer = Analyzer::new(HttpCompletionClient::new(config), generation);

	eprintln!("{}", render_skeleton());

	let outcome = match args.command {
		Command::Pos { sentence } =>
			analyzer.run_analysis(AnalysisRequest::part_of_speech(sentence)).await.map(|_| ()),
		Command::Gaps { question, options, extensive } => {
			let primary = analyzer
				.run_analysis(AnalysisRequest::fill_in_the_gaps(question, options))
				.await
				.map(|_| ());
			match primary {
				Ok(()) if extensive => analyzer.run_extensive_explanation().await.map(|_| ()),
				other => other,
			}
		},
		Command::Rule { sentence } => analyzer.run_rule_explanation(&sentence).await.map(|_| ()),
		Command::Key { .. } => Ok(()),
	};

	if let Some(result) = analyzer.result() {
		println!("{}", render_result(result));
	}

	match (outcome, analyzer.state()) {
		(Ok(()), _) => Ok(ExitCode::SUCCESS),
		(Err(_), AnalysisState::Failed(notification)) => {
			eprintln!("{}", render_notification(notification));
			Ok(ExitCode::FAILURE)
		},
		(Err(e), _) => {
			eprintln!("{}", e);
			Ok(ExitCode::FAILURE)
		},
	}
}

fn manage_key(
	store: &KeyStore,
	provider: ProviderKind,
	action: &KeyAction,
) -> Result<ExitCode, Box<dyn Error>> {
	match action {
		KeyAction::Set { key } => {
			store.save(provider, key)?;
			println!("Saved {} API key.", provider.name());
		},
		KeyAction::Show => match store.load(provider)? {
			Some(key) => println!("{}", mask(&key)),
			None => {
				eprintln!(
					"No {} API key stored. Use `key set` or set {}.",
					provider.name(),
					provider.api_key_env_var()
				);
				return Ok(ExitCode::FAILURE)
			},
		},
		KeyAction::Clear => {
			store.delete(provider)?;
			println!("Removed {} API key.", provider.name());
		},
	}

	Ok(ExitCode::SUCCESS)
}

/// Show only the last four characters of a key.
fn mask(key: &str) -> String {
	let hidden = key.chars().count().saturating_sub(4);
	key.chars().enumerate().map(|(i, c)| if i < hidden { '*' } else { c }).collect()
}
