//! Client configuration and local API key storage.
//!
//! The API key is resolved once, when the [`ClientConfig`] is built, and handed to the
//! completion client by value. Nothing reads the key from shared state afterwards.

use std::{
	fmt::Display,
	fs, io,
	path::{Path, PathBuf},
};

use tracing::{debug, trace};

use crate::{provider::ProviderKind, request::GenerationOptions};

const APP_DIR: &str = "q-analyzer";

/// Where an API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
	/// Local key storage.
	KeyStore,
	/// Environment variable.
	Environment,
	/// Nowhere, no key was found.
	None,
}

impl KeySource {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::KeyStore => "key store",
			Self::Environment => "environment",
			Self::None => "none",
		}
	}
}

/// Result of a key lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLookup {
	pub key: Option<String>,
	pub source: KeySource,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
	/// The platform has no configuration directory.
	NoConfigDir,
	Io(#[from] io::Error),
}

impl Display for KeyStoreError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::NoConfigDir => write!(f, "No configuration directory available"),
			Self::Io(e) => write!(f, "Key store I/O error: {}", e),
		}
	}
}

/// Keeps one API key string per provider under a well known name.
///
/// Each key lives in its own file, named after [`ProviderKind::api_key_name`], inside the
/// store directory.
#[derive(Debug, Clone)]
pub struct KeyStore {
	dir: PathBuf,
}

impl KeyStore {
	/// Store rooted in the user's configuration directory.
	pub fn open_default() -> Result<Self, KeyStoreError> {
		dirs::config_dir()
			.map(|dir| Self::at(dir.join(APP_DIR)))
			.ok_or(KeyStoreError::NoConfigDir)
	}

	pub fn at(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn path(&self, provider: ProviderKind) -> PathBuf {
		self.dir.join(provider.api_key_name())
	}

	/// Read the key, `None` when absent or blank.
	pub fn load(&self, provider: ProviderKind) -> Result<Option<String>, KeyStoreError> {
		match fs::read_to_string(self.path(provider)) {
			Ok(key) => Ok(Some(key.trim().to_string()).filter(|key| !key.is_empty())),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	pub fn save(&self, provider: ProviderKind, key: &str) -> Result<(), KeyStoreError> {
		fs::create_dir_all(&self.dir)?;
		fs::write(self.path(provider), key.trim())?;

		debug!("Saved {} API key to {:?}", provider.name(), self.dir);

		Ok(())
	}

	/// Remove the key. Removing an absent key is not an error.
	pub fn delete(&self, provider: ProviderKind) -> Result<(), KeyStoreError> {
		match fs::remove_file(self.path(provider)) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

/// Look up the API key for `provider`.
///
/// Checks in order:
/// 1. Local key storage
/// 2. The provider's environment variable, read through `env`
pub fn resolve_api_key(
	provider: ProviderKind,
	store: Option<&KeyStore>,
	env: impl Fn(&str) -> Option<String>,
) -> KeyLookup {
	if let Some(store) = store {
		match store.load(provider) {
			Ok(Some(key)) => return KeyLookup { key: Some(key), source: KeySource::KeyStore },
			Ok(None) => {},
			Err(e) => debug!("Ignoring unreadable key store: {}", e),
		}
	}

	if let Some(key) = env(provider.api_key_env_var()).filter(|key| !key.trim().is_empty()) {
		return KeyLookup { key: Some(key.trim().to_string()), source: KeySource::Environment }
	}

	trace!("No API key found for {}", provider.name());

	KeyLookup { key: None, source: KeySource::None }
}

/// Where completion requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
	/// Straight to the provider, authenticated with the configured key.
	Direct { base_url: String },
	/// Through a same-origin proxy at `{base_url}/api/{provider}` that holds the key itself.
	Proxy { base_url: String },
}

impl Route {
	pub fn requires_api_key(&self) -> bool {
		matches!(self, Self::Direct { .. })
	}
}

/// Everything the completion client needs, fixed for its lifetime.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
	pub provider: ProviderKind,
	pub model: String,
	pub route: Route,
	pub api_key: Option<String>,
	pub temperature: Option<f32>,
}

impl std::fmt::Debug for ClientConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClientConfig")
			.field("provider", &self.provider)
			.field("model", &self.model)
			.field("route", &self.route)
			.field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
			.field("temperature", &self.temperature)
			.finish()
	}
}

impl ClientConfig {
	/// Direct route to the provider's public API with its default model.
	pub fn new(provider: ProviderKind) -> Self {
		let wire = provider.wire();
		Self {
			provider,
			model: wire.default_model().to_string(),
			route: Route::Direct { base_url: wire.default_base_url().to_string() },
			api_key: None,
			temperature: None,
		}
	}

	pub fn with_model(mut self, model: impl Into<String>) -> Self {
		self.model = model.into();
		self
	}

	pub fn with_route(mut self, route: Route) -> Self {
		self.route = route;
		self
	}

	pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
		self.api_key = api_key;
		self
	}

	pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
		self.temperature = temperature;
		self
	}

	/// Model settings for the request builder.
	pub fn generation_options(&self) -> GenerationOptions {
		GenerationOptions { model: self.model.clone(), temperature: self.temperature }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn temp_store() -> KeyStore {
		KeyStore::at(std::env::temp_dir().join(format!("q-analyzer-test-{}", uuid::Uuid::new_v4())))
	}

	#[test]
	fn key_store_save_load_delete() {
		let store = temp_store();

		assert_eq!(store.load(ProviderKind::Gemini).unwrap(), None);

		store.save(ProviderKind::Gemini, "  secret-key\n").unwrap();
		assert_eq!(store.load(ProviderKind::Gemini).unwrap().as_deref(), Some("secret-key"));
		assert!(store.dir().join("gemini_api_key").exists());
		assert_eq!(store.load(ProviderKind::OpenAi).unwrap(), None);

		store.delete(ProviderKind::Gemini).unwrap();
		store.delete(ProviderKind::Gemini).unwrap();
		assert_eq!(store.load(ProviderKind::Gemini).unwrap(), None);

		fs::remove_dir_all(store.dir()).unwrap();
	}

	#[test]
	fn key_store_wins_over_environment() {
		let store = temp_store();
		store.save(ProviderKind::Gemini, "stored").unwrap();

		let lookup =
			resolve_api_key(ProviderKind::Gemini, Some(&store), |_| Some("from-env".to_string()));
		assert_eq!(lookup, KeyLookup { key: Some("stored".to_string()), source: KeySource::KeyStore });

		fs::remove_dir_all(store.dir()).unwrap();
	}

	#[test]
	fn environment_is_consulted_per_provider() {
		let env = |name: &str| (name == "OPENAI_API_KEY").then(|| "sk-test".to_string());

		let lookup = resolve_api_key(ProviderKind::Responses, None, env);
		assert_eq!(lookup.key.as_deref(), Some("sk-test"));
		assert_eq!(lookup.source, KeySource::Environment);

		let lookup = resolve_api_key(ProviderKind::Gemini, Some(&temp_store()), env);
		assert_eq!(lookup, KeyLookup { key: None, source: KeySource::None });
	}

	#[test]
	fn blank_environment_key_is_ignored() {
		let lookup = resolve_api_key(ProviderKind::Gemini, None, |_| Some("  ".to_string()));
		assert_eq!(lookup.source, KeySource::None);
	}

	#[test]
	fn debug_output_redacts_key() {
		let config = ClientConfig::new(ProviderKind::Gemini).with_api_key(Some("AIza-secret".into()));
		let debug = format!("{:?}", config);

		assert!(!debug.contains("AIza-secret"));
		assert!(debug.contains("gemini-1.5-flash-latest"));
		assert!(config.route.requires_api_key());
	}
}
