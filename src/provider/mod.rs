//! Provider wire formats.
//!
//! Each supported provider implements [`WireFormat`], which knows how to encode a
//! [`CompletionPayload`] into the provider's request body and how to pull the generated text
//! back out of the provider's response envelope. The provider in use is chosen by
//! configuration through [`ProviderKind`], never by probing a response.

use clap::{builder::PossibleValue, ValueEnum};
use serde_json::Value;

use crate::request::CompletionPayload;

pub mod gemini;
pub mod openai;
pub mod responses;

/// Encoding and decoding rules for one provider's HTTP API.
pub trait WireFormat: Send + Sync {
	/// Short provider name, also used as the proxy path segment.
	fn name(&self) -> &'static str;

	/// Model used when none is configured.
	fn default_model(&self) -> &'static str;

	/// Base URL of the provider's public API.
	fn default_base_url(&self) -> &'static str;

	/// Full URL of the completion endpoint when calling the provider directly.
	fn endpoint(&self, base_url: &str, model: &str) -> String;

	/// Attach the API key to a direct request.
	fn authorize(
		&self,
		request: reqwest::RequestBuilder,
		api_key: &str,
	) -> reqwest::RequestBuilder;

	/// Encode the payload into the provider's request body.
	fn encode(&self, payload: &CompletionPayload) -> serde_json::Result<Value>;

	/// Extract the generated text from a response envelope.
	///
	/// Returns `None` when the envelope does not have this provider's shape.
	fn extract_text(&self, raw: &Value) -> Option<String>;
}

/// The providers that can be configured.
#[derive(PartialEq, Eq, Clone, Debug, Copy, Default)]
pub enum ProviderKind {
	/// Google Gemini `generateContent`.
	#[default]
	Gemini,
	/// OpenAI compatible chat completions.
	OpenAi,
	/// OpenAI responses API.
	Responses,
}

/// Clap value enum implementation for argument parsing.
impl ValueEnum for ProviderKind {
	fn value_variants<'a>() -> &'a [Self] {
		&[Self::Gemini, Self::OpenAi, Self::Responses]
	}

	fn to_possible_value(&self) -> Option<PossibleValue> {
		Some(PossibleValue::new(self.name()))
	}
}

impl ProviderKind {
	pub fn wire(&self) -> &'static dyn WireFormat {
		match self {
			Self::Gemini => &gemini::Gemini,
			Self::OpenAi => &openai::OpenAi,
			Self::Responses => &responses::Responses,
		}
	}

	pub fn name(&self) -> &'static str {
		self.wire().name()
	}

	/// Environment variable consulted for this provider's API key.
	pub fn api_key_env_var(&self) -> &'static str {
		match self {
			Self::Gemini => "GEMINI_API_KEY",
			Self::OpenAi | Self::Responses => "OPENAI_API_KEY",
		}
	}

	/// Name under which the key is kept in local key storage.
	pub fn api_key_name(&self) -> &'static str {
		match self {
			Self::Gemini => "gemini_api_key",
			Self::OpenAi | Self::Responses => "openai_api_key",
		}
	}
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
	format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
