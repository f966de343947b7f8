//! English question analyzer backed by a hosted LLM.
//!
//! Given a sentence, q-analyzer asks the model to tag every word with its part of speech. Given
//! a fill-in-the-gaps question, optionally with up to four answer options, it asks for the
//! correct answer and a brief explanation in Bangla. Once a question is answered, an extensive
//! explanation can be fetched and merged into the result, and the grammar rule behind any
//! sentence can be explained on its own.
//!
//! The [`Analyzer`] drives everything. It validates input, builds a [`Task`], sends the task's
//! [`CompletionPayload`] through a [`CompletionClient`] and hands the raw response to the
//! [`Normalizer`], which extracts the generated text from the provider's envelope and parses
//! it into a typed [`AnalysisResult`]. Along the way the analyzer moves through
//! [`AnalysisState`], which the presentation layer turns into a [`View`] and [`render`]s.
//!
//! Three wire formats are supported, selected with [`ProviderKind`]:
//!
//! - Gemini `generateContent` (default)
//! - OpenAI chat completions
//! - OpenAI responses
//!
//! Requests either go straight to the provider, authenticated with an API key, or through a
//! same-origin proxy that holds the key itself (see [`Route`]).
//!
//! The API key is looked up once by [`resolve_api_key`], first in the local [`KeyStore`] and
//! then in the environment:
//!
//! - `GEMINI_API_KEY`
//! - `OPENAI_API_KEY` (both OpenAI formats)
//!
//! # Example
//!
//! ```ignore
//! use q_analyzer::{
//!     resolve_api_key, Analyzer, AnalysisRequest, ClientConfig, HttpCompletionClient,
//!     KeyStore, ProviderKind,
//! };
//!
//! let provider = ProviderKind::Gemini;
//! let store = KeyStore::open_default().ok();
//! let lookup = resolve_api_key(provider, store.as_ref(), |name| std::env::var(name).ok());
//!
//! let config = ClientConfig::new(provider).with_api_key(lookup.key);
//! let generation = config.generation_options();
//! let mut analyzer = Analyzer::new(HttpCompletionClient::new(config), generation);
//!
//! let request = AnalysisRequest::fill_in_the_gaps("The cat sat _ the mat.", ["on", "in"]);
//! let result = analyzer.run_analysis(request).await?;
//! println!("{}", q_analyzer::render::render_result(result));
//! ```

pub mod analysis;
pub mod analyzer;
pub mod client;
pub mod config;
pub mod normalize;
pub mod provider;
pub mod render;
pub mod request;
pub mod types;

#[cfg(test)]
mod mock;

pub use analysis::{
	AnalysisResult, ExplanationOutput, GapsResult, PartOfSpeechResult, RuleExplanation,
	WordAnalysis,
};
pub use analyzer::{
	AnalysisForm, AnalysisState, Analyzer, Notification, NotificationKind, OptionSlot, View,
};
pub use bounded_integer::BoundedUsize;
pub use client::{CompletionClient, HttpCompletionClient};
pub use config::{resolve_api_key, ClientConfig, KeyLookup, KeySource, KeyStore, Route};
pub use normalize::{Expect, Normalized, Normalizer};
pub use provider::{ProviderKind, WireFormat};
pub use render::render;
pub use request::{AnalysisRequest, CompletionPayload, GenerationOptions, Mode, Task};
pub use types::{AnalyzerError, AuthError, ParseError, TransportError, ValidationError};

pub type Result<T> = std::result::Result<T, AnalyzerError>;
