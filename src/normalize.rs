//! Reshapes raw completion envelopes into model text or JSON.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, trace};

use crate::{provider::ProviderKind, types::ParseError};

/// How strictly the extracted text must parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
	/// Return the text as is.
	Text,
	/// The text must be JSON.
	Json,
	/// Parse as JSON when possible, fall back to the text.
	JsonOrText,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
	Json(Value),
	Text(String),
}

/// Extracts generated text from the configured provider's envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
	provider: ProviderKind,
}

impl Normalizer {
	pub fn new(provider: ProviderKind) -> Self {
		Self { provider }
	}

	pub fn provider(&self) -> ProviderKind {
		self.provider
	}

	/// Generated text inside `raw`.
	///
	/// Never fails: an envelope the provider does not recognise is stringified whole, and a
	/// bare JSON string is returned as is.
	pub fn extract_text(&self, raw: &Value) -> String {
		if let Some(text) = self.provider.wire().extract_text(raw) {
			return text
		}

		trace!("Unrecognised {} envelope, falling back to raw body", self.provider.name());

		match raw {
			Value::String(text) => text.clone(),
			other => other.to_string(),
		}
	}

	pub fn normalize(&self, raw: &Value, expect: Expect) -> Result<Normalized, ParseError> {
		match expect {
			Expect::Text => Ok(Normalized::Text(self.extract_text(raw))),
			Expect::Json => self.parse_json(raw).map(Normalized::Json),
			Expect::JsonOrText => {
				let text = self.extract_text(raw);
				Ok(serde_json::from_str(strip_code_fence(&text))
					.map(Normalized::Json)
					.unwrap_or(Normalized::Text(text)))
			},
		}
	}

	/// Extract, parse and deserialize the model output into `T`.
	pub fn parse<T: DeserializeOwned>(&self, raw: &Value) -> Result<T, ParseError> {
		let json = self.parse_json(raw)?;

		serde_json::from_value(json.clone()).map_err(|source| {
			error!("Model output has an unexpected shape: {}", json);
			ParseError::UnexpectedShape { raw: json.to_string(), source }
		})
	}

	fn parse_json(&self, raw: &Value) -> Result<Value, ParseError> {
		let text = self.extract_text(raw);

		serde_json::from_str(strip_code_fence(&text)).map_err(|source| {
			error!("Model output is not valid JSON: {}", text);
			ParseError::MalformedOutput { raw: text, source }
		})
	}
}

/// Strip one surrounding Markdown code fence, with or without a language tag.
fn strip_code_fence(text: &str) -> &str {
	let trimmed = text.trim();
	let Some(inner) = trimmed.strip_prefix("```").and_then(|rest| rest.strip_suffix("```")) else {
		return trimmed
	};

	// Drop the language tag, e.g. "json", on its own line or glued to the body.
	match inner.split_once('\n') {
		Some((tag, body)) if !tag.trim_start().starts_with(['{', '[']) => body.trim(),
		_ => {
			let untagged = inner.trim_start_matches(|c: char| c.is_ascii_alphabetic()).trim();
			if untagged.starts_with(['{', '[']) {
				untagged
			} else {
				inner.trim()
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::analysis::GapsResult;

	const CONTENT: &str = r#"{"question":"The cat sat _ the mat.","correctAnswer":"on","explanation":"..."}"#;

	fn envelopes(text: &str) -> [(ProviderKind, Value); 3] {
		[
			(ProviderKind::Gemini, json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })),
			(ProviderKind::OpenAi, json!({ "choices": [{ "message": { "content": text } }] })),
			(ProviderKind::Responses, json!({ "output": [{ "content": [{ "text": text }] }] })),
		]
	}

	#[test]
	fn extraction_is_shape_independent() {
		for text in [CONTENT, "plain words", "", "```json\n{}\n```"] {
			let extracted = envelopes(text)
				.iter()
				.map(|(provider, raw)| Normalizer::new(*provider).extract_text(raw))
				.collect::<Vec<_>>();

			assert!(extracted.iter().all(|t| t == text), "{:?}", extracted);
		}
	}

	#[test]
	fn unrecognised_envelope_is_stringified() {
		let normalizer = Normalizer::new(ProviderKind::Gemini);
		let raw = json!({ "error": { "message": "quota" } });

		assert_eq!(normalizer.extract_text(&raw), raw.to_string());
		assert_eq!(normalizer.extract_text(&json!("bare text")), "bare text");
	}

	#[test]
	fn json_expectation_fails_on_prose() {
		let normalizer = Normalizer::new(ProviderKind::OpenAi);
		let raw = json!({ "choices": [{ "message": { "content": "Sorry, I cannot help." } }] });

		let err = normalizer.normalize(&raw, Expect::Json).unwrap_err();
		assert!(matches!(err, ParseError::MalformedOutput { .. }));
		assert_eq!(err.raw(), "Sorry, I cannot help.");

		assert_eq!(
			normalizer.normalize(&raw, Expect::JsonOrText).unwrap(),
			Normalized::Text("Sorry, I cannot help.".to_string())
		);
	}

	#[test]
	fn code_fences_are_stripped() {
		assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
		assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
		assert_eq!(strip_code_fence("```{\"a\": 1}```"), "{\"a\": 1}");
		assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
	}

	#[test]
	fn single_line_fence_with_language_tag() {
		assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
		assert_eq!(strip_code_fence("```json [1] ```"), "[1]");
		assert_eq!(strip_code_fence("```plain words```"), "plain words");

		let normalizer = Normalizer::new(ProviderKind::OpenAi);
		let raw = json!({ "choices": [{ "message": { "content": "```json{\"a\":1}```" } }] });
		assert_eq!(normalizer.normalize(&raw, Expect::Json).unwrap(), Normalized::Json(json!({ "a": 1 })));
	}

	#[test]
	fn gaps_result_round_trips_through_parse() {
		let gaps = GapsResult {
			question: "She _ to school every day.".to_string(),
			correct_answer: "goes".to_string(),
			explanation: "Present simple, third person singular.".to_string(),
			extensive_explanation: Some("Line one\n---\nLine two".to_string()),
		};
		let encoded = serde_json::to_string(&gaps).unwrap();

		for (provider, raw) in envelopes(&encoded) {
			let parsed: GapsResult = Normalizer::new(provider).parse(&raw).unwrap();
			assert_eq!(parsed, gaps);
		}
	}

	#[test]
	fn wrong_shape_is_reported() {
		let normalizer = Normalizer::new(ProviderKind::Gemini);
		let raw = json!({ "candidates": [{ "content": { "parts": [{ "text": "{\"answer\":\"on\"}" }] } }] });

		let err = normalizer.parse::<GapsResult>(&raw).unwrap_err();
		assert!(matches!(err, ParseError::UnexpectedShape { .. }));
	}
}
