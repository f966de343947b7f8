use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{join_url, WireFormat};
use crate::request::CompletionPayload;

/// Google Gemini `generateContent`.
///
/// System messages become the `systemInstruction`, assistant turns use the `model` role and the
/// key travels as the `key` query parameter.
#[derive(Debug, Default, Clone, Copy)]
pub struct Gemini;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	system_instruction: Option<Content<'a>>,
	contents: Vec<Content<'a>>,
	generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	role: Option<&'static str>,
	parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
	text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	response_mime_type: Option<&'static str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
	candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
	content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
	#[serde(default)]
	parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
	#[serde(default)]
	text: Option<String>,
}

impl WireFormat for Gemini {
	fn name(&self) -> &'static str {
		"gemini"
	}

	fn default_model(&self) -> &'static str {
		"gemini-1.5-flash-latest"
	}

	fn default_base_url(&self) -> &'static str {
		"https://generativelanguage.googleapis.com"
	}

	fn endpoint(&self, base_url: &str, model: &str) -> String {
		join_url(base_url, &format!("v1beta/models/{}:generateContent", model))
	}

	fn authorize(
		&self,
		request: reqwest::RequestBuilder,
		api_key: &str,
	) -> reqwest::RequestBuilder {
		request.query(&[("key", api_key)])
	}

	fn encode(&self, payload: &CompletionPayload) -> serde_json::Result<Value> {
		let system = payload
			.messages
			.iter()
			.filter(|msg| msg.role.is_system())
			.map(|msg| Part { text: &msg.content })
			.collect::<Vec<_>>();

		let contents = payload
			.messages
			.iter()
			.filter(|msg| !msg.role.is_system())
			.map(|msg| Content {
				role: Some(match msg.role.as_str() {
					"assistant" => "model",
					_ => "user",
				}),
				parts: vec![Part { text: &msg.content }],
			})
			.collect();

		serde_json::to_value(GenerateContentRequest {
			system_instruction: (!system.is_empty()).then(|| Content { role: None, parts: system }),
			contents,
			generation_config: GeminiGenerationConfig {
				response_mime_type: payload
					.generation_config
					.json_mode
					.then_some("application/json"),
				temperature: payload.generation_config.temperature,
			},
		})
	}

	fn extract_text(&self, raw: &Value) -> Option<String> {
		let response = GenerateContentResponse::deserialize(raw).ok()?;
		let candidate = response.candidates.into_iter().next()?;
		Some(candidate.content.parts.into_iter().filter_map(|part| part.text).collect())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::request::{GenerationOptions, Task};

	#[test]
	fn encodes_system_instruction_and_json_mime_type() {
		let payload = Task::PartOfSpeech { sentence: "Run!".to_string() }
			.payload(&GenerationOptions::new("gemini-1.5-flash-latest").with_temperature(0.5));

		let body = Gemini.encode(&payload).unwrap();

		assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are an expert linguist.");
		assert!(body["systemInstruction"].get("role").is_none());
		assert_eq!(body["contents"].as_array().unwrap().len(), 1);
		assert_eq!(body["contents"][0]["role"], "user");
		assert_eq!(body["contents"][0]["parts"][0]["text"], payload.messages[1].content);
		assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
		assert_eq!(body["generationConfig"]["temperature"], 0.5);
		assert!(body.get("model").is_none());
	}

	#[test]
	fn endpoint_embeds_model() {
		assert_eq!(
			Gemini.endpoint("https://generativelanguage.googleapis.com/", "gemini-pro"),
			"https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
		);
	}

	#[test]
	fn extracts_and_concatenates_parts() {
		let raw = json!({
			"candidates": [{
				"content": { "role": "model", "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] },
				"finishReason": "STOP"
			}]
		});
		assert_eq!(Gemini.extract_text(&raw).as_deref(), Some("{\"a\":1}"));
	}

	#[test]
	fn foreign_envelope_is_not_recognised() {
		let raw = json!({ "choices": [{ "message": { "content": "hi" } }] });
		assert_eq!(Gemini.extract_text(&raw), None);
		assert_eq!(Gemini.extract_text(&json!({ "candidates": [] })), None);
	}
}
