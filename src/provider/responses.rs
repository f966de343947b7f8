use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{join_url, WireFormat};
use crate::request::CompletionPayload;

/// OpenAI `responses` API.
#[derive(Debug, Default, Clone, Copy)]
pub struct Responses;

#[derive(Serialize)]
struct ResponsesRequest<'a> {
	model: &'a str,
	input: Vec<InputMessage<'a>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	text: Option<TextOptions>,
	#[serde(skip_serializing_if = "Option::is_none")]
	temperature: Option<f32>,
}

#[derive(Serialize)]
struct InputMessage<'a> {
	role: &'static str,
	content: &'a str,
}

#[derive(Serialize)]
struct TextOptions {
	format: TextFormat,
}

#[derive(Serialize)]
struct TextFormat {
	#[serde(rename = "type")]
	kind: &'static str,
}

#[derive(Deserialize)]
struct ResponsesResponse {
	output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
	#[serde(default)]
	content: Vec<OutputContent>,
}

#[derive(Deserialize)]
struct OutputContent {
	#[serde(default)]
	text: Option<String>,
}

impl WireFormat for Responses {
	fn name(&self) -> &'static str {
		"responses"
	}

	fn default_model(&self) -> &'static str {
		"gpt-4o-mini"
	}

	fn default_base_url(&self) -> &'static str {
		"https://api.openai.com"
	}

	fn endpoint(&self, base_url: &str, _model: &str) -> String {
		join_url(base_url, "v1/responses")
	}

	fn authorize(
		&self,
		request: reqwest::RequestBuilder,
		api_key: &str,
	) -> reqwest::RequestBuilder {
		request.bearer_auth(api_key)
	}

	fn encode(&self, payload: &CompletionPayload) -> serde_json::Result<Value> {
		serde_json::to_value(ResponsesRequest {
			model: &payload.model,
			input: payload
				.messages
				.iter()
				.map(|msg| InputMessage { role: msg.role.as_str(), content: &msg.content })
				.collect(),
			text: payload
				.generation_config
				.json_mode
				.then_some(TextOptions { format: TextFormat { kind: "json_object" } }),
			temperature: payload.generation_config.temperature,
		})
	}

	fn extract_text(&self, raw: &Value) -> Option<String> {
		// Reasoning items come before the message and carry no text.
		ResponsesResponse::deserialize(raw)
			.ok()?
			.output
			.into_iter()
			.flat_map(|item| item.content)
			.find_map(|content| content.text)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::request::{GenerationOptions, Task};

	#[test]
	fn encodes_input_and_text_format() {
		let payload = Task::PartOfSpeech { sentence: "Run!".to_string() }
			.payload(&GenerationOptions::new("gpt-4o-mini").with_temperature(1.0));

		let body = Responses.encode(&payload).unwrap();

		assert_eq!(body["model"], "gpt-4o-mini");
		assert_eq!(body["input"].as_array().unwrap().len(), 2);
		assert_eq!(body["input"][0]["role"], "system");
		assert_eq!(body["text"]["format"]["type"], "json_object");
		assert_eq!(body["temperature"], 1.0);
	}

	#[test]
	fn skips_items_without_text() {
		let raw = json!({
			"output": [
				{ "type": "reasoning", "summary": [] },
				{ "type": "message", "content": [{ "type": "output_text", "text": "done" }] }
			]
		});
		assert_eq!(Responses.extract_text(&raw).as_deref(), Some("done"));
	}
}
