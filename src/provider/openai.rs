use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{join_url, WireFormat};
use crate::request::CompletionPayload;

/// OpenAI compatible `chat/completions`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAi;

#[derive(Serialize)]
struct ChatRequest<'a> {
	model: &'a str,
	messages: Vec<ChatMessage<'a>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	response_format: Option<ResponseFormat>,
	#[serde(skip_serializing_if = "Option::is_none")]
	temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
	role: &'static str,
	content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
	#[serde(rename = "type")]
	kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
	choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
	message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
	#[serde(default)]
	content: Option<MessageContent>,
}

/// Some compatible servers return already parsed JSON as the message content.
#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
	Text(String),
	Structured(Value),
}

impl WireFormat for OpenAi {
	fn name(&self) -> &'static str {
		"openai"
	}

	fn default_model(&self) -> &'static str {
		"gpt-4o-mini"
	}

	fn default_base_url(&self) -> &'static str {
		"https://api.openai.com"
	}

	fn endpoint(&self, base_url: &str, _model: &str) -> String {
		join_url(base_url, "v1/chat/completions")
	}

	fn authorize(
		&self,
		request: reqwest::RequestBuilder,
		api_key: &str,
	) -> reqwest::RequestBuilder {
		request.bearer_auth(api_key)
	}

	fn encode(&self, payload: &CompletionPayload) -> serde_json::Result<Value> {
		serde_json::to_value(ChatRequest {
			model: &payload.model,
			messages: payload
				.messages
				.iter()
				.map(|msg| ChatMessage { role: msg.role.as_str(), content: &msg.content })
				.collect(),
			response_format: payload
				.generation_config
				.json_mode
				.then_some(ResponseFormat { kind: "json_object" }),
			temperature: payload.generation_config.temperature,
		})
	}

	fn extract_text(&self, raw: &Value) -> Option<String> {
		let response = ChatResponse::deserialize(raw).ok()?;
		match response.choices.into_iter().next()?.message.content? {
			MessageContent::Text(text) => Some(text),
			MessageContent::Structured(value) => Some(value.to_string()),
		}
	}
}
