use std::{
	collections::VecDeque,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Mutex,
	},
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::*;

/// [`CompletionClient`] that replays queued responses and counts calls.
///
/// Once the queue is empty every call fails with HTTP 500. A hanging client never answers.
pub struct StubClient {
	provider: ProviderKind,
	hang: bool,
	responses: Mutex<VecDeque<Result<Value>>>,
	calls: AtomicUsize,
	sent: Mutex<Vec<CompletionPayload>>,
}

impl StubClient {
	pub fn new(provider: ProviderKind) -> Self {
		Self {
			provider,
			hang: false,
			responses: Mutex::new(VecDeque::new()),
			calls: AtomicUsize::new(0),
			sent: Mutex::new(vec![]),
		}
	}

	pub fn hanging(provider: ProviderKind) -> Self {
		Self { hang: true, ..Self::new(provider) }
	}

	pub fn with_response(self, response: Result<Value>) -> Self {
		self.responses.lock().unwrap().push_back(response);
		self
	}

	/// Queue a successful Gemini envelope carrying `content` as its text.
	pub fn with_content(self, content: Value) -> Self {
		self.with_response(Ok(gemini_envelope(&content.to_string())))
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn last_sent(&self) -> Option<CompletionPayload> {
		self.sent.lock().unwrap().last().cloned()
	}
}

#[async_trait]
impl CompletionClient for StubClient {
	fn provider(&self) -> ProviderKind {
		self.provider
	}

	async fn send(&self, payload: &CompletionPayload) -> Result<Value> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.sent.lock().unwrap().push(payload.clone());

		if self.hang {
			std::future::pending::<()>().await;
		}

		self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
			Err(TransportError::Status { status: 500, body: "no stubbed response".to_string() }.into())
		})
	}
}

pub fn gemini_envelope(text: &str) -> Value {
	json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
}

pub fn analyzer(client: StubClient) -> Analyzer<StubClient> {
	Analyzer::new(client, GenerationOptions::new("test-model"))
}
