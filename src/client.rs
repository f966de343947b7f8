use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, instrument, trace};

use crate::{
	config::{ClientConfig, Route},
	provider::{join_url, ProviderKind},
	request::CompletionPayload,
	types::{AnalyzerError, AuthError, TransportError},
	Result,
};

/// Sends a single completion request and hands back the provider's raw envelope.
///
/// Implementations make exactly one attempt per call. Turning the envelope into text is the
/// job of [`crate::Normalizer`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
	/// Provider whose wire format this client speaks.
	fn provider(&self) -> ProviderKind;

	async fn send(&self, payload: &CompletionPayload) -> Result<Value>;
}

/// [`CompletionClient`] over HTTPS.
pub struct HttpCompletionClient {
	client: Client,
	config: ClientConfig,
}

impl HttpCompletionClient {
	pub fn new(config: ClientConfig) -> Self {
		Self { client: Client::new(), config }
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	fn url(&self, model: &str) -> String {
		let wire = self.config.provider.wire();
		match &self.config.route {
			Route::Direct { base_url } => wire.endpoint(base_url, model),
			Route::Proxy { base_url } => join_url(base_url, &format!("api/{}", wire.name())),
		}
	}
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
	fn provider(&self) -> ProviderKind {
		self.config.provider
	}

	#[instrument(skip(self, payload), fields(model = %payload.model))]
	async fn send(&self, payload: &CompletionPayload) -> Result<Value> {
		let wire = self.config.provider.wire();

		let mut request = self.client.post(self.url(&payload.model));

		if self.config.route.requires_api_key() {
			let api_key = self.config.api_key.as_deref().ok_or(AuthError::MissingApiKey {
				provider: wire.name(),
			})?;
			request = wire.authorize(request, api_key);
		}

		let body = wire.encode(payload).map_err(|e| {
			error!("Failed to encode {} request: {}", wire.name(), e);
			AnalyzerError::from(TransportError::Network(e.to_string()))
		})?;

		trace!("Sending completion request: {}", body);

		let response = request.json(&body).send().await.map_err(|e| {
			error!("Completion request failed: {}", e);
			TransportError::from(e)
		})?;

		let status = response.status();
		let text = response.text().await.map_err(TransportError::from)?;

		if !status.is_success() {
			error!("Completion endpoint returned HTTP {}: {}", status, text);

			if self.config.route.requires_api_key() && is_key_rejection(status, &text) {
				return Err(
					AuthError::InvalidApiKey { provider: wire.name(), status: status.as_u16() }.into()
				)
			}

			return Err(TransportError::Status { status: status.as_u16(), body: text }.into())
		}

		debug!("Completion endpoint returned HTTP {}", status);

		// A 2xx body that is not JSON is passed on as a string for the normalizer.
		Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
	}
}

/// Whether a failed direct call means the provider refused the API key.
///
/// OpenAI answers 401, Gemini answers 400 or 403 with an `API_KEY_INVALID` reason.
fn is_key_rejection(status: StatusCode, body: &str) -> bool {
	matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) ||
		(status == StatusCode::BAD_REQUEST && body.contains("API_KEY_INVALID"))
}
