use std::fmt::Display;

use async_openai::types::Role;
use serde::{Deserialize, Serialize};

pub const SYSTEM_ROLE: &str = "system";
pub const ASSISTANT_ROLE: &str = "assistant";
pub const USER_ROLE: &str = "user";
const TOOL_ROLE: &str = "tool";
const FUNCTION_ROLE: &str = "function";

/// Wrapped [`Role`] for custom implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WrapperRole {
	Role(Role),
}

impl WrapperRole {
	pub fn is_system(&self) -> bool {
		matches!(self, Self::Role(Role::System))
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Role(Role::System) => SYSTEM_ROLE,
			Self::Role(Role::Assistant) => ASSISTANT_ROLE,
			Self::Role(Role::User) => USER_ROLE,
			Self::Role(Role::Tool) => TOOL_ROLE,
			Self::Role(Role::Function) => FUNCTION_ROLE,
		}
	}
}

impl Default for WrapperRole {
	fn default() -> Self {
		Self::Role(Role::User)
	}
}

impl From<Role> for WrapperRole {
	fn from(role: Role) -> Self {
		Self::Role(role)
	}
}

impl From<WrapperRole> for Role {
	fn from(role: WrapperRole) -> Self {
		match role {
			WrapperRole::Role(role) => role,
		}
	}
}

impl From<WrapperRole> for String {
	fn from(role: WrapperRole) -> Self {
		role.as_str().to_string()
	}
}

/// Every way an analysis attempt can fail.
///
/// None of these are fatal: the [`crate::Analyzer`] records the failure and the user may try
/// again.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
	Validation(#[from] ValidationError),
	Auth(#[from] AuthError),
	Transport(#[from] TransportError),
	Parse(#[from] ParseError),
	/// An analysis is already in flight.
	Busy,
}

impl Display for AnalyzerError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Validation(e) => write!(f, "{}", e),
			Self::Auth(e) => write!(f, "{}", e),
			Self::Transport(e) => write!(f, "{}", e),
			Self::Parse(e) => write!(f, "{}", e),
			Self::Busy => write!(f, "An analysis is already in progress"),
		}
	}
}

/// Bad or missing user input. Raised before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	EmptyInput,
	MissingGapMarker,
	TooManyOptions(usize),
}

impl Display for ValidationError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::EmptyInput => write!(f, "Validation error: empty input"),
			Self::MissingGapMarker => write!(f, "Validation error: missing gap marker"),
			Self::TooManyOptions(count) =>
				write!(f, "Validation error: at most 4 options are allowed, got {}", count),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
	MissingApiKey { provider: &'static str },
	/// The provider rejected the configured key.
	InvalidApiKey { provider: &'static str, status: u16 },
}

impl Display for AuthError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::MissingApiKey { provider } =>
				write!(f, "Auth error: missing API key for {}", provider),
			Self::InvalidApiKey { provider, status } =>
				write!(f, "Auth error: {} rejected the API key (HTTP {})", provider, status),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
	/// The endpoint answered with a non-2xx status.
	Status { status: u16, body: String },
	/// The request never produced a response.
	Network(String),
}

impl Display for TransportError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Status { status, body } =>
				write!(f, "Transport error: HTTP {}: {}", status, body),
			Self::Network(e) => write!(f, "Transport error: network: {}", e),
		}
	}
}

impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::Network(e.to_string())
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
	/// The model output is not valid JSON.
	MalformedOutput { raw: String, source: serde_json::Error },
	/// The model output is JSON but not the shape that was asked for.
	UnexpectedShape { raw: String, source: serde_json::Error },
}

impl ParseError {
	/// The model text that failed to parse.
	pub fn raw(&self) -> &str {
		match self {
			Self::MalformedOutput { raw, .. } | Self::UnexpectedShape { raw, .. } => raw,
		}
	}
}

impl Display for ParseError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::MalformedOutput { source, .. } =>
				write!(f, "Parse error: malformed model output: {}", source),
			Self::UnexpectedShape { source, .. } =>
				write!(f, "Parse error: unexpected output shape: {}", source),
		}
	}
}
