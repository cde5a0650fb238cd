use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

/// Alias used when a request names no route.
pub const DEFAULT_ROUTE_ALIAS: &str = "default";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BackendDialect {
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    #[serde(rename = "ollama")]
    Ollama,
}

impl BackendDialect {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendDialect::OpenAiCompatible => "openai_compatible",
            BackendDialect::Ollama => "ollama",
        }
    }
}

/// Where a backend's API token comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env {
        var: String,
    },
    InlineToken {
        token: String,
    },
    Secret {
        name: String,
        #[serde(default)]
        env_fallback: Option<String>,
    },
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCredential {
    Anonymous,
    Bearer(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendProfile {
    pub id: String,
    pub dialect: BackendDialect,
    pub endpoint: Option<String>,
    pub credential: CredentialRef,
    pub models: Vec<String>,
}

impl BackendProfile {
    pub fn serves(&self, model: &str) -> bool {
        self.models.iter().any(|declared| declared == model)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelTarget {
    pub backend_id: String,
    pub model_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    1
}

fn default_backoff_base_ms() -> u64 {
    200
}

fn default_backoff_max_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIGatewayConfig {
    pub backends: Vec<BackendProfile>,
    #[serde(default)]
    pub route_aliases: BTreeMap<String, ModelTarget>,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Per-request caps; `None` leaves the backend or reliability default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionLimits {
    pub max_output_tokens: Option<u64>,
    pub max_request_time_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub request_id: Option<String>,
    pub route: Option<String>,
    /// Pipeline step label carried into the request span.
    pub stage: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub limits: CompletionLimits,
}

/// A validated request with its id assigned.
#[derive(Debug, Clone)]
pub struct CanonicalRequest {
    pub request_id: String,
    pub route_hint: Option<String>,
    pub stage: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub limits: CompletionLimits,
}

/// Everything an adapter needs to reach the selected backend.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub backend_id: String,
    pub model: String,
    pub endpoint: Option<String>,
    pub credential: ResolvedCredential,
    pub timeout: Duration,
    pub request_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn total(&self) -> Option<u64> {
        self.prompt_tokens
            .zip(self.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    }
}

#[derive(Debug, Clone)]
pub struct AdapterResponse {
    pub output_text: String,
    pub usage: TokenUsage,
    /// The backend stopped at the output token cap.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub request_id: String,
    pub backend_id: String,
    pub model: String,
    pub output_text: String,
    pub usage: TokenUsage,
    pub truncated: bool,
    pub attempts: u32,
}
