use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::ai_gateway::{
    adapters::{BackendAdapter, http_common},
    error::GatewayError,
    types::{AdapterContext, AdapterResponse, BackendDialect, CanonicalRequest, TokenUsage},
};

const DIALECT: &str = "openai-compatible";

#[derive(Clone)]
pub struct OpenAiCompatibleAdapter {
    client: Client,
}

impl Default for OpenAiCompatibleAdapter {
    fn default() -> Self {
        Self {
            client: http_common::build_client(),
        }
    }
}

#[async_trait]
impl BackendAdapter for OpenAiCompatibleAdapter {
    fn dialect(&self) -> BackendDialect {
        BackendDialect::OpenAiCompatible
    }

    async fn complete(
        &self,
        ctx: AdapterContext,
        req: CanonicalRequest,
    ) -> Result<AdapterResponse, GatewayError> {
        let mut body = json!({
            "model": ctx.model,
            "messages": http_common::messages_to_wire(&req.messages),
            "stream": false,
        });
        if let Some(temperature) = req.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = req.limits.max_output_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let payload =
            http_common::post_json(&self.client, &ctx, DIALECT, "/chat/completions", &body)
                .await?;
        parse_completion(&payload).map_err(|err| err.with_backend_id(&ctx.backend_id))
    }
}

/// Reads `choices[0].message.content` plus token usage.
pub fn parse_completion(payload: &Value) -> Result<AdapterResponse, GatewayError> {
    let choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| GatewayError::protocol_violation("openai-compatible response has no choices"))?;

    let output_text = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let usage = payload
        .get("usage")
        .map(|usage| TokenUsage {
            prompt_tokens: http_common::u64_field(usage, "prompt_tokens"),
            completion_tokens: http_common::u64_field(usage, "completion_tokens"),
        })
        .unwrap_or_default();

    Ok(AdapterResponse {
        output_text,
        usage,
        truncated: choice.get("finish_reason").and_then(Value::as_str) == Some("length"),
    })
}
