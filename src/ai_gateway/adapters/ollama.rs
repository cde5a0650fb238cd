use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};

use crate::ai_gateway::{
    adapters::{BackendAdapter, http_common},
    error::GatewayError,
    types::{AdapterContext, AdapterResponse, BackendDialect, CanonicalRequest, TokenUsage},
};

const DIALECT: &str = "ollama";

#[derive(Clone)]
pub struct OllamaAdapter {
    client: Client,
}

impl Default for OllamaAdapter {
    fn default() -> Self {
        Self {
            client: http_common::build_client(),
        }
    }
}

#[async_trait]
impl BackendAdapter for OllamaAdapter {
    fn dialect(&self) -> BackendDialect {
        BackendDialect::Ollama
    }

    async fn complete(
        &self,
        ctx: AdapterContext,
        req: CanonicalRequest,
    ) -> Result<AdapterResponse, GatewayError> {
        let mut options = Map::new();
        if let Some(temperature) = req.temperature {
            options.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = req.limits.max_output_tokens {
            options.insert("num_predict".to_string(), json!(max_tokens));
        }

        let mut body = json!({
            "model": ctx.model,
            "messages": http_common::messages_to_wire(&req.messages),
            "stream": false,
        });
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }

        let payload = http_common::post_json(&self.client, &ctx, DIALECT, "/api/chat", &body).await?;
        parse_ollama_payload(&payload).map_err(|err| err.with_backend_id(&ctx.backend_id))
    }
}

fn parse_ollama_payload(payload: &Value) -> Result<AdapterResponse, GatewayError> {
    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        return Err(GatewayError::protocol_violation(format!(
            "ollama returned error: {error}"
        )));
    }

    let output_text = payload
        .get("message")
        .ok_or_else(|| GatewayError::protocol_violation("ollama response has no message"))?
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(AdapterResponse {
        output_text,
        usage: TokenUsage {
            prompt_tokens: http_common::u64_field(payload, "prompt_eval_count"),
            completion_tokens: http_common::u64_field(payload, "eval_count"),
        },
        truncated: payload.get("done_reason").and_then(Value::as_str) == Some("length"),
    })
}
