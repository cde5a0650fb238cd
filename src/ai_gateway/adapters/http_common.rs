use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};

use crate::ai_gateway::{
    error::{GatewayError, GatewayErrorKind},
    types::{AdapterContext, ChatMessage, ResolvedCredential},
};

pub fn build_client() -> Client {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub fn messages_to_wire(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| json!({ "role": message.role.as_str(), "content": message.content }))
        .collect()
}

/// Posts `body` to `{endpoint}{path}` and returns the decoded JSON reply.
///
/// Transport failures, non-success statuses and undecodable bodies all come
/// back as a `GatewayError` tagged with the backend id.
pub async fn post_json(
    client: &Client,
    ctx: &AdapterContext,
    dialect: &str,
    path: &str,
    body: &Value,
) -> Result<Value, GatewayError> {
    let url = format!("{}{}", require_endpoint(ctx, dialect)?, path);
    tracing::debug!(
        target: "ai_gateway",
        request_id = %ctx.request_id,
        dialect = dialect,
        url = %url,
        timeout_ms = ctx.timeout.as_millis() as u64,
        "backend_post"
    );

    let mut request = client
        .post(url)
        .timeout(ctx.timeout)
        .header("x-request-id", ctx.request_id.as_str())
        .json(body);
    if let ResolvedCredential::Bearer(token) = &ctx.credential {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|err| map_transport_error(&err, dialect).with_backend_id(&ctx.backend_id))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(GatewayError::from_http_status(status.as_u16(), &text)
            .with_backend_id(&ctx.backend_id));
    }

    response.json::<Value>().await.map_err(|err| {
        GatewayError::protocol_violation(format!("failed to decode {dialect} response: {err}"))
            .with_backend_id(&ctx.backend_id)
    })
}

fn require_endpoint(ctx: &AdapterContext, dialect: &str) -> Result<String, GatewayError> {
    ctx.endpoint
        .as_deref()
        .map(|endpoint| endpoint.trim_end_matches('/'))
        .filter(|endpoint| !endpoint.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            GatewayError::invalid_request(format!("{dialect} backend requires endpoint"))
                .with_backend_id(&ctx.backend_id)
        })
}

fn map_transport_error(err: &reqwest::Error, dialect: &str) -> GatewayError {
    let kind = if err.is_timeout() {
        GatewayErrorKind::Timeout
    } else {
        GatewayErrorKind::BackendTransient
    };
    GatewayError::new(kind, format!("{dialect} request failed: {err}"))
}

pub fn u64_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}
