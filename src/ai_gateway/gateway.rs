use std::{collections::HashMap, sync::Arc, time::Instant};

use tokio::time::{sleep, timeout};
use tracing::{Instrument, Span, field};

use crate::ai_gateway::{
    adapters::{BackendAdapter, build_default_adapters},
    credentials::CredentialProvider,
    error::{GatewayError, GatewayErrorKind},
    reliability::ReliabilityLayer,
    request_normalizer::RequestNormalizer,
    router::{BackendRouter, SelectedBackend},
    types::{
        AIGatewayConfig, AdapterContext, BackendDialect, CanonicalRequest, ChatRequest,
        ChatResponse, ResolvedCredential,
    },
};

pub struct AIGateway {
    router: BackendRouter,
    credential_provider: Arc<dyn CredentialProvider>,
    adapters: HashMap<BackendDialect, Arc<dyn BackendAdapter>>,
    request_normalizer: RequestNormalizer,
    reliability: ReliabilityLayer,
}

impl AIGateway {
    pub fn new(
        config: AIGatewayConfig,
        credential_provider: Arc<dyn CredentialProvider>,
    ) -> Result<Self, GatewayError> {
        let router = BackendRouter::new(&config)?;
        Ok(Self {
            router,
            credential_provider,
            adapters: build_default_adapters(),
            request_normalizer: RequestNormalizer,
            reliability: ReliabilityLayer::new(config.reliability),
        })
    }

    pub fn with_adapters(
        mut self,
        adapters: HashMap<BackendDialect, Arc<dyn BackendAdapter>>,
    ) -> Self {
        self.adapters = adapters;
        self
    }

    /// Sends one non-streaming completion request with bounded retries.
    ///
    /// Everything after normalization runs inside a `gateway_request` span
    /// tagged with the request's stage; the span records the attempt count,
    /// token usage and outcome once the call settles.
    pub async fn chat_once(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        let canonical_request = self.request_normalizer.normalize(request)?;
        let span = tracing::info_span!(
            target: "ai_gateway",
            "gateway_request",
            request_id = %canonical_request.request_id,
            stage = %canonical_request.stage,
            backend_id = field::Empty,
            model = field::Empty,
            attempts = field::Empty,
            prompt_tokens = field::Empty,
            completion_tokens = field::Empty,
            truncated = field::Empty,
            outcome = field::Empty,
        );

        let started_at = Instant::now();
        let result = self
            .dispatch(canonical_request)
            .instrument(span.clone())
            .await;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        span.in_scope(|| match &result {
            Ok(response) => {
                span.record("attempts", response.attempts);
                span.record("truncated", response.truncated);
                if let Some(tokens) = response.usage.prompt_tokens {
                    span.record("prompt_tokens", tokens);
                }
                if let Some(tokens) = response.usage.completion_tokens {
                    span.record("completion_tokens", tokens);
                }
                span.record("outcome", "completed");
                tracing::info!(target: "ai_gateway", elapsed_ms, "request_completed");
            }
            Err(err) => {
                span.record("outcome", err.kind.as_str());
                tracing::warn!(
                    target: "ai_gateway",
                    elapsed_ms,
                    error = %err,
                    "request_failed"
                );
            }
        });
        result
    }

    async fn dispatch(&self, request: CanonicalRequest) -> Result<ChatResponse, GatewayError> {
        let selected = self.router.select(&request)?;
        let span = Span::current();
        span.record("backend_id", selected.backend_id.as_str());
        span.record("model", selected.resolved_model.as_str());

        let credential = self
            .credential_provider
            .resolve(&selected.profile.credential, &selected.profile)
            .await?;
        let adapter = self
            .adapters
            .get(&selected.profile.dialect)
            .cloned()
            .ok_or_else(|| {
                GatewayError::invalid_request(format!(
                    "adapter for dialect {} is not registered",
                    selected.profile.dialect.as_str()
                ))
                .with_backend_id(&selected.backend_id)
            })?;

        tracing::debug!(
            target: "ai_gateway",
            dialect = selected.profile.dialect.as_str(),
            messages = request.messages.len(),
            temperature = ?request.temperature,
            max_output_tokens = ?request.limits.max_output_tokens,
            requested_timeout_ms = ?request.limits.max_request_time_ms,
            "request_dispatched"
        );

        self.run_attempts(request, selected, adapter, credential).await
    }

    async fn run_attempts(
        &self,
        request: CanonicalRequest,
        selected: SelectedBackend,
        adapter: Arc<dyn BackendAdapter>,
        credential: ResolvedCredential,
    ) -> Result<ChatResponse, GatewayError> {
        let attempt_timeout = self
            .reliability
            .attempt_timeout(request.limits.max_request_time_ms);
        let ctx = AdapterContext {
            backend_id: selected.backend_id.clone(),
            model: selected.resolved_model.clone(),
            endpoint: selected.profile.endpoint.clone(),
            credential,
            timeout: attempt_timeout,
            request_id: request.request_id.clone(),
        };
        let mut attempt = 0_u32;

        loop {
            let outcome = match timeout(
                attempt_timeout,
                adapter.complete(ctx.clone(), request.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(GatewayError::new(
                    GatewayErrorKind::Timeout,
                    format!("request timed out after {} ms", attempt_timeout.as_millis()),
                )
                .with_backend_id(&selected.backend_id)),
            };

            match outcome {
                Ok(response) => {
                    return Ok(ChatResponse {
                        request_id: request.request_id,
                        backend_id: selected.backend_id,
                        model: selected.resolved_model,
                        output_text: response.output_text,
                        usage: response.usage,
                        truncated: response.truncated,
                        attempts: attempt + 1,
                    });
                }
                Err(err) if self.reliability.can_retry(&err, attempt) => {
                    tracing::warn!(
                        target: "ai_gateway",
                        attempt,
                        kind = err.kind.as_str(),
                        error = %err,
                        "attempt_failed"
                    );
                    attempt += 1;
                    sleep(self.reliability.backoff_delay(attempt)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
