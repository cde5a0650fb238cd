use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::sleep;

use mathsage::ai_gateway::{
    adapters::BackendAdapter,
    credentials::CredentialProvider,
    error::{GatewayError, GatewayErrorKind},
    gateway::AIGateway,
    types::{
        AdapterContext, AdapterResponse, BackendDialect, BackendProfile, CanonicalRequest,
        ChatMessage, ChatRequest, ChatRole, CompletionLimits, CredentialRef, ResolvedCredential,
        TokenUsage,
    },
};

use crate::support::{fast_reliability, gateway_config};

#[derive(Default)]
struct StaticCredentialProvider;

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn resolve(
        &self,
        _reference: &CredentialRef,
        _backend: &BackendProfile,
    ) -> Result<ResolvedCredential, GatewayError> {
        Ok(ResolvedCredential::Anonymous)
    }
}

struct FailingCredentialProvider;

#[async_trait]
impl CredentialProvider for FailingCredentialProvider {
    async fn resolve(
        &self,
        _reference: &CredentialRef,
        backend: &BackendProfile,
    ) -> Result<ResolvedCredential, GatewayError> {
        Err(
            GatewayError::new(GatewayErrorKind::Authentication, "no api key")
                .with_backend_id(&backend.id),
        )
    }
}

/// Fails the first `failures` calls with `kind`, then answers with "ok".
struct FlakyAdapter {
    calls: Arc<AtomicUsize>,
    failures: usize,
    kind: GatewayErrorKind,
    seen: Arc<std::sync::Mutex<Vec<(AdapterContext, CanonicalRequest)>>>,
}

impl FlakyAdapter {
    fn new(failures: usize, kind: GatewayErrorKind) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failures,
            kind,
            seen: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl BackendAdapter for FlakyAdapter {
    fn dialect(&self) -> BackendDialect {
        BackendDialect::OpenAiCompatible
    }

    async fn complete(
        &self,
        ctx: AdapterContext,
        req: CanonicalRequest,
    ) -> Result<AdapterResponse, GatewayError> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .expect("seen lock should not be poisoned")
            .push((ctx.clone(), req));
        if previous < self.failures {
            return Err(GatewayError::new(self.kind, "scripted failure")
                .with_backend_id(ctx.backend_id));
        }

        Ok(AdapterResponse {
            output_text: "ok".to_string(),
            usage: TokenUsage {
                prompt_tokens: Some(3),
                completion_tokens: Some(1),
            },
            truncated: false,
        })
    }
}

struct SlowAdapter {
    delay: Duration,
}

#[async_trait]
impl BackendAdapter for SlowAdapter {
    fn dialect(&self) -> BackendDialect {
        BackendDialect::OpenAiCompatible
    }

    async fn complete(
        &self,
        _ctx: AdapterContext,
        _req: CanonicalRequest,
    ) -> Result<AdapterResponse, GatewayError> {
        sleep(self.delay).await;
        Ok(AdapterResponse {
            output_text: "too late".to_string(),
            usage: TokenUsage::default(),
            truncated: false,
        })
    }
}

fn gateway_with(
    adapter: Arc<dyn BackendAdapter>,
    max_retries: u32,
    timeout_ms: u64,
) -> AIGateway {
    let mut adapters: HashMap<BackendDialect, Arc<dyn BackendAdapter>> = HashMap::new();
    adapters.insert(BackendDialect::OpenAiCompatible, adapter);
    AIGateway::new(
        gateway_config(fast_reliability(max_retries, timeout_ms)),
        Arc::new(StaticCredentialProvider),
    )
    .expect("gateway config should be valid")
    .with_adapters(adapters)
}

fn chat_request(route: Option<&str>) -> ChatRequest {
    ChatRequest {
        request_id: Some("req-gateway".to_string()),
        route: route.map(str::to_string),
        stage: Some("draft".to_string()),
        messages: vec![
            ChatMessage::new(ChatRole::System, "You are a tutor."),
            ChatMessage::new(ChatRole::User, "What is 2 + 2?"),
        ],
        temperature: Some(0.7),
        limits: CompletionLimits {
            max_output_tokens: Some(64),
            max_request_time_ms: None,
        },
    }
}

#[tokio::test]
async fn given_transient_failure_when_chat_once_then_single_retry_succeeds() {
    let adapter = Arc::new(FlakyAdapter::new(1, GatewayErrorKind::BackendTransient));
    let calls = Arc::clone(&adapter.calls);
    let gateway = gateway_with(adapter, 1, 1_000);

    let response = gateway
        .chat_once(chat_request(None))
        .await
        .expect("second attempt should succeed");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(response.attempts, 2);
    assert_eq!(response.output_text, "ok");
    assert_eq!(response.backend_id, "primary");
    assert_eq!(response.model, "m1");
    assert_eq!(response.request_id, "req-gateway");
    assert_eq!(response.usage.total(), Some(4));
}

#[tokio::test]
async fn given_persistent_transient_failure_when_retries_exhausted_then_error_is_returned() {
    let adapter = Arc::new(FlakyAdapter::new(usize::MAX, GatewayErrorKind::BackendTransient));
    let calls = Arc::clone(&adapter.calls);
    let gateway = gateway_with(adapter, 1, 1_000);

    let err = gateway
        .chat_once(chat_request(None))
        .await
        .expect_err("retries should be exhausted");

    assert_eq!(err.kind, GatewayErrorKind::BackendTransient);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn given_authentication_failure_when_chat_once_then_no_retry_is_attempted() {
    let adapter = Arc::new(FlakyAdapter::new(usize::MAX, GatewayErrorKind::Authentication));
    let calls = Arc::clone(&adapter.calls);
    let gateway = gateway_with(adapter, 3, 1_000);

    let err = gateway
        .chat_once(chat_request(None))
        .await
        .expect_err("authentication failure is final");

    assert_eq!(err.kind, GatewayErrorKind::Authentication);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn given_slow_backend_when_attempt_exceeds_timeout_then_timeout_error_is_returned() {
    let adapter = Arc::new(SlowAdapter {
        delay: Duration::from_secs(5),
    });
    let gateway = gateway_with(adapter, 0, 50);

    let err = gateway
        .chat_once(chat_request(None))
        .await
        .expect_err("slow backend should time out");

    assert_eq!(err.kind, GatewayErrorKind::Timeout);
    assert_eq!(err.backend_id.as_deref(), Some("primary"));
}

#[tokio::test]
async fn given_request_time_override_when_chat_once_then_override_bounds_the_attempt() {
    let adapter = Arc::new(SlowAdapter {
        delay: Duration::from_secs(5),
    });
    let gateway = gateway_with(adapter, 0, 60_000);
    let mut request = chat_request(None);
    request.limits.max_request_time_ms = Some(50);

    let err = tokio::time::timeout(Duration::from_secs(2), gateway.chat_once(request))
        .await
        .expect("override should bound the call")
        .expect_err("slow backend should time out");

    assert_eq!(err.kind, GatewayErrorKind::Timeout);
}

#[tokio::test]
async fn given_request_when_chat_once_then_adapter_receives_model_and_limits() {
    let adapter = Arc::new(FlakyAdapter::new(0, GatewayErrorKind::Internal));
    let seen = Arc::clone(&adapter.seen);
    let gateway = gateway_with(adapter, 0, 1_000);

    gateway
        .chat_once(chat_request(Some("primary/m1")))
        .await
        .expect("call should succeed");

    let seen = seen.lock().expect("seen lock should not be poisoned");
    let (ctx, req) = &seen[0];
    assert_eq!(ctx.model, "m1");
    assert_eq!(ctx.timeout, Duration::from_millis(1_000));
    assert_eq!(req.messages.len(), 2);
    assert_eq!(req.limits.max_output_tokens, Some(64));
    assert_eq!(req.temperature, Some(0.7));
    assert_eq!(req.stage, "draft");
    assert_eq!(ctx.endpoint.as_deref(), Some("https://example.com/v1"));
    assert_eq!(ctx.request_id, "req-gateway");
}

#[tokio::test]
async fn given_unknown_route_when_chat_once_then_invalid_request_without_adapter_call() {
    let adapter = Arc::new(FlakyAdapter::new(0, GatewayErrorKind::Internal));
    let calls = Arc::clone(&adapter.calls);
    let gateway = gateway_with(adapter, 1, 1_000);

    let err = gateway
        .chat_once(chat_request(Some("missing-alias")))
        .await
        .expect_err("unknown alias should fail");

    assert_eq!(err.kind, GatewayErrorKind::InvalidRequest);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn given_unregistered_dialect_when_chat_once_then_invalid_request_is_returned() {
    let adapter = Arc::new(FlakyAdapter::new(0, GatewayErrorKind::Internal));
    let gateway = gateway_with(adapter, 1, 1_000);

    let err = gateway
        .chat_once(chat_request(Some("offline")))
        .await
        .expect_err("ollama adapter is not registered in this gateway");

    assert_eq!(err.kind, GatewayErrorKind::InvalidRequest);
    assert!(err.message.contains("not registered"), "{err}");
}

#[tokio::test]
async fn given_empty_messages_when_chat_once_then_request_is_rejected() {
    let adapter = Arc::new(FlakyAdapter::new(0, GatewayErrorKind::Internal));
    let gateway = gateway_with(adapter, 1, 1_000);
    let mut request = chat_request(None);
    request.messages.clear();

    let err = gateway
        .chat_once(request)
        .await
        .expect_err("empty messages are invalid");
    assert_eq!(err.kind, GatewayErrorKind::InvalidRequest);
}

#[tokio::test]
async fn given_credential_failure_when_chat_once_then_error_propagates() {
    let adapter: Arc<dyn BackendAdapter> =
        Arc::new(FlakyAdapter::new(0, GatewayErrorKind::Internal));
    let mut adapters = HashMap::new();
    adapters.insert(BackendDialect::OpenAiCompatible, adapter);
    let gateway = AIGateway::new(
        gateway_config(fast_reliability(1, 1_000)),
        Arc::new(FailingCredentialProvider),
    )
    .expect("gateway config should be valid")
    .with_adapters(adapters);

    let err = gateway
        .chat_once(chat_request(None))
        .await
        .expect_err("credential failure should surface");
    assert_eq!(err.kind, GatewayErrorKind::Authentication);
}
