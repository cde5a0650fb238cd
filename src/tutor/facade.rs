use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, field};
use uuid::Uuid;

use crate::{
    ai_gateway::{
        credentials::DefaultCredentialProvider, error::GatewayError, gateway::AIGateway,
    },
    config::{Config, TutorConfig},
    secrets::{SecretCache, build_secret_store},
    tutor::{
        adapters::ai_gateway::AIGatewayCompletion,
        assembler::assemble_prompt,
        classifier::StateClassifier,
        error::{CompletionStage, TutorError},
        finalizer::ReplyFinalizer,
        ports::CompletionPort,
        strategy::select_strategy,
        types::{Message, TutorReply},
    },
};

/// Runs the tutoring pipeline for one student turn.
pub struct Tutor {
    port: Arc<dyn CompletionPort>,
    classifier: StateClassifier,
    finalizer: ReplyFinalizer,
}

impl Tutor {
    pub fn new(port: Arc<dyn CompletionPort>, config: &TutorConfig) -> Self {
        Self {
            classifier: StateClassifier::new(Arc::clone(&port), config.classifier.clone()),
            finalizer: ReplyFinalizer::new(config.reply.clone()),
            port,
        }
    }

    /// Wires secrets, credentials and the AI gateway from a loaded config.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let credential_provider = match &config.secrets.store {
            Some(store_config) => DefaultCredentialProvider::with_secret_store(
                build_secret_store(store_config),
                Arc::new(SecretCache::new(Duration::from_millis(
                    config.secrets.cache_ttl_ms,
                ))),
            ),
            None => DefaultCredentialProvider::new(),
        };
        let gateway = AIGateway::new(config.ai_gateway.clone(), Arc::new(credential_provider))?;
        let port = AIGatewayCompletion::new(
            Arc::new(gateway),
            config.tutor.route.clone(),
            config.tutor.request_timeout_ms,
        );
        Ok(Self::new(Arc::new(port), &config.tutor))
    }

    pub async fn respond(
        &self,
        transcript: &[Message],
        problem_context: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<TutorReply, TutorError> {
        let invocation_id = Uuid::now_v7().to_string();
        let span = tracing::info_span!(
            target: "tutor",
            "tutor_respond",
            invocation_id = %invocation_id,
            messages = transcript.len(),
            state = field::Empty,
            strategy = field::Empty,
            path = field::Empty,
            completion_calls = field::Empty,
        );
        self.respond_inner(transcript, problem_context, cancel)
            .instrument(span)
            .await
    }

    async fn respond_inner(
        &self,
        transcript: &[Message],
        problem_context: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<TutorReply, TutorError> {
        if cancel.is_cancelled() {
            return Err(TutorError::cancelled(CompletionStage::Classification));
        }

        let state = self
            .classifier
            .classify(transcript, problem_context, cancel)
            .await;
        if cancel.is_cancelled() {
            return Err(TutorError::cancelled(CompletionStage::Classification));
        }

        let strategy = select_strategy(&state);
        let span = Span::current();
        span.record("state", state.state.as_str());
        span.record("strategy", strategy.name.as_str());
        tracing::info!(
            target: "tutor",
            state = %state.state,
            confidence = state.confidence,
            source = ?state.source,
            strategy = %strategy.name,
            hint_level = strategy.hint_level.as_str(),
            "strategy_selected"
        );

        let prompt = assemble_prompt(&state, &strategy, transcript, problem_context);
        let finalized = self
            .finalizer
            .finalize(self.port.as_ref(), &prompt, transcript, cancel)
            .await?;

        span.record("path", finalized.path.as_str());
        span.record("completion_calls", finalized.completion_calls);
        tracing::info!(
            target: "tutor",
            reply_chars = finalized.text.chars().count(),
            "tutor_reply_ready"
        );

        Ok(TutorReply {
            text: finalized.text,
            path: finalized.path,
            strategy: strategy.name,
            state,
            completion_calls: finalized.completion_calls,
        })
    }
}
