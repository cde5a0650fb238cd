use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    ai_gateway::error::GatewayError,
    tutor::{
        error::CompletionStage,
        ports::{CompletionPort, CompletionRequest},
    },
};

pub type CompletionFuture = Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send>>;
pub type CompletionHook = Arc<dyn Fn(CompletionRequest) -> CompletionFuture + Send + Sync>;

pub fn boxed<T>(
    future: impl Future<Output = T> + Send + 'static,
) -> Pin<Box<dyn Future<Output = T> + Send>>
where
    T: Send + 'static,
{
    Box::pin(future)
}

/// Completion port that replays per-stage scripted replies and records calls.
///
/// A stage with no scripted reply left fails with an internal gateway error.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<HashMap<CompletionStage, VecDeque<Result<String, GatewayError>>>>,
    hook: Option<CompletionHook>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call is answered by `hook` instead of the script.
    pub fn with_hook(hook: CompletionHook) -> Self {
        Self {
            hook: Some(hook),
            ..Self::default()
        }
    }

    pub fn reply(self, stage: CompletionStage, text: impl Into<String>) -> Self {
        self.push(stage, Ok(text.into()))
    }

    pub fn fail(self, stage: CompletionStage, error: GatewayError) -> Self {
        self.push(stage, Err(error))
    }

    fn push(self, stage: CompletionStage, reply: Result<String, GatewayError>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.entry(stage).or_default().push_back(reply);
        }
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn calls_for(&self, stage: CompletionStage) -> Vec<CompletionRequest> {
        self.calls()
            .into_iter()
            .filter(|call| call.stage == stage)
            .collect()
    }
}

#[async_trait]
impl CompletionPort for ScriptedCompletion {
    async fn complete(&self, req: CompletionRequest) -> Result<String, GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(req.clone());
        }

        if let Some(hook) = &self.hook {
            return hook(req).await;
        }

        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.get_mut(&req.stage).and_then(VecDeque::pop_front));
        next.unwrap_or_else(|| {
            Err(GatewayError::internal(format!(
                "no scripted reply for stage {}",
                req.stage.as_str()
            )))
        })
    }
}
