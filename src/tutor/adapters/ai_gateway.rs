use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    ai_gateway::{
        error::GatewayError,
        gateway::AIGateway,
        types::{ChatMessage, ChatRequest, ChatRole, CompletionLimits},
    },
    tutor::{
        ports::{CompletionPort, CompletionRequest},
        types::{Message, Role},
    },
};

#[derive(Clone)]
pub struct AIGatewayCompletion {
    gateway: Arc<AIGateway>,
    route: Option<String>,
    request_timeout_ms: Option<u64>,
}

impl AIGatewayCompletion {
    pub fn new(
        gateway: Arc<AIGateway>,
        route: Option<String>,
        request_timeout_ms: Option<u64>,
    ) -> Self {
        Self {
            gateway,
            route,
            request_timeout_ms,
        }
    }
}

#[async_trait]
impl CompletionPort for AIGatewayCompletion {
    async fn complete(&self, req: CompletionRequest) -> Result<String, GatewayError> {
        let stage = req.stage.as_str();
        let request = ChatRequest {
            request_id: Some(format!("tutor-{}-{}", stage, Uuid::now_v7())),
            route: self.route.clone(),
            stage: Some(stage.to_string()),
            messages: req.messages.iter().map(to_chat_message).collect(),
            temperature: Some(req.temperature),
            limits: CompletionLimits {
                max_output_tokens: Some(req.max_output_tokens),
                max_request_time_ms: self.request_timeout_ms,
            },
        };

        let response = self.gateway.chat_once(request).await?;
        if response.truncated {
            tracing::warn!(
                target: "tutor",
                stage,
                request_id = %response.request_id,
                "completion_truncated"
            );
        }
        Ok(response.output_text)
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    let role = match message.role {
        Role::System => ChatRole::System,
        Role::User => ChatRole::User,
        Role::Assistant => ChatRole::Assistant,
    };
    ChatMessage::new(role, message.content.clone())
}
