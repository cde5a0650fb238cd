use async_trait::async_trait;

use crate::{
    ai_gateway::error::GatewayError,
    tutor::{error::CompletionStage, types::Message},
};

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub stage: CompletionStage,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_output_tokens: u64,
}

/// Text completion service used by the classifier and the finalizer.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, req: CompletionRequest) -> Result<String, GatewayError>;
}
