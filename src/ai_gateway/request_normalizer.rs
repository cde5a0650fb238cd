use uuid::Uuid;

use crate::ai_gateway::{
    error::GatewayError,
    types::{CanonicalRequest, ChatRequest},
};

/// Stage label for requests that do not name one.
pub const UNLABELLED_STAGE: &str = "unlabelled";

#[derive(Default)]
pub struct RequestNormalizer;

impl RequestNormalizer {
    pub fn normalize(&self, request: ChatRequest) -> Result<CanonicalRequest, GatewayError> {
        if request.messages.is_empty() {
            return Err(GatewayError::invalid_request("messages must not be empty"));
        }

        if let Some(temperature) = request.temperature
            && (!temperature.is_finite() || !(0.0..=2.0).contains(&temperature))
        {
            return Err(GatewayError::invalid_request(format!(
                "temperature must be within 0.0..=2.0, got {temperature}"
            )));
        }

        if request.limits.max_output_tokens == Some(0) {
            return Err(GatewayError::invalid_request(
                "limits.max_output_tokens must be positive",
            ));
        }

        let request_id = request
            .request_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        let stage = request
            .stage
            .filter(|stage| !stage.trim().is_empty())
            .unwrap_or_else(|| UNLABELLED_STAGE.to_string());

        Ok(CanonicalRequest {
            request_id,
            route_hint: request.route,
            stage,
            messages: request.messages,
            temperature: request.temperature,
            limits: request.limits,
        })
    }
}
