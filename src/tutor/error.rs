use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ai_gateway::error::{GatewayError, GatewayErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TutorErrorKind {
    Auth,
    RateLimit,
    Network,
    Unknown,
    Cancelled,
}

/// Pipeline step that issued a completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStage {
    Classification,
    Draft,
    AccuracyRegeneration,
    ComplianceRegeneration,
}

impl CompletionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStage::Classification => "classification",
            CompletionStage::Draft => "draft",
            CompletionStage::AccuracyRegeneration => "accuracy_regeneration",
            CompletionStage::ComplianceRegeneration => "compliance_regeneration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorError {
    pub kind: TutorErrorKind,
    pub stage: CompletionStage,
    pub message: String,
}

impl TutorError {
    pub fn new(kind: TutorErrorKind, stage: CompletionStage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
        }
    }

    pub fn cancelled(stage: CompletionStage) -> Self {
        Self::new(
            TutorErrorKind::Cancelled,
            stage,
            "request cancelled by caller",
        )
    }

    pub fn from_gateway(stage: CompletionStage, err: &GatewayError) -> Self {
        Self::new(classify_generation_error(err), stage, err.to_string())
    }

    /// Message safe to show to the student or operator.
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            TutorErrorKind::Auth => {
                "Authentication with the completion service failed. Please check the configured credentials."
            }
            TutorErrorKind::RateLimit => "Too many requests. Please try again in a moment.",
            TutorErrorKind::Network => {
                "Could not reach the completion service. Please check the connection and try again."
            }
            TutorErrorKind::Unknown => "Failed to process the tutoring request.",
            TutorErrorKind::Cancelled => "The request was cancelled.",
        }
    }
}

impl fmt::Display for TutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage.as_str(), self.message)
    }
}

impl std::error::Error for TutorError {}

/// Maps a completion failure to the user-facing error category.
pub fn classify_generation_error(err: &GatewayError) -> TutorErrorKind {
    match err.kind {
        GatewayErrorKind::Authentication | GatewayErrorKind::Authorization => {
            return TutorErrorKind::Auth;
        }
        GatewayErrorKind::RateLimited => return TutorErrorKind::RateLimit,
        GatewayErrorKind::Timeout | GatewayErrorKind::BackendTransient => {
            return TutorErrorKind::Network;
        }
        _ => {}
    }

    classify_error_message(&err.message)
}

pub fn classify_error_message(message: &str) -> TutorErrorKind {
    let message = message.to_lowercase();
    let has_any = |needles: &[&str]| needles.iter().any(|needle| message.contains(needle));

    if has_any(&["api key", "authentication", "unauthorized"]) {
        TutorErrorKind::Auth
    } else if has_any(&["rate limit", "429"]) {
        TutorErrorKind::RateLimit
    } else if has_any(&["network", "fetch", "connect", "timed out", "timeout"]) {
        TutorErrorKind::Network
    } else {
        TutorErrorKind::Unknown
    }
}
