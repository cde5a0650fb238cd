use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    InvalidRequest,
    Authentication,
    Authorization,
    RateLimited,
    Timeout,
    BackendTransient,
    ProtocolViolation,
    Internal,
}

impl GatewayErrorKind {
    /// Kind of a non-success HTTP status from a completion backend.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::Authorization,
            408 => Self::Timeout,
            429 => Self::RateLimited,
            400..=499 => Self::InvalidRequest,
            _ => Self::BackendTransient,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::BackendTransient
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::BackendTransient => "backend_transient",
            Self::ProtocolViolation => "protocol_violation",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed completion call. `retryable` follows the kind.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}{}", origin(.backend_id.as_deref(), .http_status.as_ref()))]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
    pub retryable: bool,
    pub backend_id: Option<String>,
    pub http_status: Option<u16>,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
            backend_id: None,
            http_status: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidRequest, message)
    }

    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::ProtocolViolation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Internal, message)
    }

    /// Error for a backend that answered with a non-success status. The body
    /// is kept short; providers echo whole prompts back on 400s.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("backend returned status {status}")
        } else {
            let excerpt = body.chars().take(240).collect::<String>();
            format!("backend returned status {status}: {excerpt}")
        };
        Self {
            http_status: Some(status),
            ..Self::new(GatewayErrorKind::from_http_status(status), message)
        }
    }

    pub fn with_backend_id(mut self, backend_id: impl Into<String>) -> Self {
        self.backend_id = Some(backend_id.into());
        self
    }
}

fn origin(backend_id: Option<&str>, http_status: Option<&u16>) -> String {
    match (backend_id, http_status) {
        (Some(backend_id), Some(status)) => format!(" (backend={backend_id}, status={status})"),
        (Some(backend_id), None) => format!(" (backend={backend_id})"),
        (None, Some(status)) => format!(" (status={status})"),
        (None, None) => String::new(),
    }
}
