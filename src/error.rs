use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{ErrorBody, ProviderError};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Method not allowed. Use POST.")]
    MethodNotAllowed,

    #[error("{0}")]
    ConfigError(String),

    #[error("Prompt rejected by moderation")]
    PolicyRejected { categories: Vec<String> },

    #[error("{provider} API error")]
    UpstreamError {
        provider: String,
        upstream: ProviderError,
    },

    #[error("Unexpected response from {provider}")]
    UpstreamShapeError { provider: String, payload: Value },

    #[error("Failed to fetch image URL")]
    RemoteFetchError(ProviderError),

    #[error("Server error: {0}")]
    InternalError(String),
}

impl ProxyError {
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::InvalidInput(_) | ProxyError::PolicyRejected { .. } => 400,
            ProxyError::MethodNotAllowed => 405,
            ProxyError::ConfigError(_)
            | ProxyError::UpstreamShapeError { .. }
            | ProxyError::InternalError(_) => 500,
            ProxyError::UpstreamError { .. } | ProxyError::RemoteFetchError(_) => 502,
        }
    }

    /// Opaque diagnostic attached to the error envelope, if any.
    pub fn details(&self) -> Option<Value> {
        match self {
            ProxyError::PolicyRejected { categories } => Some(json!({ "categories": categories })),
            ProxyError::UpstreamError { upstream, .. } => Some(upstream.to_details()),
            ProxyError::UpstreamShapeError { payload, .. } => Some(payload.clone()),
            ProxyError::RemoteFetchError(upstream) => Some(upstream.to_details()),
            ProxyError::InternalError(msg) => Some(Value::String(msg.clone())),
            _ => None,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            details: self.details(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProxyError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(ProxyError::MethodNotAllowed.status_code(), 405);
        assert_eq!(ProxyError::ConfigError("x".into()).status_code(), 500);
        assert_eq!(
            ProxyError::PolicyRejected { categories: vec![] }.status_code(),
            400
        );
        let upstream = ProviderError::new(503, json!("busy"), Stage::Generation);
        assert_eq!(
            ProxyError::UpstreamError {
                provider: "OpenAI".into(),
                upstream: upstream.clone(),
            }
            .status_code(),
            502
        );
        assert_eq!(ProxyError::RemoteFetchError(upstream).status_code(), 502);
    }

    #[test]
    fn test_shape_error_body_carries_payload() {
        let err = ProxyError::UpstreamShapeError {
            provider: "xAI".into(),
            payload: json!({ "data": [] }),
        };
        let body = err.to_body();
        assert_eq!(body.error, "Unexpected response from xAI");
        assert_eq!(body.details, Some(json!({ "data": [] })));
    }

    #[test]
    fn test_invalid_input_has_no_details() {
        let body = ProxyError::InvalidInput("Missing `prompt` in request body.".into()).to_body();
        assert!(body.details.is_none());
    }
}
