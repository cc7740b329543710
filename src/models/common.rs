use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Pipeline stage an upstream failure happened in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Moderation,
    Generation,
    FetchRemoteImage,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Moderation => "moderation",
            Stage::Generation => "generation",
            Stage::FetchRemoteImage => "fetch-remote-image",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderError {
    pub http_status: u16,
    pub provider_message: Value,
    pub stage: Stage,
}

impl ProviderError {
    pub fn new(http_status: u16, provider_message: Value, stage: Stage) -> Self {
        Self {
            http_status,
            provider_message,
            stage,
        }
    }

    pub fn to_details(&self) -> Value {
        json!({
            "status": self.http_status,
            "stage": self.stage,
            "message": self.provider_message,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Framework-neutral response produced by the proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub allow: Option<&'static str>,
    pub body: Value,
}

impl ProxyResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            allow: None,
            body,
        }
    }
}
