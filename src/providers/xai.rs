use serde_json::{json, Value};

use super::{ProviderAdapter, SizePolicy};
use crate::{config::ProviderConfig, models::ProviderInput};

pub const XAI_SIZES: &[u32] = &[256, 512, 1024];

/// xAI-style image endpoint. No moderation endpoint is offered.
#[derive(Debug, Clone)]
pub struct XaiAdapter {
    config: ProviderConfig,
}

impl XaiAdapter {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }
}

impl ProviderAdapter for XaiAdapter {
    fn name(&self) -> &'static str {
        "xAI"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    // Only square-ish presets are served; snap each side to the nearest one.
    fn size_policy(&self) -> SizePolicy {
        SizePolicy::Snap(XAI_SIZES)
    }

    fn build_request(&self, input: &ProviderInput) -> Value {
        if input.extras.quality.is_some() || input.extras.style.is_some() {
            log::debug!("xAI ignores quality/style extras");
        }

        json!({
            "model": input.extras.model.as_deref().unwrap_or(&self.config.model),
            "prompt": input.prompt,
            "n": 1,
            "size": input.size(),
            "response_format": "b64_json",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationRequest;

    #[test]
    fn test_payload_uses_snapped_size() {
        let adapter = XaiAdapter::new(ProviderConfig::xai());
        let input = adapter.size_policy().apply(GenerationRequest {
            prompt: "neon koi".into(),
            width: 300,
            height: 900,
            extras: Default::default(),
        });
        let payload = adapter.build_request(&input);
        assert_eq!(
            payload,
            json!({
                "model": "grok-2-image",
                "prompt": "neon koi",
                "n": 1,
                "size": "256x1024",
                "response_format": "b64_json",
            })
        );
    }

    #[test]
    fn test_no_moderation() {
        assert!(XaiAdapter::new(ProviderConfig::xai()).moderation().is_none());
    }
}
