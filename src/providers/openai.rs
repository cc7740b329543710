use serde_json::{json, Value};

use super::{ModerationEndpoint, ProviderAdapter, SizePolicy};
use crate::{config::ProviderConfig, models::ProviderInput};

const MODERATION_MODEL: &str = "omni-moderation-latest";

/// OpenAI Images API (`/images/generations`).
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    config: ProviderConfig,
}

impl OpenAiAdapter {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    // Free-form range; the API itself rejects sizes its model does not support.
    fn size_policy(&self) -> SizePolicy {
        SizePolicy::Clamp { min: 64, max: 2048 }
    }

    fn build_request(&self, input: &ProviderInput) -> Value {
        let model = input.extras.model.as_deref().unwrap_or(&self.config.model);
        // gpt-image models always answer with b64_json and reject response_format.
        let mut payload = json!({
            "model": model,
            "prompt": input.prompt,
            "size": input.size(),
        });

        if let Some(obj) = payload.as_object_mut() {
            if let Some(quality) = &input.extras.quality {
                obj.insert("quality".to_string(), json!(quality));
            }
            if model.starts_with("dall-e-3") {
                if let Some(style) = &input.extras.style {
                    obj.insert("style".to_string(), json!(style));
                }
            }
        }

        payload
    }

    fn moderation(&self) -> Option<ModerationEndpoint> {
        Some(ModerationEndpoint {
            url: format!("{}/moderations", self.config.api_base),
            model: MODERATION_MODEL.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationExtras;

    fn input(extras: GenerationExtras) -> ProviderInput {
        ProviderInput {
            prompt: "a red fox".into(),
            width: 1024,
            height: 768,
            extras,
        }
    }

    #[test]
    fn test_payload_shape() {
        let adapter = OpenAiAdapter::new(ProviderConfig::openai());
        let payload = adapter.build_request(&input(GenerationExtras::default()));
        assert_eq!(
            payload,
            json!({ "model": "gpt-image-1", "prompt": "a red fox", "size": "1024x768" })
        );
        assert!(payload.get("response_format").is_none());
    }

    #[test]
    fn test_extras_and_style_gate() {
        let adapter = OpenAiAdapter::new(ProviderConfig::openai());
        let payload = adapter.build_request(&input(GenerationExtras {
            quality: Some("high".into()),
            style: Some("vivid".into()),
            model: None,
        }));
        assert_eq!(payload["quality"], "high");
        assert!(payload.get("style").is_none());

        let payload = adapter.build_request(&input(GenerationExtras {
            quality: None,
            style: Some("vivid".into()),
            model: Some("dall-e-3".into()),
        }));
        assert_eq!(payload["model"], "dall-e-3");
        assert_eq!(payload["style"], "vivid");
    }

    #[test]
    fn test_endpoints_follow_api_base() {
        let adapter =
            OpenAiAdapter::new(ProviderConfig::openai().with_api_base("http://localhost:4010/v1"));
        assert_eq!(adapter.endpoint(), "http://localhost:4010/v1/images/generations");
        assert_eq!(
            adapter.moderation().unwrap().url,
            "http://localhost:4010/v1/moderations"
        );
        assert_eq!(adapter.size_policy(), SizePolicy::Clamp { min: 64, max: 2048 });
    }
}
