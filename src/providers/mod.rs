pub mod extract;
pub mod openai;
pub mod size;
pub mod xai;

use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::{
    config::ProviderConfig,
    error::{ProxyError, Result},
    models::{ParsedImage, ProviderInput},
};

pub use extract::{ExtractionStrategy, ImageKind, DEFAULT_STRATEGIES};
pub use openai::OpenAiAdapter;
pub use size::SizePolicy;
pub use xai::XaiAdapter;

/// Translates between the proxy's normalized request and one provider's wire format.
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn config(&self) -> &ProviderConfig;

    fn size_policy(&self) -> SizePolicy;

    fn build_request(&self, input: &ProviderInput) -> Value;

    fn endpoint(&self) -> String {
        format!("{}/images/generations", self.config().api_base)
    }

    fn extraction_strategies(&self) -> &'static [ExtractionStrategy] {
        DEFAULT_STRATEGIES
    }

    fn parse_response(&self, payload: &Value) -> Result<ParsedImage> {
        extract::extract_image(payload, self.extraction_strategies()).ok_or_else(|| {
            ProxyError::UpstreamShapeError {
                provider: self.name().to_string(),
                payload: payload.clone(),
            }
        })
    }

    /// Prompt classification endpoint, when the provider offers one.
    fn moderation(&self) -> Option<ModerationEndpoint> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationEndpoint {
    pub url: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub flagged: bool,
    pub categories: Vec<String>,
}

impl ModerationEndpoint {
    pub fn build_request(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "input": prompt,
        })
    }

    /// `None` when the payload has no `results` array to judge.
    pub fn parse_verdict(&self, payload: &Value) -> Option<ModerationVerdict> {
        let results = payload.get("results")?.as_array()?;
        let mut flagged = false;
        let mut categories = Vec::new();

        for result in results {
            if result.get("flagged").and_then(Value::as_bool) != Some(true) {
                continue;
            }
            flagged = true;
            if let Some(map) = result.get("categories").and_then(Value::as_object) {
                categories.extend(
                    map.iter()
                        .filter(|(_, hit)| hit.as_bool() == Some(true))
                        .map(|(name, _)| name.clone()),
                );
            }
        }

        categories.sort();
        categories.dedup();
        Some(ModerationVerdict {
            flagged,
            categories,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Xai,
}

impl ProviderKind {
    pub fn slug(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Xai => "xai",
        }
    }

    pub fn adapter(&self, config: ProviderConfig) -> Arc<dyn ProviderAdapter> {
        match self {
            ProviderKind::OpenAi => Arc::new(OpenAiAdapter::new(config)),
            ProviderKind::Xai => Arc::new(XaiAdapter::new(config)),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "xai" | "grok" => Ok(ProviderKind::Xai),
            other => Err(ProxyError::InvalidInput(format!(
                "Unknown provider: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> ModerationEndpoint {
        ModerationEndpoint {
            url: "https://api.openai.com/v1/moderations".into(),
            model: "omni-moderation-latest".into(),
        }
    }

    #[test]
    fn test_verdict_flagged_categories() {
        let payload = json!({
            "results": [{
                "flagged": true,
                "categories": { "violence": true, "hate": false, "harassment": true }
            }]
        });
        let verdict = endpoint().parse_verdict(&payload).unwrap();
        assert!(verdict.flagged);
        assert_eq!(verdict.categories, vec!["harassment", "violence"]);
    }

    #[test]
    fn test_verdict_clean_and_missing() {
        let clean = json!({ "results": [{ "flagged": false, "categories": {} }] });
        assert!(!endpoint().parse_verdict(&clean).unwrap().flagged);
        assert!(endpoint().parse_verdict(&json!({ "error": "x" })).is_none());
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("grok".parse::<ProviderKind>().unwrap(), ProviderKind::Xai);
        assert!("midjourney".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_default_parse_response_shape_error() {
        let adapter = ProviderKind::Xai.adapter(ProviderConfig::xai());
        let err = adapter.parse_response(&json!({ "data": [] })).unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamShapeError { .. }));
    }
}
