use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use url::form_urlencoded::byte_serialize;

use crate::{
    config::DEFAULT_AVATAR_BASE,
    error::{ProxyError, Result},
    models::{ProviderError, Stage},
    transport::HttpTransport,
};

pub const DEFAULT_STYLE: &str = "identicon";
pub const DEFAULT_SEED: &str = "anon";
pub const DEFAULT_SIZE: u32 = 512;

static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script[^>]*>.*?</script\s*>").expect("script pattern is valid")
});

/// Query accepted by the avatar passthrough. Empty fields fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AvatarRequest {
    pub style: Option<String>,
    pub seed: Option<String>,
    pub size: Option<u32>,
    /// `"solid"` enables `color` as a background.
    pub bg: Option<String>,
    pub color: Option<String>,
}

impl AvatarRequest {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: Some(seed.into()),
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_solid_background(mut self, color: impl Into<String>) -> Self {
        self.bg = Some("solid".to_string());
        self.color = Some(color.into());
        self
    }

    pub fn style(&self) -> &str {
        non_blank(self.style.as_deref()).unwrap_or(DEFAULT_STYLE)
    }

    pub fn seed(&self) -> &str {
        non_blank(self.seed.as_deref()).unwrap_or(DEFAULT_SEED)
    }

    pub fn size(&self) -> u32 {
        self.size.filter(|s| *s > 0).unwrap_or(DEFAULT_SIZE)
    }

    fn background(&self) -> Option<String> {
        if self.bg.as_deref() != Some("solid") {
            return None;
        }
        non_blank(self.color.as_deref()).map(|c| c.trim_start_matches('#').to_string())
    }

    pub fn build_url(&self, base: &str) -> String {
        let seed: String = byte_serialize(self.seed().as_bytes()).collect();
        let style: String = byte_serialize(self.style().as_bytes()).collect();
        let mut url = format!(
            "{}/{}/svg?seed={}&size={}",
            base.trim_end_matches('/'),
            style,
            seed,
            self.size()
        );
        if let Some(color) = self.background() {
            let color: String = byte_serialize(color.as_bytes()).collect();
            url.push_str(&format!("&backgroundType=solid&backgroundColor={}", color));
        }
        url
    }

    pub fn embed_tag(&self, base: &str) -> String {
        let alt = non_blank(self.seed.as_deref()).unwrap_or("icon");
        format!(
            r#"<img src="{}" alt="{}" width="{}" height="{}" />"#,
            self.build_url(base),
            escape_attr(alt),
            self.size(),
            self.size()
        )
    }
}

pub fn sanitize_svg(svg: &str) -> String {
    SCRIPT_TAG.replace_all(svg, "").into_owned()
}

#[derive(Clone)]
pub struct AvatarClient {
    transport: Arc<dyn HttpTransport>,
    base: String,
}

impl AvatarClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_base(transport, DEFAULT_AVATAR_BASE)
    }

    pub fn with_base(transport: Arc<dyn HttpTransport>, base: impl Into<String>) -> Self {
        Self {
            transport,
            base: base.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub async fn fetch_svg(&self, request: &AvatarRequest) -> Result<String> {
        let url = request.build_url(&self.base);
        log::debug!("Fetching avatar SVG: {}", url);

        let failed = |status: u16, reason: String| {
            log::warn!("Avatar fetch failed ({}): {}", status, reason);
            ProxyError::RemoteFetchError(ProviderError::new(
                status,
                json!({ "url": url, "reason": reason }),
                Stage::FetchRemoteImage,
            ))
        };

        let response = self
            .transport
            .get(&url)
            .await
            .map_err(|e| failed(0, e.to_string()))?;

        if !response.is_success() {
            return Err(failed(response.status, "Failed to fetch SVG".to_string()));
        }

        Ok(sanitize_svg(&response.text()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{Call, MockTransport};

    const BASE: &str = "https://api.dicebear.com/9.x";

    #[test]
    fn test_build_url_defaults() {
        let url = AvatarRequest::default().build_url(BASE);
        assert_eq!(
            url,
            "https://api.dicebear.com/9.x/identicon/svg?seed=anon&size=512"
        );
    }

    #[test]
    fn test_build_url_with_background() {
        let url = AvatarRequest::new("nova 7")
            .with_style("bottts")
            .with_size(128)
            .with_solid_background("#ff8800")
            .build_url(BASE);
        assert_eq!(
            url,
            "https://api.dicebear.com/9.x/bottts/svg?seed=nova+7&size=128&backgroundType=solid&backgroundColor=ff8800"
        );
    }

    #[test]
    fn test_color_ignored_without_solid() {
        let mut request = AvatarRequest::new("sol");
        request.color = Some("#000000".into());
        assert!(!request.build_url(BASE).contains("background"));
    }

    #[test]
    fn test_embed_tag() {
        let tag = AvatarRequest::new("aero").with_size(64).embed_tag(BASE);
        assert_eq!(
            tag,
            r#"<img src="https://api.dicebear.com/9.x/identicon/svg?seed=aero&size=64" alt="aero" width="64" height="64" />"#
        );
        let tag = AvatarRequest::default().embed_tag(BASE);
        assert!(tag.contains(r#"alt="icon""#));
    }

    #[test]
    fn test_sanitize_svg_strips_scripts() {
        let svg = "<svg><SCRIPT type=\"x\">\nalert(1)\n</script ><rect/><script>b()</script></svg>";
        assert_eq!(sanitize_svg(svg), "<svg><rect/></svg>");
    }

    #[tokio::test]
    async fn test_fetch_svg_sanitizes() {
        let transport = Arc::new(MockTransport::new().push_bytes(
            200,
            "image/svg+xml",
            b"<svg><script>x()</script><circle/></svg>",
        ));
        let client = AvatarClient::new(transport.clone());

        let svg = client.fetch_svg(&AvatarRequest::new("pixel")).await.unwrap();
        assert_eq!(svg, "<svg><circle/></svg>");
        assert_eq!(
            transport.calls(),
            vec![Call::Get {
                url: "https://api.dicebear.com/9.x/identicon/svg?seed=pixel&size=512".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_fetch_svg_failure() {
        let transport = Arc::new(MockTransport::new().push_bytes(500, "text/plain", b"boom"));
        let client = AvatarClient::with_base(transport, "http://localhost:1");

        let err = client.fetch_svg(&AvatarRequest::default()).await.unwrap_err();
        assert_eq!(err.status_code(), 502);
    }
}
