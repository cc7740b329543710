use serde_json::Value;

use crate::models::ParsedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Inline,
    Url,
}

/// Where to look for an image in a provider payload: `container[0].field`,
/// or `container[0]` itself when `field` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStrategy {
    pub container: &'static str,
    pub field: Option<&'static str>,
    pub kind: ImageKind,
}

const fn strategy(
    container: &'static str,
    field: Option<&'static str>,
    kind: ImageKind,
) -> ExtractionStrategy {
    ExtractionStrategy {
        container,
        field,
        kind,
    }
}

/// Inline shapes first, then URLs.
pub const DEFAULT_STRATEGIES: &[ExtractionStrategy] = &[
    strategy("data", Some("b64_json"), ImageKind::Inline),
    strategy("data", Some("b64_data"), ImageKind::Inline),
    strategy("images", Some("b64_json"), ImageKind::Inline),
    strategy("images", Some("b64_data"), ImageKind::Inline),
    strategy("images", None, ImageKind::Inline),
    strategy("data", Some("url"), ImageKind::Url),
    strategy("images", Some("url"), ImageKind::Url),
    strategy("images", None, ImageKind::Url),
];

impl ExtractionStrategy {
    pub fn apply(&self, payload: &Value) -> Option<ParsedImage> {
        let item = payload.get(self.container)?.get(0)?;
        let text = match self.field {
            Some(field) => item.get(field)?.as_str()?,
            None => item.as_str()?,
        }
        .trim();

        if text.is_empty() {
            return None;
        }

        match self.kind {
            // A bare string only counts as inline when it is not a link.
            ImageKind::Inline if self.field.is_none() && is_http_url(text) => None,
            ImageKind::Inline => Some(ParsedImage::Inline(strip_data_url(text).to_string())),
            ImageKind::Url if self.field.is_none() && !is_http_url(text) => None,
            ImageKind::Url => Some(ParsedImage::Remote(text.to_string())),
        }
    }
}

pub fn extract_image(payload: &Value, strategies: &[ExtractionStrategy]) -> Option<ParsedImage> {
    strategies.iter().find_map(|s| s.apply(payload))
}

fn is_http_url(text: &str) -> bool {
    text.starts_with("https://") || text.starts_with("http://")
}

fn strip_data_url(text: &str) -> &str {
    if text.starts_with("data:") {
        if let Some((_, b64)) = text.split_once(";base64,") {
            return b64;
        }
    }
    text
}
