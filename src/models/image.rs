use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    InlineBase64,
    FetchedUrl,
}

/// What a provider payload resolved to before any secondary fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedImage {
    Inline(String),
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub image_b64: String,
    pub source_format: SourceFormat,
}

impl GenerationResult {
    pub fn inline(image_b64: impl Into<String>) -> Self {
        Self {
            image_b64: image_b64.into(),
            source_format: SourceFormat::InlineBase64,
        }
    }

    pub fn fetched(bytes: &[u8]) -> Self {
        Self {
            image_b64: STANDARD.encode(bytes),
            source_format: SourceFormat::FetchedUrl,
        }
    }

    pub fn image_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.image_b64.as_bytes())
    }

    pub fn into_response(self, encoding: ImageEncoding) -> ImageResponse {
        let image = match encoding {
            ImageEncoding::Base64 => self.image_b64,
            ImageEncoding::DataUrl => format!("data:{};base64,{}", PNG_MIME, self.image_b64),
        };
        ImageResponse {
            image,
            mime: PNG_MIME.to_string(),
        }
    }
}

/// How the `image` field of a success response is rendered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ImageEncoding {
    #[default]
    Base64,
    DataUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageResponse {
    pub image: String,
    pub mime: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetched_bytes_are_base64_encoded() {
        let result = GenerationResult::fetched(b"\x89PNG");
        assert_eq!(result.image_b64, "iVBORw==");
        assert_eq!(result.source_format, SourceFormat::FetchedUrl);
        assert_eq!(result.image_bytes().unwrap(), b"\x89PNG".to_vec());
    }

    #[test]
    fn test_data_url_encoding() {
        let response = GenerationResult::inline("AAAA").into_response(ImageEncoding::DataUrl);
        assert_eq!(response.image, "data:image/png;base64,AAAA");
        assert_eq!(response.mime, "image/png");

        let plain = GenerationResult::inline("AAAA").into_response(ImageEncoding::Base64);
        assert_eq!(plain.image, "AAAA");
    }
}
