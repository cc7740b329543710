use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProxyError, Result};

pub const DEFAULT_DIMENSION: i64 = 512;

const WIDTH_FIELDS: [&str; 3] = ["width", "w", "size"];
const HEIGHT_FIELDS: [&str; 3] = ["height", "h", "size"];

/// Inbound body: already decoded by the host, or raw bytes off the wire.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Parsed(Value),
    Raw(Vec<u8>),
}

impl RequestBody {
    /// Lenient decode. Anything that is not a JSON object becomes `{}`.
    pub fn into_object(self) -> Map<String, Value> {
        let value = match self {
            RequestBody::Parsed(value) => value,
            RequestBody::Raw(bytes) => {
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    return Map::new();
                }
                match serde_json::from_slice::<Value>(&bytes) {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("Request body parse failed, treating as empty: {}", e);
                        return Map::new();
                    }
                }
            }
        };

        match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                log::warn!(
                    "Request body is not a JSON object ({}), treating as empty",
                    json_kind(&other)
                );
                Map::new()
            }
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Parsed(value)
    }
}

impl From<&str> for RequestBody {
    fn from(raw: &str) -> Self {
        RequestBody::Raw(raw.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(raw: Vec<u8>) -> Self {
        RequestBody::Raw(raw)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationExtras {
    pub quality: Option<String>,
    pub style: Option<String>,
    pub model: Option<String>,
}

/// A validated request, before the provider's size policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub width: i64,
    pub height: i64,
    pub extras: GenerationExtras,
}

impl GenerationRequest {
    pub fn from_body(body: &Map<String, Value>) -> Result<Self> {
        let prompt = body.get("prompt").map(stringify).unwrap_or_default();
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(ProxyError::InvalidInput(
                "Missing `prompt` in request body.".into(),
            ));
        }

        let width = first_truthy(body, &WIDTH_FIELDS)
            .and_then(coerce_dimension)
            .filter(|w| *w != 0)
            .unwrap_or(DEFAULT_DIMENSION);
        // A present but unusable height follows width; an absent one takes the default.
        let height = match first_truthy(body, &HEIGHT_FIELDS) {
            Some(value) => coerce_dimension(value)
                .filter(|h| *h != 0)
                .unwrap_or(width),
            None => DEFAULT_DIMENSION,
        };

        Ok(Self {
            prompt,
            width,
            height,
            extras: GenerationExtras {
                quality: optional_text(body, "quality"),
                style: optional_text(body, "style"),
                model: optional_text(body, "model"),
            },
        })
    }
}

/// Request with dimensions already fitted to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInput {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub extras: GenerationExtras,
}

impl ProviderInput {
    pub fn size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

fn first_truthy<'a>(body: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| body.get(*field))
        .find(|value| is_truthy(value))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Integer-prefix coercion: `512`, `512.9`, `"1024x1024"` and `" 256px"` all parse.
pub fn coerce_dimension(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits.parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn optional_text(body: &Map<String, Value>, field: &str) -> Option<String> {
    body.get(field)
        .map(stringify)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
