use std::env;

use crate::logger::LogLevel;
use crate::models::ImageEncoding;

pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-image-1";
pub const DEFAULT_XAI_BASE: &str = "https://api.x.ai/v1";
pub const DEFAULT_XAI_MODEL: &str = "grok-2-image";
pub const DEFAULT_AVATAR_BASE: &str = "https://api.dicebear.com/9.x";

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub encoding: ImageEncoding,
}

impl ProviderConfig {
    pub fn new(api_base: impl Into<String>, model: impl Into<String>) -> Self {
        ProviderConfig {
            api_key: None,
            api_base: api_base.into(),
            model: model.into(),
            encoding: ImageEncoding::Base64,
        }
    }

    pub fn openai() -> Self {
        Self::new(DEFAULT_OPENAI_BASE, DEFAULT_OPENAI_MODEL)
    }

    pub fn xai() -> Self {
        Self::new(DEFAULT_XAI_BASE, DEFAULT_XAI_MODEL)
    }

    pub fn openai_from_env() -> Self {
        let mut config = Self::openai();
        // `Monadicons_Key` is the name older deployments used.
        config.api_key = non_empty_env("OPENAI_API_KEY").or_else(|| non_empty_env("Monadicons_Key"));
        if let Some(base) = non_empty_env("OPENAI_API_BASE") {
            config = config.with_api_base(base);
        }
        if let Some(model) = non_empty_env("OPENAI_IMAGE_MODEL") {
            config.model = model;
        }
        config
    }

    pub fn xai_from_env() -> Self {
        let mut config = Self::xai();
        config.api_key = non_empty_env("XAI_API_KEY");
        if let Some(base) = non_empty_env("XAI_API_BASE") {
            config = config.with_api_base(base);
        }
        if let Some(model) = non_empty_env("XAI_IMAGE_MODEL") {
            config.model = model;
        }
        if env_flag("XAI_DATA_URL").unwrap_or(false) {
            config.encoding = ImageEncoding::DataUrl;
        }
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// The key, if one is set and not blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub moderation: bool,
    pub avatar_base: String,
    pub openai: ProviderConfig,
    pub xai: ProviderConfig,
    pub log_level: LogLevel,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            moderation: true,
            avatar_base: DEFAULT_AVATAR_BASE.to_string(),
            openai: ProviderConfig::openai(),
            xai: ProviderConfig::xai(),
            log_level: LogLevel::Info,
            log_json: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = non_empty_env("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(defaults.port);
        let moderation = env_flag("PROXY_MODERATION").unwrap_or(true);
        let avatar_base = non_empty_env("AVATAR_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or(defaults.avatar_base);
        let log_level = non_empty_env("LOG_LEVEL")
            .and_then(|level| LogLevel::parse(&level))
            .unwrap_or(defaults.log_level);
        let log_json = env_flag("LOG_JSON").unwrap_or(false);

        Config {
            host,
            port,
            moderation,
            avatar_base,
            openai: ProviderConfig::openai_from_env(),
            xai: ProviderConfig::xai_from_env(),
            log_level,
            log_json,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_moderation(mut self, enabled: bool) -> Self {
        self.moderation = enabled;
        self
    }

    pub fn with_openai(mut self, config: ProviderConfig) -> Self {
        self.openai = config;
        self
    }

    pub fn with_xai(mut self, config: ProviderConfig) -> Self {
        self.xai = config;
        self
    }

    pub fn with_avatar_base(mut self, base: impl Into<String>) -> Self {
        self.avatar_base = base.into();
        self
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_flag(key: &str) -> Option<bool> {
    non_empty_env(key).map(|val| matches!(val.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
}
