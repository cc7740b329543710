//! Image generation proxy.
//!
//! Accepts a prompt, forwards it to an OpenAI- or xAI-style image endpoint and
//! answers with one stable `{ image, mime }` shape no matter which response
//! form the provider picked.

pub mod avatar;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod providers;
pub mod proxy;
#[cfg(feature = "server")]
pub mod server;
pub mod transport;

pub use avatar::{AvatarClient, AvatarRequest};
pub use config::{Config, ProviderConfig};
pub use error::{ProxyError, Result};
pub use models::*;
pub use providers::{OpenAiAdapter, ProviderAdapter, ProviderKind, SizePolicy, XaiAdapter};
pub use proxy::ImageProxy;
pub use transport::{HttpTransport, ReqwestTransport, TransportError, UpstreamResponse};
