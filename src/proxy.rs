use std::sync::Arc;

use serde_json::{json, Value};

use crate::{
    error::{ProxyError, Result},
    logger::RequestSpan,
    models::{
        GenerationRequest, GenerationResult, ImageResponse, ParsedImage, ProviderError,
        ProxyResponse, RequestBody, Stage,
    },
    providers::{ModerationEndpoint, ProviderAdapter},
    transport::{HttpTransport, UpstreamResponse},
};

const DIAGNOSTIC_LIMIT: usize = 2048;

/// One image-generation endpoint bound to a single provider adapter.
///
/// Holds no per-request state; a single instance serves concurrent calls.
#[derive(Clone)]
pub struct ImageProxy {
    adapter: Arc<dyn ProviderAdapter>,
    transport: Arc<dyn HttpTransport>,
    moderation: bool,
}

impl ImageProxy {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            adapter,
            transport,
            moderation: true,
        }
    }

    pub fn with_moderation(mut self, enabled: bool) -> Self {
        self.moderation = enabled;
        self
    }

    pub fn provider(&self) -> &'static str {
        self.adapter.name()
    }

    /// Request boundary: every outcome, including failures, becomes a response.
    pub async fn handle(&self, method: &str, body: RequestBody) -> ProxyResponse {
        let span = RequestSpan::new(self.adapter.name());
        log::info!("[{}] {} invocation: method={}", span.id(), self.provider(), method);

        let outcome = if method == "POST" {
            self.generate_traced(body, span.id()).await
        } else {
            Err(ProxyError::MethodNotAllowed)
        };

        let outcome = outcome.and_then(|image| {
            serde_json::to_value(image).map_err(|e| ProxyError::InternalError(e.to_string()))
        });

        match outcome {
            Ok(body) => ProxyResponse::ok(body),
            Err(err) => {
                self.log_failure(span.id(), &err);
                error_response(&err)
            }
        }
    }

    pub async fn generate(&self, body: RequestBody) -> Result<ImageResponse> {
        let span = RequestSpan::new(self.adapter.name());
        self.generate_traced(body, span.id()).await
    }

    async fn generate_traced(&self, body: RequestBody, req: &str) -> Result<ImageResponse> {
        let body = body.into_object();
        let request = GenerationRequest::from_body(&body)?;
        log::info!(
            "[{}] request: prompt_len={} width={} height={}",
            req,
            request.prompt.chars().count(),
            request.width,
            request.height
        );

        let api_key = self
            .adapter
            .config()
            .credential()
            .ok_or_else(|| {
                ProxyError::ConfigError(format!("{} key not configured.", self.provider()))
            })?
            .to_string();

        let input = self.adapter.size_policy().apply(request);

        if self.moderation {
            if let Some(endpoint) = self.adapter.moderation() {
                self.moderate(&endpoint, &api_key, &input.prompt, req).await?;
            }
        }

        let payload = self.adapter.build_request(&input);
        let endpoint = self.adapter.endpoint();
        log::info!(
            "[{}] calling {} with model={} size={}",
            req,
            endpoint,
            payload.get("model").and_then(Value::as_str).unwrap_or("-"),
            input.size()
        );

        let response = self
            .transport
            .post_json(&endpoint, &api_key, &payload)
            .await
            .map_err(|e| ProxyError::UpstreamError {
                provider: self.provider().to_string(),
                upstream: ProviderError::new(0, json!(e.to_string()), Stage::Generation),
            })?;

        if !response.is_success() {
            return Err(ProxyError::UpstreamError {
                provider: self.provider().to_string(),
                upstream: ProviderError::new(
                    response.status,
                    diagnostic_payload(&response),
                    Stage::Generation,
                ),
            });
        }

        let payload = response
            .json()
            .ok_or_else(|| ProxyError::UpstreamShapeError {
                provider: self.provider().to_string(),
                payload: Value::String(truncate(&response.text(), DIAGNOSTIC_LIMIT)),
            })?;

        let result = match self.adapter.parse_response(&payload)? {
            ParsedImage::Inline(b64) => {
                log::info!("[{}] got inline image from {}", req, self.provider());
                GenerationResult::inline(b64)
            }
            ParsedImage::Remote(url) => {
                log::info!("[{}] got image url from {}, fetching", req, self.provider());
                self.fetch_remote(&url).await?
            }
        };

        Ok(result.into_response(self.adapter.config().encoding))
    }

    /// Best effort: only a successful, flagged verdict stops the request.
    async fn moderate(
        &self,
        endpoint: &ModerationEndpoint,
        api_key: &str,
        prompt: &str,
        req: &str,
    ) -> Result<()> {
        let body = endpoint.build_request(prompt);
        let response = match self.transport.post_json(&endpoint.url, api_key, &body).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("[{}] moderation unavailable, continuing: {}", req, e);
                return Ok(());
            }
        };

        if !response.is_success() {
            log::warn!(
                "[{}] moderation returned {}, continuing without it",
                req,
                response.status
            );
            return Ok(());
        }

        match response.json().and_then(|v| endpoint.parse_verdict(&v)) {
            Some(verdict) if verdict.flagged => {
                Err(ProxyError::PolicyRejected {
                    categories: verdict.categories,
                })
            }
            Some(_) => {
                log::debug!("[{}] moderation passed", req);
                Ok(())
            }
            None => {
                log::warn!("[{}] moderation verdict unreadable, continuing", req);
                Ok(())
            }
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<GenerationResult> {
        let fetch_error = |status: u16, reason: Value| {
            ProxyError::RemoteFetchError(ProviderError::new(
                status,
                json!({ "url": url, "reason": reason }),
                Stage::FetchRemoteImage,
            ))
        };

        let response = self
            .transport
            .get(url)
            .await
            .map_err(|e| fetch_error(0, json!(e.to_string())))?;

        if !response.is_success() {
            return Err(fetch_error(
                response.status,
                json!(truncate(&response.text(), 512)),
            ));
        }

        Ok(GenerationResult::fetched(&response.body))
    }

    fn log_failure(&self, req: &str, err: &ProxyError) {
        let stage = failure_stage(err);
        if err.status_code() < 500 {
            log::warn!("[{}] {} rejected at {}: {}", req, self.provider(), stage, err);
        } else {
            log::error!(
                "[{}] {} failed at {}: {} {}",
                req,
                self.provider(),
                stage,
                err,
                err.details().map(|d| d.to_string()).unwrap_or_default()
            );
        }
    }
}

pub fn error_response(err: &ProxyError) -> ProxyResponse {
    let body = serde_json::to_value(err.to_body())
        .unwrap_or_else(|_| json!({ "error": err.to_string() }));
    ProxyResponse {
        status: err.status_code(),
        allow: matches!(err, ProxyError::MethodNotAllowed).then_some("POST"),
        body,
    }
}

fn failure_stage(err: &ProxyError) -> &'static str {
    match err {
        ProxyError::InvalidInput(_) => "input",
        ProxyError::MethodNotAllowed => "method",
        ProxyError::ConfigError(_) => "configuration",
        ProxyError::PolicyRejected { .. } => Stage::Moderation.as_str(),
        ProxyError::UpstreamError { upstream, .. } => upstream.stage.as_str(),
        ProxyError::UpstreamShapeError { .. } => Stage::Generation.as_str(),
        ProxyError::RemoteFetchError(upstream) => upstream.stage.as_str(),
        ProxyError::InternalError(_) => "internal",
    }
}

fn diagnostic_payload(response: &UpstreamResponse) -> Value {
    response.json().unwrap_or_else(|| {
        json!({
            "status": response.status,
            "contentType": response.content_type,
            "body": truncate(&response.text(), DIAGNOSTIC_LIMIT),
        })
    })
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(limit).collect();
        cut.push_str("...");
        cut
    }
}
