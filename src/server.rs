use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{
    http::{header, StatusCode},
    web, App, HttpRequest, HttpResponse, HttpServer,
};
use serde_json::json;

use crate::{
    avatar::{AvatarClient, AvatarRequest},
    config::Config,
    models::{ProxyResponse, RequestBody},
    providers::ProviderKind,
    proxy::{error_response, ImageProxy},
    transport::{HttpTransport, ReqwestTransport},
};

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    proxies: HashMap<ProviderKind, ImageProxy>,
    avatars: AvatarClient,
}

impl AppState {
    pub fn from_config(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        let mut proxies = HashMap::new();
        for (kind, provider_config) in [
            (ProviderKind::OpenAi, config.openai.clone()),
            (ProviderKind::Xai, config.xai.clone()),
        ] {
            let proxy = ImageProxy::new(kind.adapter(provider_config), transport.clone())
                .with_moderation(config.moderation);
            proxies.insert(kind, proxy);
        }

        Self {
            proxies,
            avatars: AvatarClient::with_base(transport, config.avatar_base.clone()),
        }
    }

    pub fn proxy(&self, kind: ProviderKind) -> Option<&ImageProxy> {
        self.proxies.get(&kind)
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/api/avatar", web::get().to(avatar))
        .route("/api/generate-image-openai", web::route().to(generate_openai))
        .route("/api/generate-image-xai", web::route().to(generate_xai))
        .route("/api/generate-image/{provider}", web::route().to(generate_by_name));
}

pub async fn run(config: Config) -> std::io::Result<()> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new());
    let state = web::Data::new(AppState::from_config(&config, transport));

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(config.bind_address())?
        .run()
        .await
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn generate_openai(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    dispatch(&state, ProviderKind::OpenAi, &req, body).await
}

async fn generate_xai(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    dispatch(&state, ProviderKind::Xai, &req, body).await
}

async fn generate_by_name(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    match path.parse::<ProviderKind>() {
        Ok(kind) => dispatch(&state, kind, &req, body).await,
        Err(e) => HttpResponse::NotFound().json(json!({ "error": e.to_string() })),
    }
}

async fn dispatch(
    state: &AppState,
    kind: ProviderKind,
    req: &HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    match state.proxy(kind) {
        Some(proxy) => {
            let response = proxy
                .handle(req.method().as_str(), RequestBody::Raw(body.to_vec()))
                .await;
            into_http(response)
        }
        None => HttpResponse::NotFound().json(json!({ "error": "Provider not mounted" })),
    }
}

async fn avatar(state: web::Data<AppState>, query: web::Query<AvatarRequest>) -> HttpResponse {
    match state.avatars.fetch_svg(&query).await {
        Ok(svg) => HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "image/svg+xml"))
            .body(svg),
        Err(e) => into_http(error_response(&e)),
    }
}

fn into_http(response: ProxyResponse) -> HttpResponse {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);
    if let Some(allow) = response.allow {
        builder.insert_header((header::ALLOW, allow));
    }
    builder.json(response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::transport::mock::MockTransport;
    use actix_web::{body::to_bytes, test};
    use serde_json::Value;

    fn state(transport: Arc<MockTransport>) -> web::Data<AppState> {
        let config = Config::new()
            .with_moderation(false)
            .with_openai(ProviderConfig::openai().with_api_key("sk-test"))
            .with_xai(ProviderConfig::xai());
        web::Data::new(AppState::from_config(&config, transport))
    }

    #[actix_web::test]
    async fn test_get_is_405_with_allow_header() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(MockTransport::new())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/generate-image-openai")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers().get(header::ALLOW).unwrap(), "POST");
    }

    #[actix_web::test]
    async fn test_post_returns_image() {
        let transport = Arc::new(
            MockTransport::new().push_json(200, json!({ "data": [{ "b64_json": "QQ==" }] })),
        );
        let app = test::init_service(
            App::new()
                .app_data(state(transport.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/generate-image/openai")
            .set_payload(r#"{"prompt":"a cat","width":256}"#)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "image": "QQ==", "mime": "image/png" }));
        assert_eq!(transport.call_count(), 1);
    }

    #[actix_web::test]
    async fn test_unconfigured_provider_is_500() {
        let transport = Arc::new(MockTransport::new());
        let app = test::init_service(
            App::new()
                .app_data(state(transport.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/generate-image-xai")
            .set_payload(r#"{"prompt":"a cat"}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_unknown_provider_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(MockTransport::new())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/generate-image/midjourney")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_avatar_route_returns_svg() {
        let transport = Arc::new(MockTransport::new().push_bytes(
            200,
            "image/svg+xml",
            b"<svg><script>x()</script></svg>",
        ));
        let app = test::init_service(
            App::new()
                .app_data(state(transport))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/avatar?seed=nova&style=bottts&size=64")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/svg+xml"
        );
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(&bytes[..], b"<svg></svg>");
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(MockTransport::new())))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
    }
}
