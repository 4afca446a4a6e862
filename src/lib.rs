pub mod error;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod routes;
pub mod schema;

use axum::{
    routing::{get, post},
    Router,
};
use http_cache_reqwest::{CACacheManager, Cache, CacheMode, HttpCache, HttpCacheOptions};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::sync::Arc;
use utoipa::OpenApi;
// Conditionally import SwaggerUi only when needed (not test)
#[cfg(not(test))]
use utoipa_swagger_ui::SwaggerUi;
// Conditionally import CORS only when needed (not test)
#[cfg(not(test))]
use tower_http::cors::{Any, CorsLayer};
// Conditionally import Governor only when needed (not test)
#[cfg(not(test))]
use std::num::NonZeroU32;
#[cfg(not(test))]
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};

use llm::CompletionBackend;
use normalize::{AuditSink, FileAuditSink};

/// Shared per-request dependencies: the cached fetch client, the configured
/// completion backend, and the optional audit sink.
#[derive(Clone)]
pub struct AppState {
    pub http_client: ClientWithMiddleware,
    pub backend: Arc<dyn CompletionBackend>,
    pub audit: Option<Arc<dyn AuditSink>>,
}

/// Read-through cached HTTP client for page fetches. The cache is a
/// performance nicety; correctness never depends on it.
pub fn create_cached_client() -> ClientWithMiddleware {
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new());

    ClientBuilder::new(client)
        .with(Cache(HttpCache {
            mode: CacheMode::Default,
            manager: CACacheManager::default(),
            options: HttpCacheOptions::default(),
        }))
        .build()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SeoScope API",
        version = "0.1.0",
        description = "SEO signal extraction with LLM-backed improvement suggestions"
    ),
    paths(routes::analyze::analyze_url, routes::analyze::health_check),
    components(schemas(
        routes::analyze::AnalyzeRequest,
        routes::analyze::AnalyzeResponse,
        extract::PageSignals,
        extract::SignalSummary,
        extract::SignalError,
        schema::SeoAnalysisResponse,
        schema::SeoAnalysis,
        schema::SectionAnalysis,
        schema::SuggestionItem,
    ))
)]
struct ApiDoc;

/// Plain router over the given state. Integration tests drive this directly;
/// `create_app` wraps it with the public-facing layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(routes::analyze_url))
        .route("/health", get(routes::health_check))
        .with_state(state)
}

/// Create the application from environment configuration, with all routes
/// and middleware.
pub fn create_app() -> anyhow::Result<Router> {
    let state = AppState {
        http_client: create_cached_client(),
        backend: llm::backend_from_env()?,
        audit: std::env::var("SEO_AUDIT_DIR")
            .ok()
            .map(|dir| Arc::new(FileAuditSink::new(dir)) as Arc<dyn AuditSink>),
    };

    // Build our API documentation (needed regardless for ApiDoc::openapi())
    let api_doc = ApiDoc::openapi();
    let api_routes = router(state);

    // --- Conditionally apply layers and Swagger UI only when NOT running tests ---
    #[cfg(not(test))]
    let (docs_router, rate_limited_api_routes) = {
        let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", api_doc);

        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .key_extractor(SmartIpKeyExtractor)
                .period(std::time::Duration::from_secs(60))
                .burst_size(NonZeroU32::new(10).unwrap().into())
                .finish()
                .unwrap(),
        );
        let rate_limited_api_routes = api_routes.layer(GovernorLayer {
            config: governor_conf,
        });

        (docs_router, rate_limited_api_routes)
    };

    #[cfg(test)]
    let (docs_router, rate_limited_api_routes) = {
        let _ = api_doc;
        (Router::new(), api_routes)
    };

    #[allow(unused_mut)]
    let mut app = Router::new()
        .merge(rate_limited_api_routes)
        .merge(docs_router);

    #[cfg(not(test))]
    {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    Ok(app)
}
