use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt; // For Response body handling
use serde_json::{json, Value};
use std::sync::{Arc, Once};
use tower::ServiceExt; // For oneshot

use seoscope::extract::PageSignals;
use seoscope::llm::{CompletionBackend, CompletionError};
use seoscope::{router, AppState};

// For initializing tracing once
static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

/// Completion backend with a scripted reply, so tests control exactly what
/// the normalizer sees.
struct StubBackend {
    reply: Result<String, &'static str>,
}

#[async_trait::async_trait]
impl CompletionBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn build_prompt(&self, signals: &PageSignals) -> String {
        format!(
            "analyze: {}",
            serde_json::to_string(signals).expect("signals serialize")
        )
    }

    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(msg) => Err(CompletionError::Api((*msg).to_string())),
        }
    }
}

fn test_state(reply: Result<String, &'static str>) -> AppState {
    let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
    AppState {
        http_client: client,
        backend: Arc::new(StubBackend { reply }),
        audit: None,
    }
}

/// Serve a fixed HTML document on an ephemeral local port.
async fn spawn_fixture(html: &'static str) -> String {
    let app = Router::new().route("/", get(move || async move { axum::response::Html(html) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

/// A completion payload that satisfies the target schema.
fn valid_analysis() -> Value {
    let section = json!({
        "Analysis": "Looks reasonable",
        "Suggestions": [
            {"Suggestion": "Tighten the copy", "Reason": "Too verbose"},
            {"Suggestion": "Add the primary keyword", "Keyword": "widgets", "Frequency": 3},
            {"Suggestion": "Use active voice"},
        ],
    });
    json!({
        "SEO_Analysis_and_Enhancement_Suggestions": {
            "Title_Analysis_and_Suggestions": section.clone(),
            "Meta_Description_Analysis_and_Suggestions": section.clone(),
            "H1_Tag_Analysis_and_Suggestions": section.clone(),
            "Content_Analysis_and_Suggestions": section.clone(),
            "Link_Analysis_and_Suggestions": section,
            "Overall_SEO_Assessment": "Solid page with room to grow",
            "Keyword_Optimization_Suggestions": [
                {"Keyword": "widgets", "Insertion": "first paragraph", "Frequency": "4"},
            ],
            "Schema_Markup_Suggestion": "Add Product schema",
            "Mobile_Optimization_Suggestion": "N/A",
            "Page_Speed_Suggestion": "Compress hero image",
        }
    })
}

async fn post_analysis(app: Router, body: Body, content_type: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri("/").method("POST");
    if let Some(ct) = content_type {
        builder = builder.header("Content-Type", ct);
    }
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Scenario A: fetch succeeds and the backend answers with fenced JSON
/// matching the schema.
#[tokio::test]
async fn analysis_succeeds_with_fenced_completion() {
    setup();

    let fixture = spawn_fixture(
        r#"<html><head>
            <title>Fixture Page</title>
            <meta name="description" content="A page for testing">
        </head><body>
            <h1>Welcome</h1>
            <a href="/one">one</a>
            <a href="/two">two</a>
            <a href="https://elsewhere.example/">away</a>
            <p>Some visible body text.</p>
        </body></html>"#,
    )
    .await;

    let fenced = format!("```json\n{}\n```", valid_analysis());
    let app = router(test_state(Ok(fenced)));

    let body = Body::from(json!({"url": fixture}).to_string());
    let (status, value) = post_analysis(app, body, Some("application/json")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["success"], true);
    assert_eq!(value["message"], "Analysis successful");
    assert_eq!(value["data"]["title"], "Fixture Page");
    assert_eq!(value["data"]["meta_description"], "A page for testing");
    assert_eq!(value["data"]["h1_tags"], json!(["Welcome"]));
    assert_eq!(value["data"]["internal_links"], 2);
    assert_eq!(value["data"]["external_links"], 1);
    assert!(value["ai_analysis"]["SEO_Analysis_and_Enhancement_Suggestions"].is_object());
}

/// Scenario B: the fetch fails (bad host), but the pipeline still runs the
/// backend with the degraded signals and returns 200.
#[tokio::test]
async fn fetch_failure_still_produces_an_analysis() {
    setup();

    let app = router(test_state(Ok(valid_analysis().to_string())));

    let body = Body::from(
        json!({"url": "http://no-such-host.seoscope-test.invalid/"}).to_string(),
    );
    let (status, value) = post_analysis(app, body, Some("application/json")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["success"], true);
    // Degraded signals: the error shape, not a partial summary.
    assert!(value["data"]["error"].as_str().unwrap().contains("Request error"));
    assert!(value["data"].get("title").is_none());
    assert!(value["ai_analysis"]["SEO_Analysis_and_Enhancement_Suggestions"].is_object());
}

/// Scenario C: the backend answers with prose and no fence; the normalizer
/// gives up and the caller sees a malformed-output failure.
#[tokio::test]
async fn unrecoverable_completion_is_a_500() {
    setup();

    let fixture = spawn_fixture("<html><body><p>hi</p></body></html>").await;
    let app = router(test_state(Ok(
        "I'm sorry, I can't produce JSON for this page.".to_string()
    )));

    let body = Body::from(json!({"url": fixture}).to_string());
    let (status, value) = post_analysis(app, body, Some("application/json")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(value["success"], false);
    assert!(value["message"]
        .as_str()
        .unwrap()
        .contains("Malformed LLM output"));
}

/// Scenario D: a non-JSON request body is rejected with 415.
#[tokio::test]
async fn non_json_request_is_unsupported_media_type() {
    setup();

    let app = router(test_state(Ok(valid_analysis().to_string())));
    let body = Body::from("url=https://example.com/");
    let (status, value) = post_analysis(app, body, Some("text/plain")).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(value["success"], false);
}

#[tokio::test]
async fn missing_or_empty_url_is_a_400() {
    setup();

    let app = router(test_state(Ok(valid_analysis().to_string())));
    let body = Body::from(json!({"url": "   "}).to_string());
    let (status, value) = post_analysis(app, body, Some("application/json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["success"], false);

    let app = router(test_state(Ok(valid_analysis().to_string())));
    let body = Body::from(json!({"other": "field"}).to_string());
    let (status, _) = post_analysis(app, body, Some("application/json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_body_is_a_400() {
    setup();

    let app = router(test_state(Ok(valid_analysis().to_string())));
    let body = Body::from("{\"url\": ");
    let (status, value) = post_analysis(app, body, Some("application/json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["success"], false);
}

/// A completion that parses as JSON but violates the schema surfaces the
/// offending field paths.
#[tokio::test]
async fn schema_violation_reports_field_paths() {
    setup();

    let fixture = spawn_fixture("<html><body><p>hi</p></body></html>").await;

    let mut payload = valid_analysis();
    payload["SEO_Analysis_and_Enhancement_Suggestions"]
        .as_object_mut()
        .unwrap()
        .remove("Link_Analysis_and_Suggestions");
    let app = router(test_state(Ok(payload.to_string())));

    let body = Body::from(json!({"url": fixture}).to_string());
    let (status, value) = post_analysis(app, body, Some("application/json")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(value["success"], false);
    assert_eq!(
        value["fields"],
        json!(["SEO_Analysis_and_Enhancement_Suggestions.Link_Analysis_and_Suggestions"])
    );
}

/// A backend failure (auth, rate limit, outage) is a completion error, not a
/// malformed-output error.
#[tokio::test]
async fn backend_failure_surfaces_as_completion_error() {
    setup();

    let fixture = spawn_fixture("<html><body><p>hi</p></body></html>").await;
    let app = router(test_state(Err("model overloaded")));

    let body = Body::from(json!({"url": fixture}).to_string());
    let (status, value) = post_analysis(app, body, Some("application/json")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(value["message"]
        .as_str()
        .unwrap()
        .contains("Completion error"));
}

#[tokio::test]
async fn test_health_check() {
    setup();

    let app = router(test_state(Ok(valid_analysis().to_string())));
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
