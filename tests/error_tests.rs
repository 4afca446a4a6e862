use axum::{http::StatusCode, response::IntoResponse};
use http_body_util::BodyExt;
use seoscope::error::AppError;
use serde_json::Value;

// Test for AppError Display implementation
#[test]
fn test_app_error_display() {
    let error1 = AppError::InvalidRequest("missing url".to_string());
    assert_eq!(error1.to_string(), "Invalid request: missing url");

    let error2 = AppError::CompletionError("rate limited: slow down".to_string());
    assert_eq!(error2.to_string(), "Completion error: rate limited: slow down");

    let error3 = AppError::MalformedCompletion("unrecoverable (42 chars)".to_string());
    assert_eq!(
        error3.to_string(),
        "Malformed LLM output: unrecoverable (42 chars)"
    );

    let error4 = AppError::SchemaValidation(vec!["A.B".to_string(), "A.C".to_string()]);
    assert_eq!(
        error4.to_string(),
        "Schema validation error: invalid fields: A.B, A.C"
    );
}

// Test for AppError IntoResponse implementation
#[tokio::test]
async fn test_app_error_into_response() {
    let error = AppError::InvalidRequest("missing url".to_string());
    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap();
    assert_eq!(body["message"], "Invalid request: missing url");
    assert_eq!(body["success"], false);

    let error = AppError::NotJson("expected application/json".to_string());
    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let error = AppError::CompletionError("backend down".to_string());
    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let error = AppError::SchemaValidation(vec!["Root.Section".to_string()]);
    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["fields"], serde_json::json!(["Root.Section"]));
}
