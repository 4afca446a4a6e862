use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extract::PageSignals;
use crate::pipeline;
use crate::schema::SeoAnalysisResponse;
use crate::AppState;

/// Request body for the analysis endpoint
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// URL of the page to analyze
    #[serde(default)]
    url: Option<String>,
}

/// Response containing the extracted signals and the validated LLM analysis
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeResponse {
    /// Human-readable outcome summary
    pub message: String,
    /// Whether the analysis completed
    pub success: bool,
    /// SEO signals extracted from the page (or the fetch error)
    pub data: PageSignals,
    /// Validated improvement suggestions from the completion backend
    pub ai_analysis: SeoAnalysisResponse,
}

/// Analyze a URL: extract its SEO signals and ask the configured completion
/// backend for structured improvement suggestions.
#[utoipa::path(
    post,
    path = "/",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis complete", body = AnalyzeResponse),
        (status = 400, description = "Missing or invalid URL, or malformed request JSON"),
        (status = 415, description = "Request is not JSON"),
        (status = 500, description = "Completion, normalization, or validation failure")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn analyze_url(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AnalyzeResponse>), AppError> {
    let Json(request) = payload.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(r) => AppError::NotJson(r.body_text()),
        other => AppError::InvalidRequest(other.body_text()),
    })?;

    let url = request.url.as_deref().map(str::trim).unwrap_or("");
    if url.is_empty() {
        return Err(AppError::InvalidRequest(
            "URL is required and must be a non-empty string".to_string(),
        ));
    }

    info!("Analyzing URL: {}", url);
    let outcome = pipeline::run_analysis(url, &state).await?;

    Ok((
        StatusCode::OK,
        Json(AnalyzeResponse {
            message: "Analysis successful".to_string(),
            success: true,
            data: outcome.signals,
            ai_analysis: outcome.analysis,
        }),
    ))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}
