use crate::error::AppError;
use crate::extract::{extract_signals, PageSignals};
use crate::fetch::fetch_page;
use crate::normalize::normalize_completion;
use crate::schema::{validate, SeoAnalysisResponse};
use crate::AppState;
use tracing::info;

/// Everything a successful analysis produces.
pub struct AnalysisOutcome {
    pub signals: PageSignals,
    pub analysis: SeoAnalysisResponse,
}

/// Run the full analysis sequence for one URL: fetch, extract, prompt,
/// complete, normalize, validate. Strictly sequential, no retries.
///
/// A failed fetch does not abort the run: the error-shaped signals are
/// embedded in the prompt and the backend is asked to work with what it has.
/// Every later stage failure maps onto its own `AppError` variant.
#[tracing::instrument(skip(state), fields(url = %url, backend = %state.backend.name()))]
pub async fn run_analysis(url: &str, state: &AppState) -> Result<AnalysisOutcome, AppError> {
    let page = fetch_page(url, &state.http_client).await;

    let signals = extract_signals(url, &page);
    if signals.is_error() {
        info!("Proceeding with degraded signals for {}", url);
    }

    let prompt = state.backend.build_prompt(&signals);
    info!("Built {} prompt ({} chars)", state.backend.name(), prompt.len());

    let raw = state
        .backend
        .complete(&prompt)
        .await
        .map_err(|e| AppError::CompletionError(e.to_string()))?;
    info!("Received raw completion ({} chars)", raw.len());

    let payload = normalize_completion(&raw, state.audit.as_deref()).ok_or_else(|| {
        AppError::MalformedCompletion(format!(
            "completion could not be recovered as JSON ({} chars)",
            raw.len()
        ))
    })?;

    let analysis = validate(&payload).map_err(AppError::SchemaValidation)?;
    info!("Analysis validated for {}", url);

    Ok(AnalysisOutcome { signals, analysis })
}
