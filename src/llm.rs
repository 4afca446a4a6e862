use crate::extract::PageSignals;
use crate::schema::SchemaDescription;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Failure modes of a completion call, kept distinguishable so callers can
/// tell an expired key from a rate limit without parsing message text.
#[derive(Debug)]
pub enum CompletionError {
    Auth(String),
    RateLimited(String),
    Api(String),
    Network(String),
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Auth(msg) => write!(f, "authentication failed: {}", msg),
            CompletionError::RateLimited(msg) => write!(f, "rate limited: {}", msg),
            CompletionError::Api(msg) => write!(f, "backend error: {}", msg),
            CompletionError::Network(msg) => write!(f, "network error: {}", msg),
        }
    }
}

impl std::error::Error for CompletionError {}

/// A prompt-in/text-out completion service. Each implementation carries its
/// own prompt-construction conventions; the orchestrator consumes them
/// identically.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build this backend's analysis prompt around the page signals and the
    /// shared schema description.
    fn build_prompt(&self, signals: &PageSignals) -> String;

    /// Send the prompt and return the raw, unvalidated completion text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Select the configured backend. `SEO_LLM_PROVIDER` is `groq` or `gemini`,
/// defaulting to `groq`.
pub fn backend_from_env() -> anyhow::Result<Arc<dyn CompletionBackend>> {
    let provider = env::var("SEO_LLM_PROVIDER").unwrap_or_else(|_| "groq".to_string());
    match provider.to_lowercase().as_str() {
        "groq" => Ok(Arc::new(GroqBackend::from_env()?)),
        "gemini" => Ok(Arc::new(GeminiBackend::from_env()?)),
        other => Err(anyhow::anyhow!("Unknown completion provider: {}", other)),
    }
}

fn key_from_env(name: &str) -> anyhow::Result<String> {
    if let Ok(key) = env::var(name) {
        return Ok(key);
    }
    // Fall back to a .env file if the variable is not already set.
    let _ = dotenvy::dotenv();
    env::var(name).map_err(|_| anyhow::anyhow!("{} not found in environment or .env file", name))
}

fn signals_json(signals: &PageSignals) -> String {
    serde_json::to_string(signals).unwrap_or_default()
}

fn map_status(status: reqwest::StatusCode, body: String) -> CompletionError {
    match status.as_u16() {
        401 | 403 => CompletionError::Auth(format!("status {}: {}", status, body)),
        429 => CompletionError::RateLimited(format!("status {}: {}", status, body)),
        _ => CompletionError::Api(format!("status {}: {}", status, body)),
    }
}

/// Groq chat-completions backend.
pub struct GroqBackend {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl GroqBackend {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(GroqBackend {
            client: Client::new(),
            api_key: key_from_env("GROQ_API_KEY")?,
            model: env::var("GROQ_MODEL").unwrap_or_else(|_| GROQ_DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl CompletionBackend for GroqBackend {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn build_prompt(&self, signals: &PageSignals) -> String {
        format!(
            "Role: Expert SEO Content Analyst\n\
             Task: Analyze SEO data and provide actionable improvements in VALID JSON.\n\
             Data: {}\n\
             Schema: Strictly adhere to {}\n\n\
             Required Content within Schema:\n\
             - Min. 3 suggestions/section.\n\
             - Keyword details (location, frequency).\n\
             - Schema type.\n\
             - Mobile/Pagespeed suggestions.\n\n\
             Strict JSON Formatting:\n\
             - Double quotes only.\n\
             - JSON object ONLY (no extra text).\n\
             - Use \"N/A\" instead of empty strings.\n\
             - No internal newlines in strings.\n",
            signals_json(signals),
            SchemaDescription::current().prompt_block(),
        )
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request_body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a helpful assistant that provides SEO analysis in JSON format."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
            temperature: 0.7,
            max_tokens: 2048,
        };

        info!("Sending completion request to Groq (model {})", self.model);
        let response = self
            .client
            .post(GROQ_ENDPOINT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!("Network error calling Groq: {}", e);
                CompletionError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            error!("Groq returned status {}: {}", status, body);
            return Err(map_status(status, body));
        }

        let api_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| CompletionError::Api(format!("unreadable response: {}", e)))?;

        match api_response.choices.into_iter().next() {
            Some(choice) => {
                info!(
                    "Received Groq completion ({} chars)",
                    choice.message.content.len()
                );
                Ok(choice.message.content)
            }
            None => Err(CompletionError::Api("response contained no choices".to_string())),
        }
    }
}

/// Gemini generateContent backend.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
}

#[derive(Serialize)]
struct GenerateContent {
    parts: Vec<GeneratePart>,
}

#[derive(Serialize)]
struct GeneratePart {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

impl GeminiBackend {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(GeminiBackend {
            client: Client::new(),
            api_key: key_from_env("GEMINI_API_KEY")?,
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| GEMINI_DEFAULT_MODEL.to_string()),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        )
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn build_prompt(&self, signals: &PageSignals) -> String {
        format!(
            "Role: Expert SEO Content Analyst. \
             Task: Analyze SEO data and provide actionable improvements in VALID JSON. \
             Data: {} \
             Schema: Strictly adhere to {} \
             Required Content within Schema: Min. 3 suggestions/section. \
             Keyword details (location, frequency). Schema type. \
             Mobile/Pagespeed suggestions. \
             Strict JSON Formatting: Double quotes only. JSON object ONLY (no extra text). \
             Use \"N/A\" instead of empty strings. No internal newlines in strings. \
             Return the output strictly as a raw JSON object. \
             Do NOT wrap the JSON in Markdown code blocks (```json ... ```) or any other formatting. \
             Output ONLY the JSON text itself.",
            signals_json(signals),
            SchemaDescription::current().prompt_block(),
        )
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request_body = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart {
                    text: prompt.to_string(),
                }],
            }],
        };

        info!("Sending completion request to Gemini (model {})", self.model);
        let response = self
            .client
            .post(self.endpoint())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!("Network error calling Gemini: {}", e);
                CompletionError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            error!("Gemini returned status {}: {}", status, body);
            return Err(map_status(status, body));
        }

        let api_response = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| CompletionError::Api(format!("unreadable response: {}", e)))?;

        let text = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text);

        match text {
            Some(text) => {
                info!("Received Gemini completion ({} chars)", text.len());
                Ok(text)
            }
            None => Err(CompletionError::Api("response contained no candidates".to_string())),
        }
    }
}
