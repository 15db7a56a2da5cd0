//! Gemini REST client (`v1beta`).

use super::backend::{GenerationRequest, LlmBackend, LlmResponse, ModelHandle};
use super::models::Usage;
use crate::error::BackendError;
use crate::util::truncate_str;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const GENERATE_METHOD: &str = "generateContent";
const LIST_PAGE_SIZE: u32 = 200;
/// Pages fetched from the model listing before giving up on the rest.
const MAX_LIST_PAGES: usize = 5;
const CALL_TIMEOUT: Duration = Duration::from_secs(120);

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn key(&self) -> Result<&str, BackendError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| BackendError::new(Some(401), "No Gemini API key configured"))
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<String, BackendError> {
        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", self.key()?)
            .query(query)
            .send()
            .await
            .map_err(|e| BackendError::network(e.to_string()))?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| BackendError::network(e.to_string()))?;
    if status.is_success() {
        Ok(text)
    } else {
        Err(error_from_body(status.as_u16(), &text))
    }
}

/// Turn a Gemini error envelope into a [`BackendError`]. The status text
/// (`RESOURCE_EXHAUSTED`, `INVALID_ARGUMENT`...) is kept in the message.
fn error_from_body(status: u16, body: &str) -> BackendError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) if !code.is_empty() => format!("{}: {}", code, envelope.error.message),
            _ => envelope.error.message,
        },
        Err(_) => truncate_str(body.trim(), 300).to_string(),
    };
    BackendError::new(Some(status), message)
}

fn valid_model_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut query = vec![("pageSize", LIST_PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let body = self.get(&url, &query).await?;
            let page: ModelList = serde_json::from_str(&body)
                .map_err(|e| BackendError::network(format!("Unreadable model list: {}", e)))?;

            models.extend(
                page.models
                    .into_iter()
                    .filter(ModelInfo::can_generate)
                    .map(|m| m.name.trim_start_matches("models/").to_string()),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(models)
    }

    async fn construct(&self, id: &str) -> Result<ModelHandle, BackendError> {
        let id = id.trim_start_matches("models/");
        if !valid_model_id(id) {
            return Err(BackendError::new(
                Some(400),
                format!("Invalid model identifier '{}'", id),
            ));
        }
        let url = format!("{}/models/{}", self.base_url, id);
        let body = self.get(&url, &[]).await?;
        let info: ModelInfo = serde_json::from_str(&body)
            .map_err(|e| BackendError::network(format!("Unreadable model info: {}", e)))?;
        if !info.can_generate() {
            return Err(BackendError::new(
                Some(400),
                format!("Model '{}' does not support {}", id, GENERATE_METHOD),
            ));
        }
        Ok(ModelHandle::new(id))
    }

    async fn generate(
        &self,
        model: &ModelHandle,
        request: &GenerationRequest,
    ) -> Result<LlmResponse, BackendError> {
        let url = format!("{}/models/{}:{}", self.base_url, model.id(), GENERATE_METHOD);
        let body = GenerateRequest::from(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.key()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::network(e.to_string()))?;
        let text = read_body(response).await?;

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            BackendError::network(format!(
                "Failed to parse Gemini response: {}\n{}",
                e,
                truncate_str(&text, 200)
            ))
        })?;
        Ok(parsed.into_response())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  WIRE TYPES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl From<&GenerationRequest> for GenerateRequest {
    fn from(request: &GenerationRequest) -> Self {
        let d = &request.decoding;
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: d.temperature,
                max_output_tokens: d.max_output_tokens,
                top_p: d.top_p,
                top_k: d.top_k,
                response_mime_type: d.json_mode.then(|| "application/json".to_string()),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<Usage>,
}

impl GenerateResponse {
    fn into_response(self) -> LlmResponse {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        LlmResponse {
            content,
            usage: self.usage_metadata,
        }
    }
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Option<Vec<String>>,
}

impl ModelInfo {
    fn can_generate(&self) -> bool {
        match &self.supported_generation_methods {
            Some(methods) => methods.iter().any(|m| m == GENERATE_METHOD),
            None => true,
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}
