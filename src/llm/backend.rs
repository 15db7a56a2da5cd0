use super::models::Usage;
use crate::error::BackendError;
use async_trait::async_trait;

/// A model the backend agreed to serve. Selected once per analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    id: String,
}

impl ModelHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Sampling settings sent with every generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    /// Ask the backend to constrain output to JSON (`application/json`).
    pub json_mode: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub decoding: DecodingParams,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, decoding: DecodingParams) -> Self {
        Self {
            prompt: prompt.into(),
            decoding,
        }
    }

    /// Same prompt and sampling, without forced JSON output.
    pub fn without_json_mode(&self) -> Self {
        Self {
            prompt: self.prompt.clone(),
            decoding: DecodingParams {
                json_mode: false,
                ..self.decoding
            },
        }
    }
}

/// Response from a generation call including usage stats when reported.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

/// A hosted text-generation service.
///
/// The pipeline only talks to the model through this trait, so tests swap in
/// scripted fakes and the Gemini client lives in [`super::gemini`].
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Whether a credential is present. Checked before any network call.
    fn is_configured(&self) -> bool {
        true
    }

    /// Identifiers of models that can generate content.
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;

    /// Confirm a model identifier is usable and return a handle for it.
    async fn construct(&self, id: &str) -> Result<ModelHandle, BackendError>;

    async fn generate(
        &self,
        model: &ModelHandle,
        request: &GenerationRequest,
    ) -> Result<LlmResponse, BackendError>;
}
