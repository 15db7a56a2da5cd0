use super::backend::{LlmBackend, ModelHandle};
use crate::error::{AnalysisError, Result};
use serde::Deserialize;

/// Substring that marks the fast, free-tier friendly model family.
pub const FLASH_MARKER: &str = "flash";

/// Tried after every discovered flash model, in this order.
pub const PREFERRED_FLASH_MODELS: &[&str] = &[
    "gemini-2.0-flash-exp",
    "gemini-2.0-flash",
    "gemini-1.5-flash-002",
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
];

pub fn is_flash(id: &str) -> bool {
    id.to_lowercase().contains(FLASH_MARKER)
}

/// Order in which model identifiers are tried: discovered flash models, then
/// the static flash list, then every other discovered model. Duplicates keep
/// their first position.
pub fn candidate_order(discovered: &[String]) -> Vec<String> {
    let (flash, other): (Vec<&String>, Vec<&String>) =
        discovered.iter().partition(|id| is_flash(id));

    let mut ordered: Vec<String> = Vec::new();
    let chain = flash
        .into_iter()
        .map(String::as_str)
        .chain(PREFERRED_FLASH_MODELS.iter().copied())
        .chain(other.into_iter().map(String::as_str));
    for id in chain {
        if !ordered.iter().any(|seen| seen == id) {
            ordered.push(id.to_string());
        }
    }
    ordered
}

/// Pick the first model the backend can construct.
pub async fn select_model(backend: &dyn LlmBackend) -> Result<ModelHandle> {
    if !backend.is_configured() {
        return Err(AnalysisError::Configuration(
            "GEMINI_API_KEY is not configured. Set it in the environment or run 'reporecon setup'."
                .to_string(),
        ));
    }

    let discovered = match backend.list_models().await {
        Ok(models) => models,
        Err(e) => {
            log::warn!("Could not list models, using the built-in list: {}", e);
            Vec::new()
        }
    };
    log::debug!("Discovered {} generation models", discovered.len());

    let mut tried = Vec::new();
    for id in candidate_order(&discovered) {
        match backend.construct(&id).await {
            Ok(handle) => {
                log::info!("Using model {}", handle.id());
                return Ok(handle);
            }
            Err(e) => {
                log::debug!("Model {} unavailable: {}", id, e);
                tried.push(id);
            }
        }
    }

    Err(AnalysisError::NoUsableModel { tried })
}

/// Token accounting as reported in Gemini's `usageMetadata`.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}
