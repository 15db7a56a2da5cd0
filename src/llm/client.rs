use super::backend::{DecodingParams, GenerationRequest, LlmBackend, ModelHandle};
use crate::error::{AnalysisError, BackendError, Result};
use crate::util::{preview, static_regex};
use std::time::Duration;

/// Fixed sampling for architectural analysis: low temperature, narrow
/// nucleus, JSON output requested first.
pub const DEFAULT_DECODING: DecodingParams = DecodingParams {
    temperature: 0.2,
    max_output_tokens: 2048,
    top_p: 0.7,
    top_k: 15,
    json_mode: true,
};

/// Rate limit retry configuration
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_SECS: u64 = 30;
const BACKOFF_MULTIPLIER: u32 = 2;

/// Bounded exponential backoff for rate-limit failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_secs(INITIAL_BACKOFF_SECS),
            multiplier: BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based): `base * multiplier^(retry-1)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self
            .multiplier
            .checked_pow(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// How the invocation loop should react to a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Quota or rate limit: back off and retry.
    RateLimited,
    /// The backend refused the forced-JSON option: retry without it.
    UnsupportedOption,
    Fatal,
}

const RATE_LIMIT_MARKERS: &[&str] = &[
    "quota",
    "rate limit",
    "ratelimit",
    "resource_exhausted",
    "resource exhausted",
    "too many requests",
];

const JSON_OPTION_MARKERS: &[&str] = &[
    "responsemimetype",
    "response_mime_type",
    "mime type",
    "json mode",
];

// A bare 429 in the message only counts as a status code, not inside ids or counts.
static_regex!(status_429, r"(?:^|[^\w.-])429(?:$|[^\w.-])");

pub fn classify_failure(error: &BackendError) -> FailureClass {
    let message = error.message.to_lowercase();
    if error.status == Some(429)
        || status_429().is_match(&message)
        || RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m))
    {
        FailureClass::RateLimited
    } else if JSON_OPTION_MARKERS.iter().any(|m| message.contains(m)) {
        FailureClass::UnsupportedOption
    } else {
        FailureClass::Fatal
    }
}

/// Generate a reply for `prompt`, retrying rate-limit failures with
/// exponential backoff. Returns the raw reply text, never blank.
pub async fn invoke(
    backend: &dyn LlmBackend,
    model: &ModelHandle,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String> {
    let mut request = GenerationRequest::new(prompt, DEFAULT_DECODING);
    let mut retry_count = 0;

    loop {
        match backend.generate(model, &request).await {
            Ok(response) => {
                if let Some(usage) = &response.usage {
                    log::debug!(
                        "Tokens: prompt={} reply={} total={}",
                        usage.prompt_token_count,
                        usage.candidates_token_count,
                        usage.total_token_count
                    );
                }
                if response.content.trim().is_empty() {
                    return Err(AnalysisError::EmptyReply);
                }
                log::debug!("Raw reply: {}", preview(&response.content, 500));
                return Ok(response.content);
            }
            Err(e) => match classify_failure(&e) {
                FailureClass::UnsupportedOption if request.decoding.json_mode => {
                    log::info!("Model {} rejected JSON mode, retrying without it", model.id());
                    request = request.without_json_mode();
                }
                FailureClass::RateLimited if retry_count < policy.max_retries => {
                    retry_count += 1;
                    let wait = policy.delay_for(retry_count);
                    log::warn!(
                        "Rate limited. Retrying in {}s (attempt {}/{})",
                        wait.as_secs(),
                        retry_count,
                        policy.max_retries
                    );
                    tokio::time::sleep(wait).await;
                }
                FailureClass::RateLimited => {
                    return Err(AnalysisError::QuotaExceeded {
                        attempts: retry_count + 1,
                    });
                }
                _ => return Err(AnalysisError::Backend(e)),
            },
        }
    }
}
