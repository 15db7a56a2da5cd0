use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failure reported by an LLM backend.
///
/// Backends don't promise stable error types, so this only carries the HTTP
/// status (when there was one) and the message text. Classification happens
/// in [`crate::llm::client::classify_failure`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render_backend_error(.status, .message))]
pub struct BackendError {
    pub status: Option<u16>,
    pub message: String,
}

fn render_backend_error(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("backend error {}: {}", code, message),
        None => format!("backend error: {}", message),
    }
}

impl BackendError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0}")]
    Fetch(String),

    #[error("{0}")]
    Configuration(String),

    #[error(
        "Could not find any working Gemini model. Tried: {}. Flash models (gemini-*-flash) are recommended for the free tier.",
        display_tried(.tried)
    )]
    NoUsableModel { tried: Vec<String> },

    #[error(
        "Quota exceeded after {attempts} attempts. Please wait before trying again or upgrade your API tier."
    )]
    QuotaExceeded { attempts: u32 },

    #[error("Empty response from Gemini model")]
    EmptyReply,

    #[error("Could not extract valid JSON from Gemini response. Response preview: {preview}")]
    UnrecoverableResponse { preview: String },

    #[error("{0}")]
    InvalidSchema(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

fn display_tried(tried: &[String]) -> String {
    if tried.is_empty() {
        "(none)".to_string()
    } else {
        tried.join(", ")
    }
}

impl AnalysisError {
    /// Whether the message is safe and useful to show to the caller.
    ///
    /// Backend failures may echo request details, so they are logged and
    /// reported generically instead.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AnalysisError::Backend(_))
    }

    /// Short machine-readable tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Fetch(_) => "fetch",
            AnalysisError::Configuration(_) => "configuration",
            AnalysisError::NoUsableModel { .. } => "no_usable_model",
            AnalysisError::QuotaExceeded { .. } => "quota_exceeded",
            AnalysisError::EmptyReply => "empty_reply",
            AnalysisError::UnrecoverableResponse { .. } => "unrecoverable_response",
            AnalysisError::InvalidSchema(_) => "invalid_schema",
            AnalysisError::Backend(_) => "backend",
        }
    }
}
