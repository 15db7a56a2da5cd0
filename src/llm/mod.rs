pub mod backend;
pub mod client;
pub mod gemini;
pub mod models;
pub mod parse;
pub mod prompts;
pub mod schema;

pub use backend::{DecodingParams, GenerationRequest, LlmBackend, LlmResponse, ModelHandle};
pub use client::{classify_failure, invoke, FailureClass, RetryPolicy, DEFAULT_DECODING};
pub use gemini::GeminiBackend;
pub use models::{select_model, Usage};
pub use parse::recover;
pub use schema::{validate, AnalysisResult};
