//! The analysis pipeline: fetch, reduce, select a model, invoke, recover,
//! validate.

use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::github::{GitHubReadme, ReadmeSource};
use crate::llm::{self, AnalysisResult, GeminiBackend, LlmBackend, RetryPolicy};
use crate::reduce::{self, ReduceOptions};
use crate::util::char_len;
use std::sync::Arc;
use std::time::Instant;

/// Everything one analysis needs. Immutable once built, shared via `Arc`.
pub struct Analyzer {
    backend: Arc<dyn LlmBackend>,
    fetcher: Arc<dyn ReadmeSource>,
    options: ReduceOptions,
    retry: RetryPolicy,
}

impl Analyzer {
    pub fn new(backend: Arc<dyn LlmBackend>, fetcher: Arc<dyn ReadmeSource>) -> Self {
        Self {
            backend,
            fetcher,
            options: ReduceOptions::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Gemini and GitHub, configured from `config`. Fails when no credential
    /// can be found.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.credential().ok_or_else(|| {
            AnalysisError::Configuration(format!(
                "GEMINI_API_KEY is not configured. Set it in the environment, add api_key to {} or run 'reporecon setup'.",
                Config::config_location()
            ))
        })?;
        Ok(Self::new(
            Arc::new(GeminiBackend::new(Some(api_key))),
            Arc::new(GitHubReadme::new()),
        )
        .with_reduce_options(config.reduce_options())
        .with_retry_policy(config.retry_policy()))
    }

    pub fn with_reduce_options(mut self, options: ReduceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the whole pipeline for one repository URL.
    pub async fn analyze(&self, repository_url: &str) -> Result<AnalysisResult> {
        let request_id = uuid::Uuid::new_v4();
        let started = Instant::now();
        log::info!("[{}] Starting analysis for {}", request_id, repository_url);

        let outcome = self.run(request_id, repository_url).await;
        match &outcome {
            Ok(result) => log::info!(
                "[{}] Analysis finished in {:.1}s ({} issues, {} recommendations)",
                request_id,
                started.elapsed().as_secs_f64(),
                result.detected_issues.len(),
                result.fix_recommendations.len()
            ),
            Err(e) => log::warn!("[{}] Analysis failed ({}): {}", request_id, e.kind(), e),
        }
        outcome
    }

    async fn run(&self, request_id: uuid::Uuid, repository_url: &str) -> Result<AnalysisResult> {
        let raw = self.fetcher.fetch_readme(repository_url).await?;
        let readme = reduce::reduce_with(&raw, &self.options);
        log::debug!(
            "[{}] README reduced from {} to {} characters",
            request_id,
            char_len(&raw),
            char_len(&readme)
        );

        let model = llm::select_model(self.backend.as_ref()).await?;
        let prompt = llm::prompts::analysis_prompt(&readme);
        let reply = llm::invoke(self.backend.as_ref(), &model, &prompt, &self.retry).await?;

        let value = llm::recover(&reply)?;
        llm::validate(&value)
    }
}
