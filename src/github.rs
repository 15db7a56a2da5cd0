//! README retrieval from public GitHub repositories.

use crate::error::{AnalysisError, Result};
use async_trait::async_trait;
use std::time::Duration;

pub const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";

/// Branches tried in order; the next one only on a 404.
const BRANCHES: &[&str] = &["main", "master"];
const FETCH_TIMEOUT_SECS: u64 = 10;

/// Maximum length for error body content in log lines
const MAX_ERROR_BODY_LEN: usize = 200;

/// Where README text comes from. Tests substitute canned documents.
#[async_trait]
pub trait ReadmeSource: Send + Sync {
    async fn fetch_readme(&self, repository_url: &str) -> Result<String>;
}

/// A GitHub repository named by owner and repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

/// Prefix `https://` when the caller left the scheme out.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Extract owner and repository from a GitHub URL.
///
/// Accepts `https://github.com/owner/repo`, a trailing `/` or `.git`, a
/// missing scheme and extra path segments (`/tree/main/docs`).
pub fn parse_repository_url(url: &str) -> Option<Repository> {
    let parsed = url::Url::parse(&normalize_url(url)).ok()?;
    match parsed.host_str()? {
        "github.com" | "www.github.com" => {}
        _ => return None,
    }

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let name = segments.next()?.trim_end_matches(".git");
    if name.is_empty() {
        return None;
    }
    Some(Repository {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

/// Truncate an error body so raw HTML pages don't flood the log.
fn sanitize_error_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() > MAX_ERROR_BODY_LEN {
        format!("{}... (truncated)", crate::util::truncate_str(body, MAX_ERROR_BODY_LEN))
    } else {
        body.to_string()
    }
}

/// Fetches `README.md` from `raw.githubusercontent.com`.
pub struct GitHubReadme {
    client: reqwest::Client,
    raw_base: String,
}

impl Default for GitHubReadme {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubReadme {
    pub fn new() -> Self {
        Self::with_raw_base(RAW_CONTENT_BASE)
    }

    pub fn with_raw_base(raw_base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(concat!("reporecon/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            raw_base: raw_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn raw_url(&self, repo: &Repository, branch: &str) -> String {
        format!(
            "{}/{}/{}/{}/README.md",
            self.raw_base, repo.owner, repo.name, branch
        )
    }
}

#[async_trait]
impl ReadmeSource for GitHubReadme {
    async fn fetch_readme(&self, repository_url: &str) -> Result<String> {
        let repo = parse_repository_url(repository_url).ok_or_else(|| {
            AnalysisError::Fetch(format!("Invalid GitHub URL provided: {}", repository_url.trim()))
        })?;
        let not_found = || {
            AnalysisError::Fetch(format!(
                "Could not fetch README from {}. Ensure the repository is public and has a README.",
                repo.html_url()
            ))
        };

        for branch in BRANCHES {
            let url = self.raw_url(&repo, branch);
            log::debug!("Fetching {}", url);
            let response = self.client.get(&url).send().await.map_err(|e| {
                AnalysisError::Fetch(format!("Network error fetching GitHub repository: {}", e))
            })?;

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                log::warn!(
                    "README fetch for {} returned {}: {}",
                    repo.html_url(),
                    status,
                    sanitize_error_body(&body)
                );
                return Err(not_found());
            }
            return response.text().await.map_err(|e| {
                AnalysisError::Fetch(format!("Network error fetching GitHub repository: {}", e))
            });
        }

        Err(not_found())
    }
}
