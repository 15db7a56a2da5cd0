//! RepoRecon: architectural analysis of GitHub repositories from their README.
//!
//! The README is fetched, reduced to a small budget, sent to a Gemini model
//! and the reply is recovered into an [`llm::AnalysisResult`].

pub mod analyze;
pub mod config;
pub mod error;
pub mod github;
pub mod keyring;
pub mod llm;
pub mod reduce;
pub mod server;
pub mod util;
