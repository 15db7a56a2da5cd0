use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PLACEHOLDER_SUMMARY: &str = "No summary generated";
pub const PLACEHOLDER_DIAGRAM: &str =
    "sequenceDiagram\n    participant A\n    participant B\n    A->>B: Analysis incomplete";

/// The guaranteed output shape of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub mermaid_code: String,
    pub detected_issues: Vec<String>,
    pub fix_recommendations: Vec<String>,
}

/// Normalize a recovered JSON value into an [`AnalysisResult`].
///
/// Only a non-object input is an error. Missing, null or blank text fields
/// get placeholders and anything that is not an array becomes an empty list.
/// Every list element is kept in order: strings verbatim, anything else
/// (`null` included) as its JSON text.
pub fn validate(value: &Value) -> Result<AnalysisResult> {
    let object = value.as_object().ok_or_else(|| {
        AnalysisError::InvalidSchema("Response must be a JSON object".to_string())
    })?;

    let summary = text_field(object.get("summary"))
        .unwrap_or_else(|| PLACEHOLDER_SUMMARY.to_string());
    let mermaid_code = text_field(object.get("mermaid_code"))
        .unwrap_or_else(|| PLACEHOLDER_DIAGRAM.to_string());

    Ok(AnalysisResult {
        summary,
        mermaid_code,
        detected_issues: list_field(object.get("detected_issues")),
        fix_recommendations: list_field(object.get("fix_recommendations")),
    })
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        other => Some(coerce(other)).filter(|text| !text.trim().is_empty()),
    }
}

fn list_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(coerce).collect(),
        _ => Vec::new(),
    }
}

fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
