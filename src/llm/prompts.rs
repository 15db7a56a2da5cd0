pub const ANALYSIS_INSTRUCTIONS: &str = r#"You are a software architect reviewing a project from its README. Analyze the README below and return ONLY valid JSON (no markdown, no code blocks, no text before or after).

Required JSON format (copy this structure exactly):
{
  "summary": "Brief 2 sentence architecture summary",
  "mermaid_code": "sequenceDiagram\n    participant User\n    participant App\n    User->>App: request",
  "detected_issues": ["Issue 1", "Issue 2"],
  "fix_recommendations": ["Fix 1", "Fix 2"]
}

RULES:
- "summary" describes the main components and how they interact
- "mermaid_code" is a Mermaid sequenceDiagram of the main request flow, with newlines escaped as \n
- "detected_issues" lists architectural risks you can infer from the README (may be empty)
- "fix_recommendations" lists concrete fixes for those issues, in the same order
- Keep every string short; the whole reply must fit in 2048 tokens

CRITICAL: Return ONLY the JSON object."#;

/// Build the analysis prompt around an already reduced README.
pub fn analysis_prompt(readme: &str) -> String {
    let readme = readme.trim();
    let readme = if readme.is_empty() {
        "(the README is empty)"
    } else {
        readme
    };
    format!(
        "{}\n\nREADME:\n<<<\n{}\n>>>",
        ANALYSIS_INSTRUCTIONS, readme
    )
}
