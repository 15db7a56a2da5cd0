//! Priority-aware length reduction.
//!
//! Headings always survive. The first few hundred characters of body text
//! survive whatever section they are in. After that, body lines from
//! high-priority sections (install, usage, features...) are accepted before
//! lines from ordinary sections, and low-priority sections (FAQ, tests,
//! roadmap...) only contribute through the intro allowance.

use super::{heading_matches, normalize_heading, parse_heading, Fences};
use crate::util::{char_len, truncate_at_word};

const HIGH_PRIORITY: &[&str] = &[
    "install",
    "installation",
    "installing",
    "usage",
    "use",
    "feature",
    "features",
    "getting started",
    "get started",
    "quick start",
    "quickstart",
    "overview",
    "about",
];

const LOW_PRIORITY: &[&str] = &[
    "faq",
    "faqs",
    "troubleshoot",
    "troubleshooting",
    "test",
    "tests",
    "testing",
    "development",
    "developing",
    "roadmap",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Normal,
    Low,
}

pub fn classify_heading(heading: &str) -> Priority {
    let normalized = normalize_heading(heading);
    if heading_matches(&normalized, HIGH_PRIORITY) {
        Priority::High
    } else if heading_matches(&normalized, LOW_PRIORITY) {
        Priority::Low
    } else {
        Priority::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Heading,
    Blank,
    Body(Priority),
}

fn classify_lines(lines: &[&str]) -> Vec<LineKind> {
    let mut kinds = Vec::with_capacity(lines.len());
    let mut current = Priority::Normal;
    let mut fences = Fences::default();

    for line in lines {
        let in_code = fences.observe(line);
        if !in_code {
            if let Some((_, heading)) = parse_heading(line) {
                current = classify_heading(heading);
                kinds.push(LineKind::Heading);
                continue;
            }
        }
        if line.trim().is_empty() {
            kinds.push(LineKind::Blank);
        } else {
            kinds.push(LineKind::Body(current));
        }
    }
    kinds
}

/// Fit `text` into `max_length` characters. Text that already fits is
/// returned unchanged.
pub fn fit_to_budget(text: &str, max_length: usize, intro_budget: usize) -> String {
    if char_len(text) <= max_length {
        return text.to_string();
    }

    let lines: Vec<&str> = text.lines().collect();
    let kinds = classify_lines(&lines);
    let cost = |idx: usize| char_len(lines[idx]) + 1;

    let mut keep = vec![false; lines.len()];
    let mut used = 0usize;
    let mut intro_used = 0usize;

    for (idx, kind) in kinds.iter().enumerate() {
        match kind {
            LineKind::Heading => {
                keep[idx] = true;
                // plus the blank separator emitted before it
                used += cost(idx) + 1;
            }
            LineKind::Body(_) if intro_used < intro_budget => {
                keep[idx] = true;
                used += cost(idx);
                intro_used += char_len(lines[idx]);
            }
            _ => {}
        }
    }

    for wanted in [Priority::High, Priority::Normal] {
        for (idx, kind) in kinds.iter().enumerate() {
            if keep[idx] || *kind != LineKind::Body(wanted) {
                continue;
            }
            let line_cost = cost(idx);
            if used + line_cost > max_length {
                break;
            }
            keep[idx] = true;
            used += line_cost;
        }
    }

    let mut out: Vec<&str> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if !keep[idx] {
            continue;
        }
        if kinds[idx] == LineKind::Heading && !out.is_empty() {
            out.push("");
        }
        out.push(line);
    }

    let reduced = out.join("\n");
    if char_len(&reduced) > max_length {
        truncate_at_word(&reduced, max_length)
    } else {
        reduced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(tag: &str, n: usize) -> String {
        (0..n)
            .map(|i| format!("{tag} line {i} with some words."))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_classify_heading() {
        assert_eq!(classify_heading("Quick Start"), Priority::High);
        assert_eq!(classify_heading("⚙️ Installation"), Priority::High);
        assert_eq!(classify_heading("Running the tests"), Priority::Low);
        assert_eq!(classify_heading("Roadmap"), Priority::Low);
        assert_eq!(classify_heading("Architecture"), Priority::Normal);
    }

    #[test]
    fn test_text_within_budget_is_unchanged() {
        let text = "# A\n\nbody";
        assert_eq!(fit_to_budget(text, 100, 400), text);
    }

    #[test]
    fn test_prefers_high_priority_sections() {
        let text = format!(
            "# Tool\n{}\n## Design\n{}\n## Usage\n{}\n## FAQ\n{}",
            sentence("intro", 2),
            sentence("design", 10),
            sentence("usage", 4),
            sentence("faq", 10),
        );
        let out = fit_to_budget(&text, 400, 60);
        assert!(out.contains("usage line 3"), "{out}");
        assert!(!out.contains("faq line"), "{out}");
        assert!(out.contains("## FAQ"));
        assert!(out.contains("## Design"));
        assert!(char_len(&out) <= 400);
    }

    #[test]
    fn test_intro_survives_even_in_low_priority_section() {
        let text = format!("## Tests\n{}\n## Usage\n{}", sentence("t", 3), sentence("u", 40));
        let out = fit_to_budget(&text, 300, 50);
        assert!(out.contains("t line 0"));
        assert!(out.contains("t line 1"));
    }

    #[test]
    fn test_headings_kept_when_they_fit() {
        let text = format!(
            "# One\n{}\n## Two\n{}\n## Three\n{}",
            sentence("a", 30),
            sentence("b", 30),
            sentence("c", 30)
        );
        let out = fit_to_budget(&text, 500, 100);
        for heading in ["# One", "## Two", "## Three"] {
            assert!(out.contains(heading), "missing {heading} in {out}");
        }
    }

    #[test]
    fn test_oversized_output_is_cut_on_word_boundary() {
        let text = format!("# Title\n{}", "lorem ipsum ".repeat(100));
        let out = fit_to_budget(&text, 80, 400);
        assert!(char_len(&out) <= 80);
        assert!(out.ends_with("..."));
        assert!(!out.trim_end_matches("...").ends_with(' '));
    }
}
