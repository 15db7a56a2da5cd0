//! README reduction
//!
//! Cleans raw README markdown and squeezes it into a character budget before
//! it is embedded in a prompt. Each pass is a separate function over text so
//! it can be tested on its own:
//!
//! 1. [`markup::strip_markup`] - comments, images, badges, layout HTML
//! 2. [`sections::remove_denied_sections`] - license, contributing, sponsors...
//! 3. [`whitespace::normalize_whitespace`] - trim lines, drop rules, collapse blanks
//! 4. [`links::thin_links`] - keep the first few links, flatten the rest
//! 5. [`budget::fit_to_budget`] - priority-aware length reduction

pub mod budget;
pub mod links;
pub mod markup;
pub mod sections;
pub mod whitespace;

use crate::util::char_len;

/// Default character budget for the reduced README.
pub const DEFAULT_MAX_LENGTH: usize = 1200;
/// Number of markdown links kept intact before links are flattened to text.
pub const DEFAULT_INTACT_LINKS: usize = 5;
/// Body text always kept from the top of the document, whatever its section.
pub const DEFAULT_INTRO_BUDGET: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceOptions {
    pub max_length: usize,
    pub intact_links: usize,
    pub intro_budget: usize,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            intact_links: DEFAULT_INTACT_LINKS,
            intro_budget: DEFAULT_INTRO_BUDGET,
        }
    }
}

/// Reduce a README to at most `max_length` characters.
pub fn reduce(raw: &str, max_length: usize) -> String {
    reduce_with(
        raw,
        &ReduceOptions {
            max_length,
            ..ReduceOptions::default()
        },
    )
}

pub fn reduce_with(raw: &str, options: &ReduceOptions) -> String {
    let text = markup::strip_markup(raw);
    let text = sections::remove_denied_sections(&text);
    let text = whitespace::normalize_whitespace(&text);
    let text = links::thin_links(&text, options.intact_links);
    let text = budget::fit_to_budget(&text, options.max_length, options.intro_budget);
    debug_assert!(char_len(&text) <= options.max_length);
    text
}

/// Parse an ATX heading (`## Title ##`) into its level and text.
pub(crate) fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim_end();
    Some((level, text))
}

/// Lowercase a heading and reduce it to space-separated alphanumeric words,
/// so `"🚀 Getting-Started!"` becomes `"getting started"`.
pub(crate) fn normalize_heading(text: &str) -> String {
    let lowered: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-word phrase match against a normalized heading.
pub(crate) fn heading_matches(normalized: &str, phrases: &[&str]) -> bool {
    let padded = format!(" {} ", normalized);
    phrases
        .iter()
        .any(|phrase| padded.contains(&format!(" {} ", phrase)))
}

/// Tracks fenced code blocks while walking lines.
#[derive(Debug, Default)]
pub(crate) struct Fences {
    open: Option<&'static str>,
}

impl Fences {
    /// Returns true when `line` is a fence delimiter or sits inside a fence.
    pub(crate) fn observe(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let marker = if trimmed.starts_with("```") {
            Some("```")
        } else if trimmed.starts_with("~~~") {
            Some("~~~")
        } else {
            None
        };

        match (self.open, marker) {
            (None, Some(m)) => {
                self.open = Some(m);
                true
            }
            (Some(open), Some(m)) if open == m => {
                self.open = None;
                true
            }
            (Some(_), _) => true,
            (None, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_heading() {
        assert_eq!(parse_heading("# Title"), Some((1, "Title")));
        assert_eq!(parse_heading("### Usage ###"), Some((3, "Usage")));
        assert_eq!(parse_heading("  ## Indented"), Some((2, "Indented")));
        assert_eq!(parse_heading("#hashtag"), None);
        assert_eq!(parse_heading("####### seven"), None);
        assert_eq!(parse_heading("plain text"), None);
    }

    #[test]
    fn test_normalize_heading_strips_symbols() {
        assert_eq!(normalize_heading("🚀 Getting-Started!"), "getting started");
        assert_eq!(normalize_heading("  FAQ  "), "faq");
    }

    #[test]
    fn test_heading_matches_whole_words_only() {
        assert!(heading_matches("platform support", &["support"]));
        assert!(!heading_matches("supported platforms", &["support"]));
        assert!(heading_matches("code of conduct", &["code of conduct"]));
    }

    #[test]
    fn test_fences_track_code_blocks() {
        let mut fences = Fences::default();
        assert!(!fences.observe("text"));
        assert!(fences.observe("```bash"));
        assert!(fences.observe("# not a heading"));
        assert!(fences.observe("```"));
        assert!(!fences.observe("# heading"));
    }

    #[test]
    fn test_reduce_never_exceeds_budget() {
        let long_line = "word ".repeat(400);
        let inputs = [
            String::new(),
            "# Title".to_string(),
            format!("# Title\n\n{}", long_line),
            format!("{}\n## Usage\n{}\n## FAQ\n{}", long_line, long_line, long_line),
            "x".repeat(5000),
            "# a\n".repeat(800),
            "é".repeat(3000),
        ];
        for input in &inputs {
            for max in [0, 1, 3, 10, 50, 200, 1200] {
                let out = reduce(input, max);
                assert!(
                    char_len(&out) <= max,
                    "reduce produced {} chars for budget {}",
                    char_len(&out),
                    max
                );
            }
        }
    }

    #[test]
    fn test_reduce_keeps_headings_of_small_documents() {
        let readme = "# Project\n\nA tool.\n\n## Installation\n\ncargo install project\n\n## Usage\n\nproject run\n";
        let out = reduce(readme, DEFAULT_MAX_LENGTH);
        assert!(out.contains("# Project"));
        assert!(out.contains("## Installation"));
        assert!(out.contains("## Usage"));
    }

    #[test]
    fn test_reduce_title_and_badge_only() {
        let readme = "# Tiny\n\n[![Build](https://img.shields.io/badge/build-passing-green.svg)](https://ci.example.com)\n";
        assert_eq!(reduce(readme, DEFAULT_MAX_LENGTH), "# Tiny");
    }

    #[test]
    fn test_reduce_full_pipeline() {
        let readme = r#"<!-- generated -->
<div align="center">
  <img src="logo.png" width="120">
  <h1>Widget</h1>
</div>

[![CI](https://github.com/acme/widget/actions/workflows/ci.yml/badge.svg)](https://github.com/acme/widget/actions)

Widget turns gadgets into widgets.



---

## Features

- Fast
- Small

## License

MIT, see [LICENSE](LICENSE).

## Contributing

PRs welcome.
"#;
        let out = reduce(readme, DEFAULT_MAX_LENGTH);
        assert_eq!(
            out,
            "# Widget\n\nWidget turns gadgets into widgets.\n\n## Features\n\n- Fast\n- Small"
        );
    }
}
