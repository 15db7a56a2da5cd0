//! Remove whole README sections that never describe architecture.

use super::{heading_matches, normalize_heading, parse_heading, Fences};

/// Headings whose sections are dropped, matched as whole words.
const DENIED_HEADINGS: &[&str] = &[
    // legal
    "license",
    "licence",
    "licensing",
    "legal",
    "copyright",
    // community
    "contributing",
    "contribute",
    "contributors",
    "contribution",
    "contributions",
    "code of conduct",
    "acknowledgements",
    "acknowledgments",
    "acknowledgement",
    "acknowledgment",
    "credits",
    // money
    "sponsor",
    "sponsors",
    "sponsorship",
    "donate",
    "donation",
    "donations",
    "support",
    "funding",
    "backers",
    // history
    "changelog",
    "change log",
    "release notes",
    "version history",
];

pub fn is_denied_heading(heading: &str) -> bool {
    heading_matches(&normalize_heading(heading), DENIED_HEADINGS)
}

/// Drop every section whose heading is denied. A section runs until the next
/// heading of the same or a higher level.
pub fn remove_denied_sections(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut skipping_level: Option<usize> = None;
    let mut fences = Fences::default();

    for line in text.lines() {
        let in_code = fences.observe(line);
        if !in_code {
            if let Some((level, heading)) = parse_heading(line) {
                if skipping_level.is_some_and(|skip| level <= skip) {
                    skipping_level = None;
                }
                if skipping_level.is_none() && is_denied_heading(heading) {
                    skipping_level = Some(level);
                }
            }
        }
        if skipping_level.is_none() {
            kept.push(line);
        }
    }

    kept.join("\n")
}
