use super::Fences;

/// Trim every line, drop horizontal rules, collapse blank runs to a single
/// blank line and trim the document. Lines inside fenced code blocks keep
/// their indentation and only lose trailing whitespace.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = true;
    let mut fences = Fences::default();

    for raw in text.lines() {
        if fences.observe(raw) {
            let line = raw.trim_end();
            out.push(if line.trim().is_empty() { "" } else { line });
            previous_blank = line.trim().is_empty();
            continue;
        }
        let line = raw.trim();
        if is_horizontal_rule(line) {
            continue;
        }
        if line.is_empty() {
            if !previous_blank {
                out.push("");
            }
            previous_blank = true;
        } else {
            out.push(line);
            previous_blank = false;
        }
    }

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// `---`, `***`, `___` and their spaced variants.
pub fn is_horizontal_rule(line: &str) -> bool {
    let mut marker = None;
    let mut count = 0;
    for c in line.chars() {
        match c {
            ' ' | '\t' => continue,
            '-' | '*' | '_' => {
                if marker.is_some_and(|m| m != c) {
                    return false;
                }
                marker = Some(c);
                count += 1;
            }
            _ => return false,
        }
    }
    count >= 3
}
