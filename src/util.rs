/// Declare a lazily compiled, process-wide regex behind a getter function.
macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static ::regex::Regex {
            static RE: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            RE.get_or_init(|| ::regex::Regex::new($pattern).expect("static regex pattern"))
        }
    };
}
pub(crate) use static_regex;

/// Truncate a string to `max_chars` characters (Unicode-safe), borrowing.
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Bounded preview of untrusted text for logs and error messages.
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", truncate_str(s, max_chars))
    }
}

/// Cut text to at most `max` characters, preferring the last whole-word
/// boundary, and mark the cut with `...`. The result never exceeds `max`.
pub fn truncate_at_word(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }

    let head = truncate_str(s, max - 3);
    let cut = match head.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &head[..idx],
        _ => head,
    };
    format!("{}...", cut.trim_end())
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
