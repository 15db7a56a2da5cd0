use crate::util::static_regex;
use regex::Captures;

static_regex!(
    markdown_link,
    r#"(!?)\[([^\]\[]*)\]\(\s*<?([^)\s>]*)>?(?:\s+"[^"]*")?\s*\)"#
);

/// Keep the first `keep` markdown links intact and rewrite every later link
/// to its display text. Images are left alone.
pub fn thin_links(text: &str, keep: usize) -> String {
    let mut seen = 0usize;
    markdown_link()
        .replace_all(text, |caps: &Captures| {
            if &caps[1] == "!" {
                return caps[0].to_string();
            }
            seen += 1;
            if seen <= keep {
                caps[0].to_string()
            } else {
                caps[2].trim().to_string()
            }
        })
        .into_owned()
}
