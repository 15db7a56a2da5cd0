//! Strip markup that carries no information for an architectural summary:
//! comments, images, badges and layout HTML. Text inside layout tags is kept.

use crate::util::static_regex;
use regex::Captures;

/// Hosts and paths that only ever serve status badges.
macro_rules! badge_hosts {
    () => {
        r"(?:shields\.io|badge\.fury\.io|badgen\.net|travis-ci\.(?:org|com)|circleci\.com|codecov\.io|coveralls\.io|app\.codacy\.com|api\.codeclimate\.com|snyk\.io/test|badges\.gitter\.im|readthedocs\.org/projects/[^/\s)]+/badge|badge\.svg|/badges?\.svg)"
    };
}

static_regex!(html_comment, r"(?s)<!--.*?-->");
static_regex!(html_heading, r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>");
static_regex!(
    nested_image_link,
    r"\[\s*!\[[^\]]*\](?:\([^)]*\)|\[[^\]]*\])\s*\](?:\([^)]*\)|\[[^\]]*\])"
);
static_regex!(markdown_image, r"!\[[^\]]*\](?:\([^)]*\)|\[[^\]]*\])");
static_regex!(html_img, r"(?is)<img\b[^>]*>");
static_regex!(
    badge_link,
    concat!(r"(?i)\[[^\]]*\]\(\s*<?[^)\s]*", badge_hosts!(), r"[^)]*\)")
);
static_regex!(
    badge_reference,
    concat!(r"(?im)^[ \t]*\[[^\]]+\]:[ \t]*\S*", badge_hosts!(), r".*$")
);
static_regex!(
    layout_attribute,
    r#"(?i)\s+(?:style|align|width|height)\s*=\s*(?:"[^"]*"|'[^']*')"#
);
static_regex!(
    block_tag,
    r"(?i)</?(?:div|p|br|hr|table|thead|tbody|tfoot|tr|td|th|center|picture|source|details|summary)\b[^>]*?/?>"
);
static_regex!(
    inline_tag,
    r"(?i)</?(?:span|a|b|strong|em|i|kbd|sup|sub|code|small)\b[^>]*?/?>"
);

pub fn strip_markup(text: &str) -> String {
    let text = html_comment().replace_all(text, "");
    let text = html_heading().replace_all(&text, |caps: &Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        let title = caps[2].split_whitespace().collect::<Vec<_>>().join(" ");
        format!("\n{} {}\n", "#".repeat(level), title)
    });
    let text = nested_image_link().replace_all(&text, "");
    let text = markdown_image().replace_all(&text, "");
    let text = html_img().replace_all(&text, "");
    let text = badge_link().replace_all(&text, "");
    let text = badge_reference().replace_all(&text, "");
    let text = layout_attribute().replace_all(&text, "");
    let text = block_tag().replace_all(&text, "\n");
    let text = inline_tag().replace_all(&text, "");
    text.into_owned()
}
