//! HTML-to-text sanitization for raw export documents.
//!
//! The export format only uses a handful of entities and whitespace-producing
//! tags, so this is a fixed substitution table plus tag stripping rather than
//! a general HTML parser.

use once_cell::sync::Lazy;
use regex::Regex;

static BR_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid br tag regex"));
static P_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<p\b[^>]*>").expect("valid p tag regex"));
static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

enum Pattern {
    Literal(&'static str),
    Regex(&'static Lazy<Regex>),
}

// Applied in order. `&amp;` runs last so decoded ampersands cannot form new
// entities for the earlier rules.
static PRE_STRIP_RULES: Lazy<Vec<(Pattern, &'static str)>> = Lazy::new(|| {
    vec![
        (Pattern::Literal("&ensp;"), " "),
        (Pattern::Literal("&quot;"), "\""),
        (Pattern::Regex(&BR_TAG_RE), "\n"),
        (Pattern::Regex(&P_TAG_RE), "\n\n"),
        (Pattern::Literal("&amp;"), "&"),
    ]
});

const POST_STRIP_RULES: &[(&str, &str)] = &[("&#39;", "'"), ("&#34;", "\"")];

/// Converts raw document text into plain text terminated by one newline.
pub fn sanitize_document(raw: &str) -> String {
    let mut text = raw.to_string();

    for (pattern, replacement) in PRE_STRIP_RULES.iter() {
        text = match pattern {
            Pattern::Literal(needle) => text.replace(needle, replacement),
            Pattern::Regex(re) => re.replace_all(&text, *replacement).into_owned(),
        };
        text = trim_blank(&text).to_string();
    }

    text = ANY_TAG_RE.replace_all(&text, "").into_owned();
    text = trim_blank(&text).to_string();

    for (needle, replacement) in POST_STRIP_RULES {
        text = text.replace(needle, replacement);
        text = trim_blank(&text).to_string();
    }

    text.push('\n');
    text
}

fn trim_blank(value: &str) -> &str {
    value.trim_matches(|c| c == ' ' || c == '\n')
}
