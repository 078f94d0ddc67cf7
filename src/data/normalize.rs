//! Text normalisation applied to every input before vectorization.
//!
//! Step order is fixed: lowercase, strip URLs, strip mentions and hashtags,
//! collapse whitespace. Changing it changes which tokens the vectorizer sees.

use std::sync::LazyLock;

use regex::Regex;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"http\S+|www\S+").expect("url pattern is valid"));

static MENTION_OR_HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@#]\w+").expect("mention pattern is valid"));

/// Normalise raw text. Pure, total and idempotent.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_urls = URL.replace_all(&lowered, "");
    let without_tags = MENTION_OR_HASHTAG.replace_all(&without_urls, "");
    collapse_whitespace(&without_tags)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
