use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Markdown file names, optionally with a stray encoded character before the extension.
static MARKDOWN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:%[0-9a-f]{2})?\.(?:md|markdown)$").expect("markdown name pattern")
});

/// Opening of a markdown image or link up to the end of its target.
static LINK_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<open>!?\[[^\]]*\]\()(?P<target>[^)\s]*)").expect("link target pattern")
});

/// One or more `%XX` escapes directly before a path separator.
static ENCODED_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:%[0-9A-Fa-f]{2})+/").expect("encoded segment pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenText {
    pub text: String,
    /// Number of link targets that changed.
    pub references: usize,
}

pub fn is_markdown_name(name: &str) -> bool {
    MARKDOWN_NAME.is_match(name)
}

/// Removes encoded segments from markdown image and link targets in one pass,
/// collapsing `path%2F/rest` to `path/rest`.
///
/// Returns `None` when nothing matched, so callers can skip the write-back.
pub fn rewrite_reference_text(text: &str) -> Option<RewrittenText> {
    let mut references = 0;
    let rewritten = LINK_TARGET.replace_all(text, |caps: &Captures<'_>| {
        let target = &caps["target"];
        if ENCODED_SEGMENT.is_match(target) {
            references += 1;
            format!("{}{}", &caps["open"], ENCODED_SEGMENT.replace_all(target, "/"))
        } else {
            caps[0].to_string()
        }
    });

    if references == 0 {
        return None;
    }
    Some(RewrittenText {
        text: rewritten.into_owned(),
        references,
    })
}
