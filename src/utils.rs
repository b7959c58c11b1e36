//! Text normalization helpers shared by the preparation stages.

use regex::Regex;
use std::sync::LazyLock;

static CODE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre\b[^>]*>.*?</pre\s*>|<code\b[^>]*>.*?</code\s*>")
        .expect("code block pattern")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?[a-z][^>]*>").expect("markup tag pattern"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S*").expect("link pattern"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)&(?:[a-z][a-z0-9]*|#[0-9]+|#x[0-9a-f]+);").expect("entity pattern")
});

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Normalize raw question/answer markup into plain matching text.
///
/// Removes code blocks, markup tags, links, and character entities, lowercases,
/// and collapses whitespace. Each removal leaves a space behind so neighbouring
/// fragments never fuse, which keeps the function idempotent. Returns an empty
/// string when no alphanumeric character survives.
pub fn normalize_text(raw: &str) -> String {
    let text = CODE_BLOCK_RE.replace_all(raw, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = LINK_RE.replace_all(&text, " ");
    let text = ENTITY_RE.replace_all(&text, " ");
    let normalized = normalize_inline_whitespace(text.to_lowercase());
    if normalized.chars().any(char::is_alphanumeric) {
        normalized
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_inline_whitespace_collapses_runs() {
        let input = "Alpha\n\n  Beta\tGamma";
        assert_eq!(normalize_inline_whitespace(input), "Alpha Beta Gamma");
    }

    #[test]
    fn normalize_text_strips_code_markup_and_links() {
        let raw = "<p>How do I <b>sort</b> a list?</p>\n<pre><code>xs.sort()\nprint(xs)</code></pre>\
                   See https://example.com/docs?q=1 and www.example.org &amp; more";
        assert_eq!(
            normalize_text(raw),
            "how do i sort a list? see and more"
        );
    }

    #[test]
    fn normalize_text_removes_multiline_inline_code() {
        let raw = "Use <CODE class=\"x\">let a =\n 1;</CODE> here";
        assert_eq!(normalize_text(raw), "use here");
    }

    #[test]
    fn normalize_text_returns_empty_when_nothing_meaningful_remains() {
        assert_eq!(normalize_text("<pre>only code</pre>"), "");
        assert_eq!(normalize_text("  <br/> ... !! &nbsp; "), "");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn normalize_text_keeps_comparison_operators_that_are_not_tags() {
        assert_eq!(normalize_text("Is 1 < 2 > 0?"), "is 1 < 2 > 0?");
    }

    #[test]
    fn normalize_text_drops_bare_schemes_left_by_anchor_tags() {
        assert_eq!(normalize_text("<a href='x'>http://</a>q"), "q");
        assert_eq!(normalize_text("see https:// for docs"), "see for docs");
    }

    #[test]
    fn normalize_text_is_idempotent() {
        let inputs = [
            "<p>Hello   <i>World</i></p>",
            "<<b>a> tag soup </b",
            "hthttp://x.y/zttp://a b",
            "&am&amp;p; entities &#39; &#x27;",
            "MiXeD Case\twith\nnewlines",
            "Is 1 < 2 > 0?",
            "<pre>code</pre>tail",
        ];
        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "not idempotent for {input:?}");
        }
    }
}
