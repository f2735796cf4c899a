//! Location of the target script inside a host document.
//!
//! The host is an HTML page. Only inline `<script>` bodies are considered; a
//! script element that references an external file through `src` has no body
//! worth deobfuscating. Script bodies are raw text in HTML, so no entity
//! decoding is applied.

use std::sync::LazyLock;

use regex::Regex;

/// Marker substring that identifies obfuscated script bodies.
pub const DEFAULT_MARKER: &str = "_0x";

static SCRIPT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("valid script pattern")
});

static SRC_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s)src\s*=").expect("valid src pattern"));

/// Iterates over the bodies of all inline script elements, in document order.
pub fn inline_scripts(document: &str) -> impl Iterator<Item = &str> {
    SCRIPT_ELEMENT
        .captures_iter(document)
        .filter(|caps| {
            caps.get(1)
                .map_or(true, |attrs| !SRC_ATTRIBUTE.is_match(attrs.as_str()))
        })
        .filter_map(|caps| caps.get(2))
        .map(|body| body.as_str())
}

/// Returns the first inline script whose text contains `marker`.
///
/// # Arguments
///
/// * `document` - The host document.
/// * `marker` - Substring identifying an obfuscated script.
///
/// # Returns
///
/// The script body, or `None` if no inline script qualifies.
#[must_use]
pub fn find_target_script<'a>(document: &'a str, marker: &str) -> Option<&'a str> {
    inline_scripts(document).find(|body| !body.is_empty() && body.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_marked_inline_script() {
        let document = r#"
            <html><head>
            <script src="_0xlib.js"></script>
            <script>var plain = 1;</script>
            <SCRIPT type="text/javascript">var _0x1 = ["a"];</SCRIPT>
            <script>var _0x2 = ["b"];</script>
            </head></html>
        "#;

        assert_eq!(
            find_target_script(document, DEFAULT_MARKER),
            Some(r#"var _0x1 = ["a"];"#)
        );
    }

    #[test]
    fn skips_external_scripts_even_with_marker_in_attributes() {
        let document = r#"<script src="/static/_0xabc.js"></script>"#;
        assert_eq!(find_target_script(document, DEFAULT_MARKER), None);
    }

    #[test]
    fn keeps_markup_inside_script_bodies() {
        let document = "<script>if (a < b) { _0x('&lt;'); }</script>";
        assert_eq!(
            find_target_script(document, DEFAULT_MARKER),
            Some("if (a < b) { _0x('&lt;'); }")
        );
    }

    #[test]
    fn lists_inline_scripts_in_order() {
        let document = "<script>one()</script><p>x</p><script data-x=1>two()</script>";
        let bodies: Vec<&str> = inline_scripts(document).collect();
        assert_eq!(bodies, vec!["one()", "two()"]);
    }
}
