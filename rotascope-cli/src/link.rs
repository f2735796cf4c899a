//! Packaging of the deobfuscated code into an AST viewer link.
//!
//! The viewer reads the code from the fragment of its own URL, so the link is
//! `file://<viewer path>#<code>` with the code encoded exactly as
//! `encodeURIComponent` would encode it.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters `encodeURIComponent` leaves alone besides ASCII alphanumerics.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes `text` the way `encodeURIComponent` does.
pub fn encode_uri_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}

/// Builds the viewer link for `code`.
pub fn viewer_link(viewer_host_path: &str, code: &str) -> String {
    format!("file://{viewer_host_path}#{}", encode_uri_component(code))
}

/// Returns `true` for POSIX absolute paths and Windows drive paths
/// (`C:\...` or `C:/...`).
pub fn is_absolute_host_path(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }

    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_like_encode_uri_component() {
        assert_eq!(
            encode_uri_component("console.log(\"hi\");\n"),
            "console.log(%22hi%22)%3B%0A"
        );
        assert_eq!(encode_uri_component("a b&c=d/e?f#g"), "a%20b%26c%3Dd%2Fe%3Ff%23g");
        assert_eq!(encode_uri_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(encode_uri_component("\u{e9}\u{1f600}"), "%C3%A9%F0%9F%98%80");
    }

    #[test]
    fn test_viewer_link() {
        assert_eq!(
            viewer_link("/home/me/viewer.html", "f(1);\n"),
            "file:///home/me/viewer.html#f(1)%3B%0A"
        );
    }

    #[test]
    fn test_absolute_paths() {
        assert!(is_absolute_host_path("/srv/viewer.html"));
        assert!(is_absolute_host_path("C:\\Users\\me\\viewer.html"));
        assert!(is_absolute_host_path("d:/viewer.html"));
        assert!(!is_absolute_host_path("viewer.html"));
        assert!(!is_absolute_host_path("./viewer.html"));
        assert!(!is_absolute_host_path("C:viewer.html"));
    }
}
