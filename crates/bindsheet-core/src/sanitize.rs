use std::borrow::Cow;

/// Normalizes a mapping value for embedding as SVG element content.
///
/// Existing entity references are decoded first, then the five XML-sensitive characters are
/// escaped again. A value that already reads `&amp;` therefore stays `&amp;` instead of turning
/// into `&amp;amp;`.
pub fn sanitize_value(raw: &str) -> String {
    let decoded: Cow<'_, str> = if raw.contains('&') {
        htmlize::unescape(raw)
    } else {
        Cow::Borrowed(raw)
    };
    escape_xml(&decoded)
}

/// Escapes `&`, `<`, `>`, `"` and `'` into their predefined XML entities.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
