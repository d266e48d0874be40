//! Inline stylesheet sanitization
//!
//! `style` attribute values are attacker controlled and browsers have a long
//! history of executing script from CSS (`expression()`, `-o-link`, behaviour
//! bindings) or of fetching from it (`url()`, `image()`). This module first
//! normalizes a value until every escape and lookalike that a legacy engine
//! would have read as ASCII is visible, then rejects anything that still
//! matches a known-dangerous construct.
//!
//! Normalization order matters: character references are decoded before CSS
//! escapes, and comments are stripped after both because either decode step
//! can produce a comment.

use regex::{Captures, Regex};

use crate::entities::{decode_char_references, UTF8_REPLACEMENT};

/// Replacement for values containing control characters
pub const INVALID_CSS_MARKER: &str = "/* invalid control char */";
/// Replacement for values containing script-triggering constructs
pub const INSECURE_CSS_MARKER: &str = "/* insecure input */";

/// Upper bound on normalization passes before a value is declared invalid
const MAX_NORMALIZE_PASSES: usize = 8;

lazy_static::lazy_static! {
    /// CSS 2.1 escapes (appendix D of the CSS 2 grammar):
    /// 1. line continuation, 2. hex codepoint with optional trailing space,
    /// 3. escaped single char, 4. backslash at end of input
    static ref CSS_DECODE_RE: Regex = Regex::new(
        r"\\(?:(\n|\r\n|\r|\x0C)|([0-9A-Fa-f]{1,6})[ \t\r\n\x0C]?|(.)|()$)"
    ).unwrap();

    static ref FULLWIDTH_RE: Regex = Regex::new(r"[\x{FF00}-\x{FFEF}]").unwrap();

    static ref LOOKALIKE_RE: Regex = Regex::new(
        r"[\x{0280}\x{0274}\x{207F}\x{029F}\x{026A}\x{207D}\x{208D}]"
    ).unwrap();

    static ref COMMENT_RE: Regex = Regex::new(
        r"/\*[^\n\r\x{2028}\x{2029}]*\*/"
    ).unwrap();

    static ref TRAILING_SINGLE_QUOTE_RE: Regex = Regex::new(r"'([^'\n\r\x0C]*)$").unwrap();
    static ref TRAILING_DOUBLE_QUOTE_RE: Regex = Regex::new(r#""([^"\n\r\x0C]*)$"#).unwrap();

    /// `s` followed by a repeat, iteration or prolonged sound mark
    static ref S_ITERATION_RE: Regex = Regex::new(
        r"[sS][\x{3031}\x{309D}\x{30FC}\x{30FD}\x{FE7C}\x{FE7D}\x{FF70}]"
    ).unwrap();

    static ref CONTROL_CHAR_RE: Regex = Regex::new(r"[\x00-\x08\x0B\x0E-\x1F\x7F]").unwrap();

    static ref INSECURE_CSS_RE: Regex = Regex::new(concat!(
        r"(?i)expression",
        r"|filter\s*:",
        r"|accelerator\s*:",
        r"|-o-link\s*:",
        r"|-o-link-source\s*:",
        r"|-o-replace\s*:",
        r"|url\s*\(",
        r"|image\s*\(",
        r"|image-set\s*\(",
        r"|attr\s*\([^)]+[\s,]+url",
    )).unwrap();
}

/// Result of checking an inline style value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssVerdict {
    /// The normalized value, safe to emit
    Clean(String),
    /// Contained a control character or an undecodable codepoint
    Invalid,
    /// Matched a script-triggering or resource-loading construct
    Insecure,
}

impl CssVerdict {
    pub fn is_clean(&self) -> bool {
        matches!(self, CssVerdict::Clean(_))
    }

    /// The value to emit in place of the original
    pub fn into_string(self) -> String {
        match self {
            CssVerdict::Clean(text) => text,
            CssVerdict::Invalid => INVALID_CSS_MARKER.to_string(),
            CssVerdict::Insecure => INSECURE_CSS_MARKER.to_string(),
        }
    }
}

fn decode_css_escape(caps: &Captures) -> String {
    let c = if let Some(hex) = caps.get(2) {
        u32::from_str_radix(hex.as_str(), 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(UTF8_REPLACEMENT)
    } else if let Some(escaped) = caps.get(3) {
        match escaped.as_str().chars().next() {
            Some(c) => c,
            None => return String::new(),
        }
    } else {
        // Line continuation, or a backslash at end of input.
        return String::new();
    };

    // Re-escape anything that could reopen or close a string context.
    if matches!(c, '\n' | '"' | '\'' | '\\') {
        format!("\\{:x} ", c as u32)
    } else {
        c.to_string()
    }
}

fn normalize_fullwidth(caps: &Captures) -> String {
    let u = caps[0].chars().next().unwrap_or(' ');
    if u == '\u{FF3C}' {
        // FULLWIDTH REVERSE SOLIDUS stays; folding it would mint a backslash.
        return u.to_string();
    }
    char::from_u32(u as u32 - 0xFEE0).unwrap_or(u).to_string()
}

fn normalize_lookalike(caps: &Captures) -> &'static str {
    match &caps[0] {
        "\u{0280}" => "r",
        "\u{0274}" => "n",
        "\u{207F}" => "n",
        "\u{029F}" => "l",
        "\u{026A}" => "i",
        "\u{207D}" => "(",
        "\u{208D}" => "(",
        _ => "",
    }
}

fn remove_mismatched_quote(text: String, quote: char, trailing: &Regex) -> String {
    if text.matches(quote).count() % 2 == 0 {
        return text;
    }
    trailing.replace(&text, " $1").into_owned()
}

/// Normalize a CSS value so that what a lenient or legacy client would see is
/// what the dangerous-construct check sees.
pub fn normalize_css(text: &str) -> String {
    let text = decode_char_references(text);
    let text = CSS_DECODE_RE.replace_all(&text, decode_css_escape);
    let text = FULLWIDTH_RE.replace_all(&text, normalize_fullwidth);
    let text = LOOKALIKE_RE.replace_all(&text, normalize_lookalike);

    // Replace rather than delete so the halves can't splice into one token.
    let text = COMMENT_RE.replace_all(&text, " ").into_owned();

    let text = remove_mismatched_quote(text, '\'', &TRAILING_SINGLE_QUOTE_RE);
    let mut text = remove_mismatched_quote(text, '"', &TRAILING_DOUBLE_QUOTE_RE);

    // Some clients never close an unterminated comment.
    if let Some(pos) = text.find("/*") {
        text.truncate(pos);
    }

    S_ITERATION_RE.replace_all(&text, "ss").into_owned()
}

// Normalization can expose new references or escapes (`&amp;lt;`), so repeat
// until the value is stable.
fn normalize_to_fixpoint(text: &str) -> Option<String> {
    let mut current = normalize_css(text);
    for _ in 0..MAX_NORMALIZE_PASSES {
        let next = normalize_css(&current);
        if next == current {
            return Some(current);
        }
        current = next;
    }
    None
}

/// Normalize and classify a style value
pub fn analyze_css(text: &str) -> CssVerdict {
    if text == INVALID_CSS_MARKER {
        return CssVerdict::Invalid;
    }
    if text == INSECURE_CSS_MARKER {
        return CssVerdict::Insecure;
    }

    let normalized = match normalize_to_fixpoint(text) {
        Some(normalized) => normalized,
        None => {
            tracing::debug!("CSS value did not stabilize after {} passes", MAX_NORMALIZE_PASSES);
            return CssVerdict::Invalid;
        }
    };

    if CONTROL_CHAR_RE.is_match(&normalized) || normalized.contains(UTF8_REPLACEMENT) {
        CssVerdict::Invalid
    } else if INSECURE_CSS_RE.is_match(&normalized) {
        CssVerdict::Insecure
    } else {
        CssVerdict::Clean(normalized)
    }
}

/// Sanitize a style attribute value: the normalized value, or one of the
/// fixed marker comments when it must be rejected.
pub fn check_css(text: &str) -> String {
    analyze_css(text).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_values_untouched() {
        assert_eq!(check_css("color: red; margin: 0 auto"), "color: red; margin: 0 auto");
        assert_eq!(check_css(""), "");
    }

    #[test]
    fn test_expression_rejected() {
        assert_eq!(check_css("width: expression(alert(1))"), INSECURE_CSS_MARKER);
        assert_eq!(check_css("WIDTH: EXPRESSION(alert(1))"), INSECURE_CSS_MARKER);
    }

    #[test]
    fn test_disallowed_constructs() {
        for value in [
            "background: url(http://example.org/x.png)",
            "background: URL (x)",
            "filter : alpha(opacity=50)",
            "accelerator: true",
            "-o-link: 'javascript:alert(1)'",
            "-o-link-source: current",
            "-o-replace: x",
            "background-image: image(foo.png)",
            "background-image: image-set(foo.png 1x)",
            "content: attr(title, url)",
        ] {
            assert_eq!(check_css(value), INSECURE_CSS_MARKER, "{}", value);
        }
    }

    #[test]
    fn test_escaped_constructs_rejected() {
        // \75 rl( and u&#x72;l( decode to url(
        assert_eq!(check_css(r"background: \75 rl(x)"), INSECURE_CSS_MARKER);
        assert_eq!(check_css("background: u&#x72;l(x)"), INSECURE_CSS_MARKER);
        assert_eq!(check_css(r"x: e\xpression(1)"), INSECURE_CSS_MARKER);
        // comment splitting the keyword
        assert_eq!(check_css("x: expr/**/ession(1)"), "x: expr ession(1)");
        // fullwidth and lookalike letters
        assert_eq!(check_css("background: ｕｒｌ(x)"), INSECURE_CSS_MARKER);
        assert_eq!(check_css("background: u\u{0280}l(x)"), INSECURE_CSS_MARKER);
        assert_eq!(check_css("background: url\u{207D}x)"), INSECURE_CSS_MARKER);
    }

    #[test]
    fn test_control_chars_rejected() {
        assert_eq!(check_css("color: red\u{0001}"), INVALID_CSS_MARKER);
        assert_eq!(check_css(r"color: \0 red"), INVALID_CSS_MARKER);
        assert_eq!(check_css("color: &#0;"), INVALID_CSS_MARKER);
        assert_eq!(check_css(r"color: \110000 red"), INVALID_CSS_MARKER);
    }

    #[test]
    fn test_comment_replaced_not_deleted() {
        assert_eq!(normalize_css("fo/*x*/o"), "fo o");
    }

    #[test]
    fn test_unterminated_comment_truncates() {
        assert_eq!(normalize_css("color: red; /* open"), "color: red; ");
    }

    #[test]
    fn test_unbalanced_quote_repair() {
        let out = normalize_css("background: url('unterminated)");
        assert_eq!(out, "background: url( unterminated)");
        assert_eq!(out.matches('\'').count() % 2, 0);

        assert_eq!(normalize_css(r#"font-family: "a" "b"#), r#"font-family: "a"  b"#);
        assert_eq!(normalize_css("content: 'ok'"), "content: 'ok'");
    }

    #[test]
    fn test_escape_decoding() {
        assert_eq!(normalize_css(r"\41 BC"), "ABC");
        assert_eq!(normalize_css(r"\62 lue"), "blue");
        assert_eq!(normalize_css(r"co\lor"), "color");
        assert_eq!(normalize_css("a\\\nb"), "ab");
        assert_eq!(normalize_css("a\\"), "a");
    }

    #[test]
    fn test_significant_chars_reescaped() {
        assert_eq!(normalize_css(r"content: \27 x\27 "), r"content: \27 x\27 ");
        assert_eq!(normalize_css(r#"content: \""#), r"content: \22 ");
        assert_eq!(normalize_css(r"a\\b"), r"a\5c b");
    }

    #[test]
    fn test_fullwidth_normalization() {
        assert_eq!(normalize_css("ｃｏｌｏｒ"), "color");
        assert_eq!(normalize_css("\u{FF3C}"), "\u{FF3C}");
    }

    #[test]
    fn test_s_iteration_marks() {
        assert_eq!(normalize_css("s\u{30FC}"), "ss");
        assert_eq!(normalize_css("S\u{309D}"), "ss");
    }

    #[test]
    fn test_check_is_idempotent() {
        for value in [
            "color: red",
            "width: expression(alert(1))",
            "color: red\u{0001}",
            "fo/*x*/o",
            "background: url('unterminated)",
            "a: '/*'",
            r"content: \27 x",
            "&amp;lt;b&amp;gt;",
            "&amp;#x75;rl(x)",
            "ｕｒｌ",
            "x: \"y",
        ] {
            let once = check_css(value);
            assert_eq!(check_css(&once), once, "{:?}", value);
        }
    }

    #[test]
    fn test_verdict() {
        assert!(analyze_css("color: red").is_clean());
        assert_eq!(analyze_css("url(x)"), CssVerdict::Insecure);
        assert_eq!(analyze_css(INVALID_CSS_MARKER), CssVerdict::Invalid);
    }
}
