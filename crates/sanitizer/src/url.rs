//! URL sanitization for `href` and `src`
//!
//! A URL is decoded, split into protocol, host and path, and rebuilt after the
//! protocol has been checked against the site's allow-list and the host has
//! been stripped of characters that render invisibly (IDN homograph tricks).

use std::borrow::Cow;

use regex::{Captures, Regex};
use sanitas_security::ProtocolValidator;

use crate::entities::decode_char_references;

lazy_static::lazy_static! {
    /// Optional `scheme:` and/or `//`, then the host up to the first `/`,
    /// then the rest
    static ref URL_PARTS_RE: Regex = Regex::new(
        r"(?s)^((?:[a-zA-Z][^:/]*:)?(?://)?)([^/]+)(/?.*)"
    ).unwrap();

    /// A scheme at the very start, whether or not the split pattern
    /// attributes it to the protocol
    static ref LEADING_SCHEME_RE: Regex = Regex::new(r"^[a-zA-Z][^:/]*:").unwrap();

    static ref IDN_RE: Regex = Regex::new(concat!(
        r"[\t ]",          // general whitespace
        r"|\x{00AD}",      // SOFT HYPHEN
        r"|\x{1806}",      // MONGOLIAN TODO SOFT HYPHEN
        r"|\x{200B}",      // ZERO WIDTH SPACE
        r"|\x{2060}",      // WORD JOINER
        r"|\x{FEFF}",      // ZERO WIDTH NO-BREAK SPACE
        r"|\x{034F}",      // COMBINING GRAPHEME JOINER
        r"|\x{180B}",      // MONGOLIAN FREE VARIATION SELECTOR ONE
        r"|\x{180C}",      // MONGOLIAN FREE VARIATION SELECTOR TWO
        r"|\x{180D}",      // MONGOLIAN FREE VARIATION SELECTOR THREE
        r"|\x{200C}",      // ZERO WIDTH NON-JOINER
        r"|\x{200D}",      // ZERO WIDTH JOINER
        r"|[\x{FE00}-\x{FE0F}]", // VARIATION SELECTOR-1..16
    )).unwrap();

    static ref IPV6_HOST_RE: Regex = Regex::new(
        r"^%5B([0-9A-Fa-f:.]+)%5D((:[0-9]+)?)$"
    ).unwrap();
}

fn is_url_unsafe(c: char) -> bool {
    matches!(c, '[' | ']' | '<' | '>' | '"' | '|' | '\u{00}'..='\u{20}' | '\u{7F}')
}

/// Percent-encode brackets, angle brackets, quotes, pipes, spaces and
/// control characters. Everything else, including non-ASCII, is left alone.
pub fn encode_unsafe_url_chars(href: &str) -> Cow<'_, str> {
    if !href.chars().any(is_url_unsafe) {
        return Cow::Borrowed(href);
    }
    let mut out = String::with_capacity(href.len() + 8);
    for c in href.chars() {
        if is_url_unsafe(c) {
            out.push_str(percent_encoding::percent_encode_byte(c as u8));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Remove invisible characters usable for hostname spoofing
pub fn strip_idns(host: &str) -> Cow<'_, str> {
    IDN_RE.replace_all(host, "")
}

/// Clean a link target.
///
/// Returns `None` when the URL carries a protocol the validator rejects; the
/// caller should drop the attribute. Otherwise returns the decoded, encoded
/// and host-normalized URL.
pub fn clean_url<V: ProtocolValidator + ?Sized>(href: &str, validator: &V) -> Option<String> {
    let href = decode_char_references(href);
    let href = encode_unsafe_url_chars(&href);

    // `javascript:/x` and `javascript:///x` split with an empty protocol,
    // so the leading scheme (with any `//`) is validated on its own as well.
    if let Some(scheme) = LEADING_SCHEME_RE.find(&href) {
        let end = if (*href)[scheme.end()..].starts_with("//") {
            scheme.end() + 2
        } else {
            scheme.end()
        };
        let leading = &(*href)[..end];
        if !validator.is_valid_protocol(leading) {
            tracing::debug!("Rejecting URL with disallowed scheme {:?}", leading);
            return None;
        }
    }

    let caps = match URL_PARTS_RE.captures(&href) {
        Some(caps) => caps,
        None => return Some(href.into_owned()),
    };

    let proto = caps.get(1).map_or("", |m| m.as_str());
    if !proto.is_empty() && !validator.is_valid_protocol(proto) {
        tracing::debug!("Rejecting URL with disallowed protocol {:?}", proto);
        return None;
    }

    let host = strip_idns(caps.get(2).map_or("", |m| m.as_str()));
    let host = IPV6_HOST_RE.replace(&host, |c: &Captures| format!("[{}]{}", &c[1], &c[2]));
    let path = caps.get(3).map_or("", |m| m.as_str());

    Some(format!("{}{}{}", proto, host, path))
}
