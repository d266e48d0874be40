//! Escaping for `id` attributes and section anchors

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use crate::entities::decode_char_references;

/// Bytes left alone when encoding an id: ASCII letters, digits, `-`, `_`, `.`
const ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

lazy_static::lazy_static! {
    static ref SECTION_WS_RE: Regex = Regex::new(r"[ _]+").unwrap();
}

/// Options for [`escape_id`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdOptions {
    /// The id is only ever used after some other prefix, so it need not
    /// start with a letter
    pub noninitial: bool,
}

impl IdOptions {
    pub fn noninitial() -> Self {
        Self { noninitial: true }
    }
}

/// Turn arbitrary text into a valid, unambiguous id.
///
/// Character references are decoded and spaces become underscores. Every
/// byte other than an ASCII letter, digit, `-`, `_`, `.` or `:` is then
/// written as `.XX` (its uppercase hex value). Unless
/// [`IdOptions::noninitial`] is set, an id that does not begin with an ASCII
/// letter gets an `x` prefix.
pub fn escape_id(id: &str, options: IdOptions) -> String {
    let decoded = decode_char_references(id);
    let underscored = decoded.replace(' ', "_");

    let mut escaped = String::with_capacity(underscored.len());
    for chunk in utf8_percent_encode(&underscored, ID_ENCODE_SET) {
        escaped.push_str(chunk);
    }
    let escaped = escaped.replace("%3A", ":").replace('%', ".");

    let starts_with_letter = escaped.chars().next().map_or(false, |c| c.is_ascii_alphabetic());
    if !options.noninitial && !starts_with_letter {
        format!("x{}", escaped)
    } else {
        escaped
    }
}

/// Collapse runs of spaces and underscores in a heading anchor to a single
/// space and trim the ends.
pub fn normalize_section_id_whitespace(id: &str) -> String {
    SECTION_WS_RE.replace_all(id, " ").trim().to_string()
}
