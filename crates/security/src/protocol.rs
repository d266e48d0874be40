//! URL protocol policy.
//!
//! The URL sanitizer never decides on its own which schemes are acceptable; it
//! asks a [`ProtocolValidator`] supplied by the site configuration. The
//! protocol string it asks about is the literal prefix split off the URL,
//! including any `//` (for example `"https://"`, `"mailto:"` or just `"//"`).

use serde::{Deserialize, Serialize};

use crate::error::{SecurityError, SecurityResult};

/// Protocols a wiki accepts in links when nothing else is configured.
pub const DEFAULT_URL_PROTOCOLS: &[&str] = &[
    "bitcoin:", "ftp://", "ftps://", "geo:", "git://", "gopher://", "http://",
    "https://", "irc://", "ircs://", "magnet:", "mailto:", "mms://", "news:",
    "nntp://", "redis://", "sftp://", "sip:", "sips:", "sms:", "ssh://",
    "svn://", "tel:", "telnet://", "urn:", "worldwind://", "xmpp:", "//",
];

/// Predicate deciding whether a URL protocol prefix is acceptable.
pub trait ProtocolValidator {
    /// Returns true when `protocol` may appear in a sanitized URL.
    fn is_valid_protocol(&self, protocol: &str) -> bool;
}

impl<F> ProtocolValidator for F
where
    F: Fn(&str) -> bool,
{
    fn is_valid_protocol(&self, protocol: &str) -> bool {
        self(protocol)
    }
}

/// An allow-list of URL protocol prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct UrlProtocols {
    /// Lowercased prefixes, e.g. `https://` or `mailto:`
    prefixes: Vec<String>,
}

impl UrlProtocols {
    /// Build a protocol list, validating every entry.
    pub fn new<I, S>(protocols: I) -> SecurityResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes = Vec::new();
        for protocol in protocols {
            let protocol = protocol.as_ref();
            if !Self::is_well_formed(protocol) {
                log::warn!("Rejecting malformed URL protocol entry {:?}", protocol);
                return Err(SecurityError::InvalidProtocol { protocol: protocol.to_string() });
            }
            let lowered = protocol.to_ascii_lowercase();
            if !prefixes.contains(&lowered) {
                prefixes.push(lowered);
            }
        }
        Ok(Self { prefixes })
    }

    /// The configured prefixes, lowercased.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether `protocol` starts with one of the configured prefixes
    /// (ASCII case-insensitive).
    pub fn allows(&self, protocol: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            protocol.len() >= prefix.len()
                && protocol.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
        })
    }

    // A scheme name followed by `:` (optionally `://`), or the bare
    // protocol-relative `//`.
    fn is_well_formed(protocol: &str) -> bool {
        if protocol == "//" {
            return true;
        }
        let scheme = match protocol.strip_suffix("://").or_else(|| protocol.strip_suffix(':')) {
            Some(scheme) => scheme,
            None => return false,
        };
        let mut chars = scheme.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    }
}

impl Default for UrlProtocols {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_URL_PROTOCOLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for UrlProtocols {
    type Error = SecurityError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UrlProtocols> for Vec<String> {
    fn from(value: UrlProtocols) -> Self {
        value.prefixes
    }
}

impl ProtocolValidator for UrlProtocols {
    fn is_valid_protocol(&self, protocol: &str) -> bool {
        self.allows(protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_protocols() {
        let protocols = UrlProtocols::default();
        assert!(protocols.allows("https://"));
        assert!(protocols.allows("HTTP://"));
        assert!(protocols.allows("mailto:"));
        assert!(protocols.allows("//"));
        assert!(!protocols.allows("javascript:"));
        assert!(!protocols.allows("data:"));
        assert!(!protocols.allows("vbscript:"));
    }

    #[test]
    fn test_malformed_entries_rejected() {
        assert!(UrlProtocols::new(["https://", "mailto:"]).is_ok());
        assert!(UrlProtocols::new(["java script:"]).is_err());
        assert!(UrlProtocols::new(["https"]).is_err());
        assert!(UrlProtocols::new(["1abc:"]).is_err());
        assert!(UrlProtocols::new([""]).is_err());
    }

    #[test]
    fn test_entries_are_deduplicated() {
        let protocols = UrlProtocols::new(["HTTPS://", "https://"]).unwrap();
        assert_eq!(protocols.prefixes(), &["https://".to_string()]);
    }

    #[test]
    fn test_closure_validator() {
        let only_https = |proto: &str| proto.eq_ignore_ascii_case("https://");
        assert!(only_https.is_valid_protocol("https://"));
        assert!(!only_https.is_valid_protocol("http://"));
    }
}
