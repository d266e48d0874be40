//! Defines the Security Context and its builder for sanitas.
//!
//! The Security Context holds the site policy applied while sanitizing tokens:
//! the attribute capabilities (RDFa, microdata, HTML5 mode) that shape the
//! attribute whitelist, and the URL protocols permitted in `href`/`src`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SecurityError, SecurityResult};
use crate::protocol::{ProtocolValidator, UrlProtocols};

/// Attribute vocabularies enabled for a wiki.
///
/// Fixed for the lifetime of a sanitizer; the attribute whitelist is a pure
/// function of this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CapabilityConfig {
    /// Permit RDFa attributes (about, property, resource, datatype, typeof)
    /// and `xmlns:*` declarations
    pub allow_rdfa_attrs: bool,
    /// Permit microdata attributes (itemid, itemprop, itemref, itemscope, itemtype)
    pub allow_microdata_attrs: bool,
    /// Permit `data-*` attributes
    pub html5_mode: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            allow_rdfa_attrs: true,
            allow_microdata_attrs: true,
            html5_mode: true,
        }
    }
}

/// Site policy consulted by the sanitizer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityContext {
    /// Enabled attribute vocabularies
    pub capabilities: CapabilityConfig,
    /// Allowed URL protocols
    pub protocols: UrlProtocols,
}

impl SecurityContext {
    /// Create a security context from explicit parts
    pub fn new(capabilities: CapabilityConfig, protocols: UrlProtocols) -> Self {
        Self { capabilities, protocols }
    }

    /// Start building a security context
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::new()
    }

    /// Parse a security context from its JSON representation.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> SecurityResult<Self> {
        let context: Self = serde_json::from_str(json)
            .map_err(|e| SecurityError::InvalidConfiguration(e.to_string()))?;
        log::debug!(
            "Loaded security context: rdfa={} microdata={} html5={} protocols={}",
            context.capabilities.allow_rdfa_attrs,
            context.capabilities.allow_microdata_attrs,
            context.capabilities.html5_mode,
            context.protocols.prefixes().len()
        );
        Ok(context)
    }

    /// Read and parse a JSON security context from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> SecurityResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SecurityError::ConfigUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Serialize this context as JSON
    pub fn to_json(&self) -> SecurityResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SecurityError::InvalidConfiguration(e.to_string()))
    }

    /// The enabled attribute vocabularies
    pub fn capabilities(&self) -> CapabilityConfig {
        self.capabilities
    }

    /// The allowed URL protocols
    pub fn protocols(&self) -> &UrlProtocols {
        &self.protocols
    }
}

impl ProtocolValidator for SecurityContext {
    fn is_valid_protocol(&self, protocol: &str) -> bool {
        self.protocols.allows(protocol)
    }
}

/// Builder for creating SecurityContext instances.
#[derive(Debug, Default)]
pub struct SecurityContextBuilder {
    capabilities: CapabilityConfig,
    protocols: Option<Vec<String>>,
}

impl SecurityContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable RDFa attributes and `xmlns:*` declarations
    pub fn allow_rdfa(mut self, allow: bool) -> Self {
        self.capabilities.allow_rdfa_attrs = allow;
        self
    }

    /// Enable or disable microdata attributes
    pub fn allow_microdata(mut self, allow: bool) -> Self {
        self.capabilities.allow_microdata_attrs = allow;
        self
    }

    /// Enable or disable HTML5 `data-*` attributes
    pub fn html5_mode(mut self, enabled: bool) -> Self {
        self.capabilities.html5_mode = enabled;
        self
    }

    /// Replace the capability set wholesale
    pub fn capabilities(mut self, capabilities: CapabilityConfig) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Replace the default protocol list. Entries are validated in `build()`.
    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.protocols = Some(protocols.into_iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    /// Constructs the final SecurityContext.
    pub fn build(self) -> SecurityResult<SecurityContext> {
        let protocols = match self.protocols {
            Some(list) => UrlProtocols::new(list)?,
            None => UrlProtocols::default(),
        };
        Ok(SecurityContext::new(self.capabilities, protocols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_capabilities() {
        let caps = CapabilityConfig::default();
        assert!(caps.allow_rdfa_attrs);
        assert!(caps.allow_microdata_attrs);
        assert!(caps.html5_mode);
    }

    #[test]
    fn test_builder() {
        let context = SecurityContext::builder()
            .allow_microdata(false)
            .protocols(["https://", "mailto:"])
            .build()
            .unwrap();
        assert!(!context.capabilities().allow_microdata_attrs);
        assert!(context.capabilities().allow_rdfa_attrs);
        assert!(context.is_valid_protocol("https://"));
        assert!(!context.is_valid_protocol("http://"));
    }

    #[test]
    fn test_builder_rejects_bad_protocol() {
        let result = SecurityContext::builder().protocols(["not a protocol"]).build();
        assert!(matches!(result, Err(SecurityError::InvalidProtocol { .. })));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "capabilities": { "allowRdfaAttrs": false, "html5Mode": false },
            "protocols": ["https://", "//"]
        }"#;
        let context = SecurityContext::from_json(json).unwrap();
        assert_eq!(
            context.capabilities(),
            CapabilityConfig { allow_rdfa_attrs: false, allow_microdata_attrs: true, html5_mode: false }
        );
        assert!(context.is_valid_protocol("//"));
        assert!(!context.is_valid_protocol("ftp://"));
    }

    #[test]
    fn test_from_json_defaults_and_errors() {
        let context = SecurityContext::from_json("{}").unwrap();
        assert_eq!(context, SecurityContext::default());

        assert!(SecurityContext::from_json(r#"{"protocols": ["javascript"]}"#).is_err());
        assert!(SecurityContext::from_json("not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let context = SecurityContext::default();
        let json = context.to_json().unwrap();
        assert_eq!(SecurityContext::from_json(&json).unwrap(), context);
    }

    #[test]
    fn test_from_missing_file() {
        let result = SecurityContext::from_file("/nonexistent/sanitas.json");
        assert!(matches!(result, Err(SecurityError::ConfigUnreadable { .. })));
    }
}
