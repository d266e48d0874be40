//! Sanitas token sanitizer
//!
//! The sanitization stage of a wikitext to HTML pipeline. Tokens coming out
//! of the tokenizer are checked against a whitelist of elements and
//! attributes before they reach tree construction: disallowed literal tags
//! turn back into text, disallowed attributes are dropped (keeping a shadow
//! of what was written), and CSS, URL and id values are normalized.
//!
//! Sanitizing never fails. Every input produces a safe output.

pub mod config;
pub mod css;
pub mod entities;
pub mod error;
pub mod id;
pub mod metrics;
pub mod sanitizer;
pub mod token;
pub mod url;
pub mod whitelist;

pub use config::SanitizerOptions;
pub use css::{analyze_css, check_css, normalize_css, CssVerdict, INSECURE_CSS_MARKER, INVALID_CSS_MARKER};
pub use entities::{decode_char, decode_char_references, decode_entity};
pub use error::{SanitizerError, SanitizerResult};
pub use id::{escape_id, normalize_section_id_whitespace, IdOptions};
pub use metrics::{MetricsSnapshot, SanitizeTimer, SanitizerMetrics};
pub use sanitizer::{is_internal_attr, Sanitizer};
pub use token::{Attribute, AttributeRecord, AttrText, SourceSpan, Tag, TagSyntax, Token};
pub use url::{clean_url, strip_idns};
pub use whitelist::{AttributeWhitelist, NO_END_TAGS, TAG_WHITELIST};

pub use sanitas_security::{CapabilityConfig, ProtocolValidator, SecurityContext, UrlProtocols};
