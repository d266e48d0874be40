//! Sanitas Security Crate
//!
//! Holds the per-wiki policy that the token sanitizer consults: which attribute
//! vocabularies are enabled (RDFa, microdata, HTML5 `data-*`) and which URL
//! protocols links may use.

pub mod context;
pub mod error;
pub mod protocol;

pub use context::{CapabilityConfig, SecurityContext, SecurityContextBuilder};
pub use error::{SecurityError, SecurityResult};
pub use protocol::{ProtocolValidator, UrlProtocols, DEFAULT_URL_PROTOCOLS};
