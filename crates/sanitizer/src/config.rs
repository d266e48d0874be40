use serde::{Deserialize, Serialize};

/// Per-pipeline options for the sanitizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SanitizerOptions {
    /// Tokens come from expanded template or extension output. Their source
    /// spans do not point into the page text, so a degraded tag is rebuilt
    /// from its name and attributes instead of copied from the source.
    pub in_template: bool,
}

impl SanitizerOptions {
    /// Options for a pipeline processing template output
    pub fn in_template() -> Self {
        Self { in_template: true }
    }
}
