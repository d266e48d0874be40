//! Token sanitizer
//!
//! Sits between the tokenizer and tree construction. Literal HTML tags that
//! are not on the tag whitelist become text; every other tag has its
//! attributes filtered against the per-element whitelist and its `style`,
//! `id`, `href` and `src` values cleaned.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use sanitas_security::{CapabilityConfig, ProtocolValidator, SecurityContext};

use crate::config::SanitizerOptions;
use crate::css::check_css;
use crate::error::SanitizerResult;
use crate::id::{escape_id, IdOptions};
use crate::metrics::{SanitizeTimer, SanitizerMetrics};
use crate::token::{Attribute, AttributeRecord, Tag, Token};
use crate::url::clean_url;
use crate::whitelist::{is_no_end_tag, is_whitelisted_tag, AttributeWhitelist};

lazy_static::lazy_static! {
    /// URIs that execute script when followed
    pub static ref EVIL_URI_RE: Regex = Regex::new(
        r"(?i)(?:^|\s|\*/\s*)(?:javascript|vbscript)(?:[^A-Za-z0-9_]|$)"
    ).unwrap();

    /// XML namespace declarations (`xmlns:foo`)
    pub static ref XMLNS_ATTRIBUTE_RE: Regex = Regex::new(
        r"^xmlns:[:A-Z_a-z\-.0-9]+$"
    ).unwrap();

    /// Attribute names the wikitext HTML subset accepts at all
    static ref ATTR_KEY_RE: Regex = Regex::new(
        r"^[:A-Z_a-z0-9][:A-Z_a-z\-.0-9]*$"
    ).unwrap();

    /// A pipeline-namespaced token (`mw:...`) inside a space separated value
    static ref MW_TOKEN_RE: Regex = Regex::new(
        r"(?:^|\s)mw:[^\n\r\x{2028}\x{2029}]"
    ).unwrap();

    /// Transclusion ids assigned by the pipeline
    static ref MW_ABOUT_RE: Regex = Regex::new(r"^#mwt[0-9]+$").unwrap();

    static ref MW_WORD_RE: Regex = Regex::new(r"^mw:[A-Za-z0-9_]").unwrap();
}

/// Attributes that may carry URLs, URIs or CURIs (RDFa and microdata)
const URI_ATTRIBUTES: &[&str] = &[
    "rel", "rev", "about", "property", "resource", "datatype", "typeof",
    "itemid", "itemprop", "itemref", "itemscope", "itemtype",
];

/// Microdata attributes meaningless without `itemscope`
const ITEMSCOPE_DEPENDENT: &[&str] = &["itemtype", "itemid", "itemref"];

/// Whether `key="value"` was put on the tag by the pipeline itself rather
/// than written by an author. `key` must already be lowercased.
pub fn is_internal_attr(key: &str, value: &str, tag: &Tag) -> bool {
    match key {
        "typeof" | "property" | "rel" => MW_TOKEN_RE.is_match(value),
        "about" => MW_ABOUT_RE.is_match(value),
        "content" => tag.attr("property").map_or(false, |p| MW_TOKEN_RE.is_match(&p)),
        _ => false,
    }
}

/// Keep only the `mw:` tokens of a space separated value
fn retain_mw_tokens(value: &str) -> String {
    value
        .split_whitespace()
        .filter(|t| MW_WORD_RE.is_match(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_allowed_data_attr(key: &str) -> bool {
    match key.strip_prefix("data-") {
        Some(rest) => !rest.starts_with("ooui") && !rest.contains(':'),
        None => false,
    }
}

/// Rebuild the literal text of a tag that has no recoverable source
fn reconstruct_tag(token: &Token) -> String {
    match token {
        Token::Close(tag) => format!("</{}>", tag.name),
        Token::Open(tag) | Token::SelfClosing(tag) => {
            let mut buf = format!("<{}", tag.name);
            for attr in &tag.attributes {
                buf.push_str(&format!(" {}='{}'", attr.key_text(), attr.value_text()));
            }
            if matches!(token, Token::SelfClosing(_)) {
                buf.push_str(" /");
            }
            buf.push('>');
            buf
        }
        Token::Text(text) | Token::Comment(text) => text.clone(),
    }
}

/// Sanitizes tokens for one wiki configuration
pub struct Sanitizer {
    context: Arc<SecurityContext>,
    validator: Arc<dyn ProtocolValidator + Send + Sync>,
    whitelist: AttributeWhitelist,
    whitelist_cache: RwLock<HashMap<String, Arc<HashSet<String>>>>,
    options: SanitizerOptions,
    source: Option<Arc<str>>,
    metrics: Arc<SanitizerMetrics>,
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer")
            .field("capabilities", &self.context.capabilities)
            .field("options", &self.options)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(SecurityContext::default())
    }
}

impl Sanitizer {
    /// Create a sanitizer for `context`. URLs are checked against the
    /// context's protocol list.
    pub fn new(context: SecurityContext) -> Self {
        let context = Arc::new(context);
        let whitelist = AttributeWhitelist::build(context.capabilities);
        Self {
            validator: context.clone(),
            context,
            whitelist,
            whitelist_cache: RwLock::new(HashMap::new()),
            options: SanitizerOptions::default(),
            source: None,
            metrics: Arc::new(SanitizerMetrics::new()),
        }
    }

    /// Create a sanitizer from a JSON security context
    pub fn from_json(json: &str) -> SanitizerResult<Self> {
        Ok(Self::new(SecurityContext::from_json(json)?))
    }

    pub fn with_options(mut self, options: SanitizerOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach the page source that token spans point into
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Check URL protocols with `validator` instead of the context's list
    pub fn with_protocol_validator<V>(mut self, validator: V) -> Self
    where
        V: ProtocolValidator + Send + Sync + 'static,
    {
        self.validator = Arc::new(validator);
        self
    }

    /// Report into a shared metrics instance
    pub fn with_metrics(mut self, metrics: Arc<SanitizerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn context(&self) -> &SecurityContext {
        &self.context
    }

    pub fn capabilities(&self) -> CapabilityConfig {
        self.context.capabilities
    }

    pub fn options(&self) -> SanitizerOptions {
        self.options
    }

    pub fn metrics(&self) -> Arc<SanitizerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Allowed attributes for `element` (lowercase), memoized per element
    pub fn attr_whitelist(&self, element: &str) -> Arc<HashSet<String>> {
        if let Some(set) = self.whitelist_cache.read().get(element) {
            return Arc::clone(set);
        }
        let set = Arc::new(self.whitelist.attributes_for(element));
        let mut cache = self.whitelist_cache.write();
        Arc::clone(cache.entry(element.to_string()).or_insert(set))
    }

    /// Sanitize a batch of tokens
    pub fn sanitize_tokens(&self, tokens: Vec<Token>) -> Vec<Token> {
        let timer = SanitizeTimer::new();
        let out: Vec<Token> = tokens.into_iter().map(|t| self.sanitize_token(t)).collect();
        tracing::debug!("Sanitized {} tokens in {}us", out.len(), timer.elapsed_us());
        out
    }

    /// Parse a JSON token array, sanitize it and serialize the result
    pub fn sanitize_json(&self, json: &str) -> SanitizerResult<String> {
        let tokens: Vec<Token> = serde_json::from_str(json)?;
        Ok(serde_json::to_string(&self.sanitize_tokens(tokens))?)
    }

    /// Sanitize a single token
    pub fn sanitize_token(&self, mut token: Token) -> Token {
        self.metrics.increment_tokens();
        tracing::trace!("sanitizing {}", serde_json::to_string(&token).unwrap_or_default());

        if token.is_empty_line_marker() {
            tracing::trace!("--unchanged--");
            return token;
        }

        if self.must_degrade(&token) {
            let text = self.degrade(&token);
            tracing::debug!("Degraded disallowed tag to text: {}", text);
            self.metrics.increment_degraded();
            return Token::Text(text);
        }

        match &mut token {
            Token::Open(tag) | Token::SelfClosing(tag) => {
                for attr in &mut tag.attributes {
                    attr.key.flatten();
                    attr.value.flatten();
                }
                self.sanitize_tag(tag);
            }
            Token::Close(tag) => tag.attributes.clear(),
            Token::Text(_) | Token::Comment(_) => {}
        }

        tracing::trace!(" ---> {}", serde_json::to_string(&token).unwrap_or_default());
        token
    }

    fn must_degrade(&self, token: &Token) -> bool {
        let tag = match token.tag() {
            Some(tag) if tag.is_html_syntax() => tag,
            _ => return false,
        };
        let name = tag.name.to_ascii_lowercase();
        !is_whitelisted_tag(&name) || (matches!(token, Token::Close(_)) && is_no_end_tag(&name))
    }

    fn degrade(&self, token: &Token) -> String {
        if !self.options.in_template {
            let literal = token
                .tag()
                .and_then(|tag| tag.span)
                .zip(self.source.as_deref())
                .and_then(|(span, source)| span.slice(source));
            if let Some(literal) = literal {
                return literal.to_string();
            }
        }
        reconstruct_tag(token)
    }

    /// Replace the attributes of `tag` with their sanitized form. Dropped
    /// attributes move to `tag.shadows`.
    pub fn sanitize_tag(&self, tag: &mut Tag) {
        let records = self.sanitize_tag_attrs(tag);
        let mut attributes = Vec::with_capacity(records.len());
        for record in records {
            let value = match record.rendered {
                Some(ref value) => value.clone(),
                None => {
                    self.metrics.increment_rejected();
                    tag.shadows.push(record);
                    continue;
                }
            };
            let mut attr = Attribute::new(record.key, value.as_str());
            if record.original != value {
                attr = attr.with_value_source(record.original);
            }
            if record.original_key != attr.key_text() {
                attr = attr.with_key_source(record.original_key);
            }
            attributes.push(attr);
        }
        tag.attributes = attributes;
    }

    /// Sanitize every attribute of `tag`.
    ///
    /// Returns one record per distinct (lowercased) key, in order of first
    /// appearance; a repeated key keeps its last value. Records with
    /// `rendered == None` must not be rendered.
    pub fn sanitize_tag_attrs(&self, tag: &Tag) -> Vec<AttributeRecord> {
        let caps = self.context.capabilities;
        let wlist = self.attr_whitelist(&tag.name.to_ascii_lowercase());
        let mut records: Vec<AttributeRecord> = Vec::with_capacity(tag.attributes.len());

        'attrs: for attr in &tag.attributes {
            self.metrics.increment_attributes();

            let key_text = attr.key_text();
            let orig_k = attr.key_source.clone().unwrap_or_else(|| key_text.to_string());
            let k = key_text.to_lowercase();
            let mut v = attr.value_text().into_owned();
            let orig_v = attr.value_source.clone().unwrap_or_else(|| v.clone());
            let internal = is_internal_attr(&k, &v, tag);

            let rendered = 'attr: {
                if !internal {
                    if !ATTR_KEY_RE.is_match(&k) {
                        break 'attr None;
                    }
                    if caps.allow_rdfa_attrs && XMLNS_ATTRIBUTE_RE.is_match(&k) {
                        break 'attr if EVIL_URI_RE.is_match(&v) { None } else { Some(v) };
                    }
                    let data_ok = caps.html5_mode && is_allowed_data_attr(&k);
                    if !data_ok && !wlist.contains(&k) {
                        break 'attr None;
                    }
                }

                if k == "style" {
                    let checked = check_css(&v);
                    if checked != v {
                        tracing::debug!("Rewrote style attribute on <{}>", tag.name);
                        self.metrics.increment_rewritten();
                    }
                    v = checked;
                }

                if k == "id" {
                    let escaped = escape_id(&v, IdOptions::noninitial());
                    if escaped != v {
                        self.metrics.increment_rewritten();
                    }
                    v = escaped;
                }

                if URI_ATTRIBUTES.contains(&k.as_str()) && EVIL_URI_RE.is_match(&v) {
                    break 'attr if internal { Some(retain_mw_tokens(&orig_v)) } else { None };
                }

                if k == "href" || k == "src" {
                    let cleaned = clean_url(&v, self.validator.as_ref());
                    if cleaned.as_deref() != Some(v.as_str()) {
                        let orig_href = tag
                            .shadow_value(&k)
                            .map(|s| s.into_owned())
                            .unwrap_or_else(|| orig_v.clone());
                        if cleaned.is_some() {
                            self.metrics.increment_rewritten();
                        }
                        upsert(&mut records, AttributeRecord {
                            key: k,
                            rendered: cleaned,
                            original: orig_href,
                            original_key: orig_k,
                        });
                        continue 'attrs;
                    }
                }

                Some(v)
            };

            if rendered.is_none() {
                tracing::debug!("Dropping attribute {:?} on <{}>", orig_k, tag.name);
            }
            upsert(&mut records, AttributeRecord {
                key: k,
                rendered,
                original: orig_v,
                original_key: orig_k,
            });
        }

        if !caps.allow_microdata_attrs {
            let has_scope = records.iter().any(|r| r.key == "itemscope" && r.rendered.is_some());
            if !has_scope {
                for record in records.iter_mut() {
                    if ITEMSCOPE_DEPENDENT.contains(&record.key.as_str()) {
                        record.rendered = None;
                    }
                }
            }
        }

        records
    }
}

/// Insert `record`, replacing any earlier record for the same key in place
fn upsert(records: &mut Vec<AttributeRecord>, record: AttributeRecord) {
    match records.iter_mut().find(|r| r.key == record.key) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}
