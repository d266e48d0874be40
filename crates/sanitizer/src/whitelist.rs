//! Tag and attribute whitelists
//!
//! The per-element attribute table is derived from the wiki's
//! [`CapabilityConfig`]: RDFa and microdata attributes only join the common
//! set when the matching capability is on.

use std::collections::{HashMap, HashSet};

use sanitas_security::CapabilityConfig;

/// Elements an author may write with literal HTML syntax. Anything else is
/// degraded to plain text.
pub const TAG_WHITELIST: &[&str] = &[
    "abbr", "b", "bdi", "bdo", "big", "blockquote", "br", "caption", "center",
    "cite", "code", "data", "dd", "del", "dfn", "div", "dl", "dt", "em", "font",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "ins", "kbd", "li", "mark",
    "ol", "p", "pre", "q", "rb", "rp", "rt", "rtc", "ruby", "s", "samp", "small",
    "span", "strike", "strong", "sub", "sup", "table", "td", "th", "time", "tr",
    "tt", "u", "ul", "var", "wbr",
];

/// Void elements whose literal end tag is degraded to text
pub const NO_END_TAGS: &[&str] = &["br"];

const CORE: &[&str] = &["id", "class", "lang", "dir", "title", "style"];
const RDFA: &[&str] = &["about", "property", "resource", "datatype", "typeof"];

/// HTML5 microdata attributes
pub const MICRODATA: &[&str] = &["itemid", "itemprop", "itemref", "itemscope", "itemtype"];

const TABLE_ALIGN: &[&str] = &["align", "char", "charoff", "valign"];
const TABLE_CELL: &[&str] = &[
    "abbr", "axis", "headers", "scope", "rowspan", "colspan", "nowrap", "width",
    "height", "bgcolor",
];

/// Whether `name` (lowercase) may be written as a literal HTML tag
pub fn is_whitelisted_tag(name: &str) -> bool {
    TAG_WHITELIST.contains(&name)
}

/// Whether a literal end tag for `name` (lowercase) is invalid
pub fn is_no_end_tag(name: &str) -> bool {
    NO_END_TAGS.contains(&name)
}

/// Allowed attribute names for every known element, for one capability set
#[derive(Debug, Clone)]
pub struct AttributeWhitelist {
    elements: HashMap<&'static str, HashSet<&'static str>>,
}

impl AttributeWhitelist {
    /// Build the table for `capabilities`
    pub fn build(capabilities: CapabilityConfig) -> Self {
        let mut common: Vec<&'static str> = CORE.to_vec();
        if capabilities.allow_rdfa_attrs {
            common.extend_from_slice(RDFA);
        }
        if capabilities.allow_microdata_attrs {
            common.extend_from_slice(MICRODATA);
        }

        let mut block = common.clone();
        block.push("align");
        let common: &[&'static str] = &common;
        let block: &[&'static str] = &block;

        let mut elements: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
        let mut add = |names: &[&'static str], parts: &[&[&'static str]]| {
            let set: HashSet<&'static str> = parts.iter().flat_map(|p| p.iter().copied()).collect();
            for name in names {
                elements.insert(*name, set.clone());
            }
        };

        add(&["div", "span", "p", "h1", "h2", "h3", "h4", "h5", "h6"], &[block]);
        add(
            &[
                "center", "bdo", "em", "strong", "cite", "dfn", "code", "samp", "kbd", "var",
                "abbr", "sub", "sup", "dl", "dd", "dt", "tt", "b", "i", "big", "small", "strike",
                "s", "u", "ruby", "rb", "rp", "rt", "rtc", "figure", "figcaption", "bdi", "mark",
            ],
            &[common],
        );
        add(&["blockquote", "q"], &[common, &["cite"]]);
        add(&["br"], &[&["id", "class", "title", "style", "clear"]]);
        add(&["pre"], &[common, &["width"]]);
        add(&["ins", "del"], &[common, &["cite", "datetime"]]);
        add(&["ul"], &[common, &["type"]]);
        add(&["ol"], &[common, &["type", "start"]]);
        add(&["li"], &[common, &["type", "value"]]);
        add(
            &["table"],
            &[
                common,
                &["summary", "width", "border", "frame", "rules", "cellspacing", "cellpadding", "align", "bgcolor"],
            ],
        );
        add(&["caption"], &[common, &["align"]]);
        add(&["thead", "tfoot", "tbody"], &[common, TABLE_ALIGN]);
        add(&["colgroup", "col"], &[common, &["span", "width"], TABLE_ALIGN]);
        add(&["tr"], &[common, &["bgcolor"], TABLE_ALIGN]);
        add(&["td", "th"], &[common, TABLE_CELL, TABLE_ALIGN]);
        add(&["a"], &[common, &["href", "rel", "rev"]]);
        add(&["link"], &[common, &["href", "rel"]]);
        add(&["img"], &[common, &["alt", "src", "width", "height", "srcset"]]);
        add(&["font"], &[common, &["size", "color", "face"]]);
        add(&["hr"], &[common, &["noshade", "size", "width"]]);
        add(&["math"], &[&["class", "style", "id", "title"]]);
        add(&["wbr"], &[&["id", "class", "title", "style"]]);
        add(&["data"], &[common, &["value"]]);
        add(&["time"], &[common, &["datetime"]]);

        Self { elements }
    }

    /// Allowed attributes for `element` (lowercase). Unknown elements allow
    /// nothing.
    pub fn attributes_for(&self, element: &str) -> HashSet<String> {
        self.elements
            .get(element)
            .map(|set| set.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default()
    }

    /// Whether `attribute` is allowed on `element`
    pub fn allows(&self, element: &str, attribute: &str) -> bool {
        self.elements.get(element).map_or(false, |set| set.contains(attribute))
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(rdfa: bool, microdata: bool) -> CapabilityConfig {
        CapabilityConfig { allow_rdfa_attrs: rdfa, allow_microdata_attrs: microdata, html5_mode: true }
    }

    #[test]
    fn test_tag_whitelist() {
        assert!(is_whitelisted_tag("span"));
        assert!(is_whitelisted_tag("wbr"));
        assert!(!is_whitelisted_tag("a"));
        assert!(!is_whitelisted_tag("script"));
        assert!(!is_whitelisted_tag("SPAN"));
        assert!(is_no_end_tag("br"));
        assert!(!is_no_end_tag("hr"));
    }

    #[test]
    fn test_common_attributes() {
        let list = AttributeWhitelist::build(CapabilityConfig::default());
        for attr in ["id", "class", "lang", "dir", "title", "style", "typeof", "itemprop", "align"] {
            assert!(list.allows("div", attr), "div should allow {}", attr);
        }
        assert!(!list.allows("div", "onclick"));
        assert!(!list.allows("em", "align"));
        assert!(list.allows("a", "href"));
        assert!(list.allows("img", "srcset"));
        assert!(!list.allows("br", "lang"));
        assert!(list.allows("br", "clear"));
    }

    #[test]
    fn test_table_attributes() {
        let list = AttributeWhitelist::build(CapabilityConfig::default());
        assert!(list.allows("td", "colspan"));
        assert!(list.allows("td", "valign"));
        assert!(list.allows("th", "scope"));
        assert!(list.allows("tr", "bgcolor"));
        assert!(!list.allows("tr", "colspan"));
        assert!(list.allows("col", "span"));
        assert!(list.allows("table", "cellpadding"));
    }

    #[test]
    fn test_capabilities_shape_common_set() {
        let list = AttributeWhitelist::build(caps(false, false));
        assert!(!list.allows("span", "typeof"));
        assert!(!list.allows("span", "itemscope"));
        assert!(list.allows("span", "class"));

        let list = AttributeWhitelist::build(caps(true, false));
        assert!(list.allows("span", "property"));
        assert!(!list.allows("span", "itemprop"));

        let list = AttributeWhitelist::build(caps(false, true));
        assert!(!list.allows("span", "about"));
        assert!(list.allows("span", "itemtype"));

        // math and wbr have fixed sets
        assert!(!list.allows("math", "itemtype"));
        assert!(!list.allows("wbr", "itemtype"));
    }

    #[test]
    fn test_unknown_element_allows_nothing() {
        let list = AttributeWhitelist::build(CapabilityConfig::default());
        assert!(list.attributes_for("script").is_empty());
        assert!(!list.allows("script", "id"));
        assert!(list.attributes_for("p").contains("align"));
        assert!(!list.is_empty());
    }
}
