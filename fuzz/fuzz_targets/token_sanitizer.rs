#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sanitas_sanitizer::{CapabilityConfig, Sanitizer, SecurityContext, Tag, Token};

#[derive(Debug, Arbitrary)]
struct FuzzTag {
    name: String,
    literal: bool,
    self_closing: bool,
    attributes: Vec<(String, String)>,
    rdfa: bool,
    microdata: bool,
    html5: bool,
}

fuzz_target!(|input: FuzzTag| {
    if input.attributes.len() > 64 {
        return;
    }

    let capabilities = CapabilityConfig {
        allow_rdfa_attrs: input.rdfa,
        allow_microdata_attrs: input.microdata,
        html5_mode: input.html5,
    };
    let context = SecurityContext::builder().capabilities(capabilities).build().unwrap();
    let sanitizer = Sanitizer::new(context);

    let mut tag = Tag::new(input.name.as_str());
    if input.literal {
        tag = tag.html();
    }
    for (key, value) in &input.attributes {
        tag = tag.with_attr(key.as_str(), value.as_str());
    }
    let token = if input.self_closing { Token::SelfClosing(tag) } else { Token::Open(tag) };

    let out = sanitizer.sanitize_token(token);
    if let Some(tag) = out.tag() {
        let element = tag.name.to_ascii_lowercase();
        for attr in &tag.attributes {
            let key = attr.key_text();
            assert!(!key.starts_with("on") || sanitizer.attr_whitelist(&element).contains(&*key));
        }
    }
});
