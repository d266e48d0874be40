#![no_main]

use libfuzzer_sys::fuzz_target;
use sanitas_sanitizer::{clean_url, UrlProtocols};

fuzz_target!(|data: &[u8]| {
    if let Ok(href) = std::str::from_utf8(data) {
        if href.len() > 10_000 {
            return;
        }

        let protocols = UrlProtocols::default();
        if let Some(cleaned) = clean_url(href, &protocols) {
            let lowered = cleaned.to_ascii_lowercase();
            assert!(!lowered.starts_with("javascript:"), "accepted {:?}", href);
            assert!(!cleaned.contains(' '));
            assert!(!cleaned.contains('"'));
        }
    }
});
