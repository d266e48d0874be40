#![no_main]

use libfuzzer_sys::fuzz_target;
use sanitas_sanitizer::{check_css, INSECURE_CSS_MARKER, INVALID_CSS_MARKER};

fuzz_target!(|data: &[u8]| {
    if let Ok(css) = std::str::from_utf8(data) {
        // Limit input size to prevent excessive resource usage
        if css.len() > 10_000 {
            return;
        }

        let once = check_css(css);
        assert_eq!(check_css(&once), once, "check_css is not idempotent");

        if once != INSECURE_CSS_MARKER && once != INVALID_CSS_MARKER {
            assert!(!once.to_ascii_lowercase().contains("expression"));
            assert!(!once.contains("/*"));
        }
    }
});
