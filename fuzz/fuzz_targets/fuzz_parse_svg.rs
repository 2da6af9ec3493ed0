#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed documents must come back as errors, never panics
    if let Ok(doc) = relief_mesh::parse_svg(data) {
        let _ = doc.default_type_depths();
    }
});
