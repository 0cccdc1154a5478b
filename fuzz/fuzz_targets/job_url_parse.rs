#![no_main]

use libfuzzer_sys::fuzz_target;
use openqa_bisect_core::JobUrl;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Ok(url) = JobUrl::parse(&raw) {
        let reparsed = JobUrl::parse(&url.to_string()).expect("rendered url parses");
        assert_eq!(reparsed, url);
        assert_eq!(JobUrl::parse(&url.short_url()).ok(), Some(url));
    }
});
