//! Fuzz target for native label JSON parsing, ROI hoisting included.
//!
//! Run with:
//!   cargo +nightly fuzz run hop_json_parse

#![no_main]

use hoplabel::format::io_hop_json::fuzz_parse_hop_json;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = fuzz_parse_hop_json(data);
});
