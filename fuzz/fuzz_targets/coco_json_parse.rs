//! Fuzz target for COCO JSON parsing and conversion to labels.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_json_parse

#![no_main]

use hoplabel::format::io_coco_json::fuzz_parse_coco_json;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for annotation files.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = fuzz_parse_coco_json(data);
});
