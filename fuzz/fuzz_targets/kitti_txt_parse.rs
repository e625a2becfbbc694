//! Fuzz target for KITTI label file parsing.

#![no_main]

use hoplabel::format::io_kitti::fuzz_parse_kitti;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = fuzz_parse_kitti(data);
});
