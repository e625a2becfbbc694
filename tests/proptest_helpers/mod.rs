#![allow(dead_code)]

use hoplabel::geom::{Normalized, Point, Rect};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Rectangles inside the unit frame with a non-zero size.
pub fn arb_unit_rect() -> impl Strategy<Value = Rect<Normalized>> {
    (0.0..0.9f64, 0.0..0.9f64, 0.01..1.0f64, 0.01..1.0f64).prop_map(|(x, y, w, h)| {
        Rect::new(x, y, w.min(1.0 - x), h.min(1.0 - y))
    })
}

/// Arbitrary rectangles, possibly empty or far outside the unit frame.
pub fn arb_any_rect() -> impl Strategy<Value = Rect<Normalized>> {
    (-10.0..10.0f64, -10.0..10.0f64, 0.0..10.0f64, 0.0..10.0f64)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

pub fn arb_point() -> impl Strategy<Value = Point<Normalized>> {
    (0.0..1.0f64, 0.0..1.0f64).prop_map(|(x, y)| Point::new(x, y))
}

pub fn arb_polygon(max_len: usize) -> impl Strategy<Value = Vec<Point<Normalized>>> {
    prop::collection::vec(arb_point(), 0..max_len)
}
