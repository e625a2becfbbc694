//! Polygon helpers used by the editor and by ROI checks.
//!
//! A polygon is a plain ordered vertex list; the last vertex is implicitly
//! connected back to the first.

use super::point::Point;
use super::rect::Rect;

/// An ordered list of vertices in one coordinate space.
pub type Polygon<TSpace> = Vec<Point<TSpace>>;

/// Result of a nearest-vertex search.
#[derive(Debug)]
pub struct Closest<TSpace> {
    /// Squared distance from the cursor to `point`.
    pub distance2: f64,
    /// Index of `point` inside the searched polygon.
    pub index: usize,
    pub point: Point<TSpace>,
}

impl<TSpace> Clone for Closest<TSpace> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<TSpace> Copy for Closest<TSpace> {}

/// Finds the vertex closest to `cursor` by linear scan.
///
/// Returns `None` for an empty polygon. On equal distances the earliest
/// vertex wins.
pub fn closest_point<TSpace>(
    cursor: &Point<TSpace>,
    polygon: &[Point<TSpace>],
) -> Option<Closest<TSpace>> {
    let mut best: Option<Closest<TSpace>> = None;
    for (index, p) in polygon.iter().enumerate() {
        let distance2 = cursor.distance2(p);
        if best.map_or(true, |b| distance2 < b.distance2) {
            best = Some(Closest {
                distance2,
                index,
                point: *p,
            });
        }
    }
    best
}

/// Inserts `point` on the closed edge whose replacement grows the perimeter
/// the least, and returns the index the point was inserted at.
///
/// Polygons with fewer than two vertices simply get the point appended.
pub fn insert_best<TSpace>(polygon: &mut Polygon<TSpace>, point: Point<TSpace>) -> usize {
    let n = polygon.len();
    if n < 2 {
        polygon.push(point);
        return n;
    }

    let mut best_edge = 0;
    let mut best_cost = f64::INFINITY;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        let cost = a.distance(&point) + point.distance(b) - a.distance(b);
        if cost < best_cost {
            best_cost = cost;
            best_edge = i;
        }
    }

    let index = best_edge + 1;
    polygon.insert(index, point);
    index
}

/// Sum of the closed polygon's edge lengths.
pub fn perimeter<TSpace>(polygon: &[Point<TSpace>]) -> f64 {
    let n = polygon.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| polygon[i].distance(&polygon[(i + 1) % n]))
        .sum()
}

/// Bounding rectangle of the polygon, `None` when it has no vertices.
pub fn bounding_rect<TSpace>(polygon: &[Point<TSpace>]) -> Option<Rect<TSpace>> {
    Rect::bounding(polygon)
}

/// Translates every vertex by `offset`.
pub fn translate<TSpace>(polygon: &mut [Point<TSpace>], offset: Point<TSpace>) {
    for p in polygon.iter_mut() {
        *p = *p + offset;
    }
}

/// Returns true if `p` is inside the polygon or on its boundary.
///
/// Uses even-odd ray casting; polygons with fewer than three vertices
/// contain only the points lying on their segments.
pub fn contains_point<TSpace>(polygon: &[Point<TSpace>], p: &Point<TSpace>) -> bool {
    let n = polygon.len();
    if n == 0 {
        return false;
    }
    if n == 1 {
        return polygon[0].distance2(p) <= f64::EPSILON;
    }

    for i in 0..n {
        if on_segment(&polygon[i], &polygon[(i + 1) % n], p) {
            return true;
        }
    }
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (&polygon[i], &polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn on_segment<TSpace>(a: &Point<TSpace>, b: &Point<TSpace>, p: &Point<TSpace>) -> bool {
    const EPS: f64 = 1e-12;
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EPS {
        return false;
    }
    p.x >= a.x.min(b.x) - EPS
        && p.x <= a.x.max(b.x) + EPS
        && p.y >= a.y.min(b.y) - EPS
        && p.y <= a.y.max(b.y) + EPS
}
